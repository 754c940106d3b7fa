use crate::ledger::Ledger;

/// Charges customers.
///
/// @component
/// - group: Business/Payment Processing
/// - technology: Stripe
pub struct PaymentService {
    ledger: Ledger,
}

impl PaymentService {
    pub fn charge(&self) {
        self.ledger.record();
    }
}
