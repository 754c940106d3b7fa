use crate::notify::Mailer;
use crate::payments::PaymentService;

/// Places orders.
///
/// @component
/// - group: Business/Orders
///
/// @relation PaymentService | Charges the customer
/// - tags: IndirectRelation
/// @relation Mailer | Sends confirmations
/// @relation metrics-service | Reports order counts
/// @relation worker.JobQueue | Schedules fulfilment
/// @relation worker | Enqueues fulfilment jobs
pub struct OrderService {
    payments: PaymentService,
}

impl OrderService {
    pub fn new(payments: PaymentService) -> Self {
        Self { payments }
    }

    pub fn place(&self) {
        self.payments.charge();
        Mailer::new().send();
    }
}
