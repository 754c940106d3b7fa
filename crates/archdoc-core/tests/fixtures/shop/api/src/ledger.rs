/// @component
pub struct Ledger;

impl Ledger {
    pub fn record(&self) {}
}
