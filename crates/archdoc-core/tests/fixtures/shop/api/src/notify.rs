/// Sends email.
///
/// @component
pub struct Mailer;

impl Mailer {
    pub fn new() -> Self {
        Mailer
    }

    pub fn send(&self) {}
}
