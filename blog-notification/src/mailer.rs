use std::sync::Arc;
use std::time::Duration;

use blog_shared::clients::email::{EmailError, EmailSender, Recipient};

/// Email channel with a per-send deadline. A send that outlives the deadline
/// is reported as [`EmailError::Timeout`].
#[derive(Clone)]
pub struct Mailer {
    sender: Arc<dyn EmailSender>,
    timeout: Duration,
}

impl Mailer {
    pub fn new(sender: Arc<dyn EmailSender>, timeout: Duration) -> Self {
        Self { sender, timeout }
    }

    pub async fn send(&self, to: &Recipient, subject: &str, body_html: &str) -> Result<(), EmailError> {
        match tokio::time::timeout(self.timeout, self.sender.send(to, subject, body_html)).await {
            Ok(result) => result,
            Err(_) => Err(EmailError::Timeout(self.timeout.as_secs())),
        }
    }
}
