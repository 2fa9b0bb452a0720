use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// Who an email is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

impl Recipient {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    fn mailbox(&self) -> String {
        if self.name.is_empty() {
            self.email.clone()
        } else {
            format!("{} <{}>", self.name, self.email)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email send failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email API error ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("email send timed out after {0}s")]
    Timeout(u64),
}

/// Outbound email channel. Implementations must report failures through the
/// returned error and never panic; callers treat every error as recoverable.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &Recipient, subject: &str, body_html: &str) -> Result<(), EmailError>;
}

#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct ResendRequest {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

impl EmailClient {
    pub fn new(api_key: &str, from_email: &str, from_name: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        }
    }
}

#[async_trait]
impl EmailSender for EmailClient {
    async fn send(&self, to: &Recipient, subject: &str, body_html: &str) -> Result<(), EmailError> {
        let request = ResendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: vec![to.mailbox()],
            subject: subject.to_string(),
            html: body_html.to_string(),
        };

        let response = self.client
            .post("https://api.resend.com/emails")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to = %to.email, subject = %subject, "email sent");
        Ok(())
    }
}
