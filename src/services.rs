// services.rs
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
#[error("Failed to send mail to {recipient}: {reason}")]
pub struct MailError {
    pub recipient: String,
    pub reason: String,
}

/// Outbound mail used to deliver login links.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_login_link(&self, recipient: &str, login_url: &str) -> Result<(), MailError>;
}

/// Writes the login link to the log instead of sending it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_login_link(&self, recipient: &str, login_url: &str) -> Result<(), MailError> {
        info!(%recipient, %login_url, "Login link issued");
        Ok(())
    }
}
