// src/utils/mailer.rs

use async_trait::async_trait;

use crate::error::AppError;

/// Outbound transactional email. Delivery itself lives outside this service.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<(), AppError>;
}

/// Writes outgoing mail to the log instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<(), AppError> {
        // The link carries a live token, so it stays out of info-level logs.
        tracing::info!(to, "Password reset requested; link expires in 1 hour");
        tracing::debug!(to, reset_link, "Password reset link");
        Ok(())
    }
}
