use crate::config::MailerConfig;
use crate::errors::ServiceError;
use async_trait::async_trait;
use tracing::info;

/// Outbound mail collaborator. Delivery is best-effort everywhere: callers
/// log failures and never propagate them.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ServiceError>;
}

/// Default implementation that writes the message to the log instead of an
/// SMTP relay. Deployments swap in a real transport behind the same trait.
pub struct LogMailer {
    from_address: String,
}

impl LogMailer {
    pub fn new(config: &MailerConfig) -> Self {
        Self {
            from_address: config.from_address.clone(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ServiceError> {
        info!(
            from = %self.from_address,
            %to,
            %subject,
            %body,
            "mail dispatched"
        );
        Ok(())
    }
}
