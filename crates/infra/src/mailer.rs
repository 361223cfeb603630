//! Outbound mail collaborator.

use async_trait::async_trait;

/// Delivery seam for the contact-form endpoint. Actual delivery is outside
/// the core; implementations only need to report success or failure.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_contact(&self, name: &str, email: &str, message: &str) -> anyhow::Result<()>;
}

/// Logs outbound mail instead of delivering it. Default wiring for
/// development and tests.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_contact(&self, name: &str, email: &str, message: &str) -> anyhow::Result<()> {
        tracing::info!(name, email, bytes = message.len(), "outbound contact mail");
        Ok(())
    }
}
