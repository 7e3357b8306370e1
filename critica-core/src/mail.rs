//! Outbound mail port.
//!
//! Delivery is best-effort: the registration flow spawns the send and
//! never lets a transport failure roll back the committed user record.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::Result;

/// Mail settings handed to the registration flow at construction. No
/// ambient global configuration is consulted.
#[derive(Debug, Clone)]
pub struct MailSettings {
    /// Sender address for outbound mail.
    pub sender: String,
    /// Subject line for confirmation-code mail.
    pub confirmation_subject: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            sender: "no-reply@critica.local".to_string(),
            confirmation_subject: "Your Critica confirmation code".to_string(),
        }
    }
}

/// Transport-agnostic mail dispatch.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Mailer that records deliveries on the log instead of a wire transport.
/// Stands in wherever no SMTP relay is configured.
#[derive(Debug)]
pub struct TracingMailer {
    sender: String,
}

impl TracingMailer {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl Mailer for TracingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        info!(from = %self.sender, %to, %subject, "dispatching mail");
        debug!(%body, "mail body");
        Ok(())
    }
}
