//! Email delivery abstraction.
//!
//! Delivery mechanics are an external concern; the worker only needs the
//! [`EmailSender`] trait. The tracing-backed sender below is what dev and
//! test environments run with.

use async_trait::async_trait;

use crate::config::MailConfig;

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(
        &self,
        subject: &str,
        content: &str,
        to: &[String],
    ) -> anyhow::Result<()>;
}

/// Dev sender: writes the mail to the log instead of delivering it.
pub struct LogEmailSender {
    sender_name: String,
    sender_address: String,
}

impl LogEmailSender {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            sender_name: config.sender_name.clone(),
            sender_address: config.sender_address.clone(),
        }
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_email(
        &self,
        subject: &str,
        content: &str,
        to: &[String],
    ) -> anyhow::Result<()> {
        tracing::info!(
            from = %format!("{} <{}>", self.sender_name, self.sender_address),
            to = ?to,
            subject,
            content,
            "email sent (log sender)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_sender_always_succeeds() {
        let sender = LogEmailSender::new(&MailConfig::default());
        sender
            .send_email("Welcome", "<p>hello</p>", &["alice@example.com".to_string()])
            .await
            .unwrap();
    }
}
