use super::{MailError, MailMessage, Mailer};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Development transport: logs each message and records it in an outbox.
#[derive(Default)]
pub struct LogMailer {
    outbox: Mutex<Vec<MailMessage>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<MailMessage> {
        self.outbox.lock().clone()
    }

    /// Most recent message addressed to `to`.
    pub fn last_to(&self, to: &str) -> Option<MailMessage> {
        self.outbox
            .lock()
            .iter()
            .rev()
            .find(|m| m.to.eq_ignore_ascii_case(to))
            .cloned()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        tracing::info!(to = %message.to, subject = %message.subject, "Mail (log transport)");
        tracing::debug!("{}", message.body);
        self.outbox.lock().push(message.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outbox_records_messages() {
        let mailer = LogMailer::new();
        mailer
            .send(&MailMessage::new("a@example.com", "one", "first"))
            .await
            .unwrap();
        mailer
            .send(&MailMessage::new("b@example.com", "two", "second"))
            .await
            .unwrap();
        mailer
            .send(&MailMessage::new("A@example.com", "three", "third"))
            .await
            .unwrap();

        assert_eq!(mailer.sent().len(), 3);
        assert_eq!(mailer.last_to("a@example.com").unwrap().body, "third");
        assert!(mailer.last_to("c@example.com").is_none());
    }
}
