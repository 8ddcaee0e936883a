use super::{format_sender, MailError, MailMessage, Mailer};
use crate::config::MailConfig;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends mail by POSTing JSON to an HTTP relay.
///
/// The request body is `{"from", "to", "subject", "text"}`; when an API key
/// is configured it is sent as a bearer token.
pub struct RelayMailer {
    client: Client,
    url: String,
    api_key: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl RelayMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let url = config
            .relay_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| anyhow::anyhow!("mail.relay_url is not set"))?
            .to_string();

        let client = Client::builder().timeout(RELAY_TIMEOUT).build()?;

        Ok(Self {
            client,
            url,
            api_key: config.relay_api_key.clone().filter(|k| !k.is_empty()),
            from: format_sender(config),
        })
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let mut request = self.client.post(&self.url).json(&RelayRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected { status, body });
        }

        tracing::info!(to = %message.to, "Mail handed to relay");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}
