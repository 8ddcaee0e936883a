//! Outbound mail for one-time login codes.
//!
//! Two transports implement [`Mailer`]: [`LogMailer`] writes messages to the
//! log and keeps an in-memory outbox, [`RelayMailer`] posts them to an HTTP
//! mail relay.

pub mod log;
pub mod relay;

pub use log::LogMailer;
pub use relay::RelayMailer;

use crate::config::{MailConfig, MailTransport};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// A single plain-text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail relay rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;

    /// Transport name for log lines.
    fn name(&self) -> &'static str;
}

/// Build the transport selected by the config
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    let mailer: Arc<dyn Mailer> = match config.transport {
        MailTransport::Log => Arc::new(LogMailer::new()),
        MailTransport::Relay => Arc::new(RelayMailer::new(config)?),
    };
    tracing::info!("Mail transport: {}", mailer.name());
    Ok(mailer)
}

/// Render the `From` header value, e.g. `Project Synedrius <no-reply@localhost>`.
pub fn format_sender(config: &MailConfig) -> String {
    if config.from_name.trim().is_empty() {
        config.from_address.clone()
    } else {
        format!("{} <{}>", config.from_name.trim(), config.from_address)
    }
}
