//! Notification channel senders and their registry.
//!
//! Defines the `ChannelSender` async trait and the registry that resolves a
//! channel name to the sender implementing it.

pub mod email;
pub mod sms;
pub mod webhook;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use marshal_core::config::MarshalConfig;

use crate::error::DeliveryError;
use crate::params::Params;

pub use email::{EmailSender, MailTransport, OutgoingMail, SmtpMailer};
pub use sms::SmsSender;
pub use webhook::{HttpPoster, ReqwestPoster, WebhookSender};

/// A "deliver this message" capability for one channel.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// The channel name actions select this sender by.
    fn channel(&self) -> &'static str;

    /// Deliver `message`, reading channel-specific settings from `params`.
    async fn send(&self, message: &str, params: &Params) -> Result<(), DeliveryError>;
}

/// Lookup of channel senders keyed by channel name.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    senders: HashMap<&'static str, Arc<dyn ChannelSender>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the email, sms and webhook senders wired to real
    /// SMTP and HTTP transports.
    pub fn from_config(config: &MarshalConfig) -> Self {
        let mut registry = Self::new();
        registry.register(EmailSender::new(
            config.smtp.clone(),
            Arc::new(SmtpMailer::new(config.smtp.clone())),
        ));
        registry.register(SmsSender);
        registry.register(WebhookSender::new(
            config.webhook.clone(),
            Arc::new(ReqwestPoster::new()),
        ));
        registry
    }

    /// Register a sender, replacing any previous sender for the same channel.
    pub fn register<S: ChannelSender + 'static>(&mut self, sender: S) {
        self.senders.insert(sender.channel(), Arc::new(sender));
    }

    /// Resolve the sender for a channel name.
    pub fn get(&self, channel: &str) -> Result<Arc<dyn ChannelSender>, DeliveryError> {
        self.senders
            .get(channel)
            .cloned()
            .ok_or_else(|| DeliveryError::UnsupportedChannel(channel.to_string()))
    }

    /// Registered channel names, sorted.
    pub fn channels(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.senders.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.channels())
            .finish()
    }
}
