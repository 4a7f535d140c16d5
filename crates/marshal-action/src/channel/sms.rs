//! SMS channel.
//!
//! Placeholder until a carrier integration exists: logs the message and
//! reports success.

use async_trait::async_trait;

use crate::channel::ChannelSender;
use crate::error::DeliveryError;
use crate::params::{optional_string, Params};

/// Sender for the `sms` channel.
pub struct SmsSender;

#[async_trait]
impl ChannelSender for SmsSender {
    fn channel(&self) -> &'static str {
        "sms"
    }

    async fn send(&self, message: &str, params: &Params) -> Result<(), DeliveryError> {
        // TODO: hand off to an SMS provider API once one is chosen; `phone` is
        // the parameter it will read.
        let phone = optional_string(params, "phone").unwrap_or("<unset>");
        tracing::info!(phone = %phone, message = %message, "SMS notification (no provider configured)");
        Ok(())
    }
}
