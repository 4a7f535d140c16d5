//! Webhook channel.
//!
//! POSTs a JSON document describing the notification to the `url` parameter.
//! Any non-2xx response is a delivery failure.

use std::sync::Arc;

use async_trait::async_trait;

use marshal_core::config::WebhookConfig;

use crate::channel::ChannelSender;
use crate::error::DeliveryError;
use crate::params::{optional_string, Params};

/// HTTP POST primitive. Returns the response status code.
#[async_trait]
pub trait HttpPoster: Send + Sync {
    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: &serde_json::Value,
    ) -> Result<u16, DeliveryError>;
}

/// `HttpPoster` backed by a shared reqwest client.
#[derive(Clone, Default)]
pub struct ReqwestPoster {
    client: reqwest::Client,
}

impl ReqwestPoster {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpPoster for ReqwestPoster {
    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: &serde_json::Value,
    ) -> Result<u16, DeliveryError> {
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| DeliveryError::Http(e.to_string()))?;

        Ok(resp.status().as_u16())
    }
}

/// Sender for the `webhook` channel. Requires a `url` parameter.
pub struct WebhookSender {
    config: WebhookConfig,
    poster: Arc<dyn HttpPoster>,
}

impl WebhookSender {
    pub fn new(config: WebhookConfig, poster: Arc<dyn HttpPoster>) -> Self {
        Self { config, poster }
    }
}

#[async_trait]
impl ChannelSender for WebhookSender {
    fn channel(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, message: &str, params: &Params) -> Result<(), DeliveryError> {
        let url = optional_string(params, "url").ok_or(DeliveryError::MissingParam {
            channel: "webhook",
            param: "url",
        })?;

        let body = serde_json::json!({
            "channel": "webhook",
            "record_id": params.get("record_id").cloned().unwrap_or(serde_json::Value::Null),
            "message": message,
        });

        let status = self
            .poster
            .post(url, &self.config.content_type, &body)
            .await?;

        if (200..300).contains(&status) {
            tracing::info!(url = %url, status, "Webhook notification sent");
            Ok(())
        } else {
            Err(DeliveryError::Status(status))
        }
    }
}
