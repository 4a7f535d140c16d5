//! Notification delivery tracking.
//!
//! Every delivery attempt is persisted as a notification row that starts in
//! `pending` and is moved to `sent` or `failed` as soon as the channel sender
//! returns.

use std::sync::Arc;

use marshal_core::types::{Notification, NotificationStatus, RecordId};
use marshal_storage::RecordStore;

use crate::channel::ChannelRegistry;
use crate::error::ActionError;
use crate::params::Params;

/// Persists notifications and drives them through their status lifecycle.
pub struct NotificationTracker {
    store: Arc<dyn RecordStore>,
    channels: ChannelRegistry,
}

impl NotificationTracker {
    pub fn new(store: Arc<dyn RecordStore>, channels: ChannelRegistry) -> Self {
        Self { store, channels }
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Deliver `message` to `channel` on behalf of `record_id`.
    ///
    /// The pending row is written before the channel is resolved, so an
    /// unsupported channel leaves a `failed` row like any other delivery
    /// error. The delivery error is always the one returned, even if
    /// recording the `failed` status fails as well.
    ///
    /// Senders see `record_id` in `params` as the validated integer.
    pub async fn deliver(
        &self,
        record_id: RecordId,
        channel: &str,
        message: &str,
        params: &Params,
    ) -> Result<Notification, ActionError> {
        let notification = self
            .store
            .create_notification(record_id, channel, message)?;

        let mut params = params.clone();
        params.insert("record_id".to_string(), serde_json::Value::from(record_id.0));

        let sent = match self.channels.get(channel) {
            Ok(sender) => sender.send(message, &params).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => {
                let sent = self
                    .store
                    .update_notification_status(notification.id, NotificationStatus::Sent)
                    .map_err(|e| {
                        tracing::error!(
                            notification_id = notification.id,
                            error = %e,
                            "Notification delivered but status update failed"
                        );
                        e
                    })?;
                Ok(sent)
            }
            Err(delivery_err) => {
                tracing::warn!(
                    notification_id = notification.id,
                    record_id = %record_id,
                    channel = %channel,
                    error = %delivery_err,
                    "Notification delivery failed"
                );
                if let Err(update_err) = self
                    .store
                    .update_notification_status(notification.id, NotificationStatus::Failed)
                {
                    tracing::error!(
                        notification_id = notification.id,
                        error = %update_err,
                        "Failed to record failed notification status"
                    );
                }
                Err(ActionError::Delivery(delivery_err))
            }
        }
    }
}
