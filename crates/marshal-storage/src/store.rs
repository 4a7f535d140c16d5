//! The narrow write interface the action engine applies actions through.

use std::sync::Arc;

use rusqlite::OptionalExtension;

use marshal_core::error::MarshalError;
use marshal_core::types::{
    validate_transition, Notification, NotificationStatus, RecordId, Tag, Timestamp,
};

use crate::db::Database;

/// Record-store collaborator used by the action router and notification tracker.
///
/// Implementations must make each call atomic: a failed call leaves no
/// partial row behind.
pub trait RecordStore: Send + Sync {
    /// Set the `status` field of a record's metadata.
    fn update_status(&self, record_id: RecordId, status: &str) -> Result<(), MarshalError>;

    /// Append a tag to a record.
    fn add_tag(&self, record_id: RecordId, tag: &str) -> Result<Tag, MarshalError>;

    /// Insert a new notification in `pending` status.
    fn create_notification(
        &self,
        record_id: RecordId,
        channel: &str,
        message: &str,
    ) -> Result<Notification, MarshalError>;

    /// Move a notification out of `pending`. Sets `sent_at` when the new
    /// status is `sent`.
    fn update_notification_status(
        &self,
        notification_id: i64,
        status: NotificationStatus,
    ) -> Result<Notification, MarshalError>;
}

/// SQLite-backed record store.
pub struct SqliteRecordStore {
    db: Arc<Database>,
}

impl SqliteRecordStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl RecordStore for SqliteRecordStore {
    fn update_status(&self, record_id: RecordId, status: &str) -> Result<(), MarshalError> {
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE data_records
                     SET metadata = json_set(COALESCE(NULLIF(metadata, ''), '{}'), '$.status', ?1),
                         updated_at = ?2
                     WHERE id = ?3",
                    rusqlite::params![status, Timestamp::now().0, record_id.0],
                )
                .map_err(|e| MarshalError::Storage(format!("Failed to update status: {}", e)))?;

            if changed == 0 {
                return Err(MarshalError::NotFound {
                    entity: "record",
                    id: record_id.0,
                });
            }
            Ok(())
        })
    }

    fn add_tag(&self, record_id: RecordId, tag: &str) -> Result<Tag, MarshalError> {
        let created_at = Timestamp::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tags (record_id, tag_name, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![record_id.0, tag, created_at.0],
            )
            .map_err(|e| MarshalError::Storage(format!("Failed to add tag: {}", e)))?;

            Ok(Tag {
                id: conn.last_insert_rowid(),
                record_id,
                tag_name: tag.to_string(),
                created_at,
            })
        })
    }

    fn create_notification(
        &self,
        record_id: RecordId,
        channel: &str,
        message: &str,
    ) -> Result<Notification, MarshalError> {
        let created_at = Timestamp::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (record_id, channel, message, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    record_id.0,
                    channel,
                    message,
                    NotificationStatus::Pending.as_str(),
                    created_at.0,
                ],
            )
            .map_err(|e| MarshalError::Storage(format!("Failed to create notification: {}", e)))?;

            Ok(Notification {
                id: conn.last_insert_rowid(),
                record_id,
                channel: channel.to_string(),
                message: message.to_string(),
                status: NotificationStatus::Pending,
                created_at,
                sent_at: None,
            })
        })
    }

    fn update_notification_status(
        &self,
        notification_id: i64,
        status: NotificationStatus,
    ) -> Result<Notification, MarshalError> {
        self.db.with_tx(|tx| {
            let mut notification = tx
                .query_row(
                    "SELECT id, record_id, channel, message, status, created_at, sent_at
                     FROM notifications WHERE id = ?1",
                    rusqlite::params![notification_id],
                    |row| Ok(row_to_notification(row)),
                )
                .optional()
                .map_err(|e| MarshalError::Storage(e.to_string()))?
                .ok_or(MarshalError::NotFound {
                    entity: "notification",
                    id: notification_id,
                })??;

            validate_transition(notification.status, status)?;

            let sent_at = (status == NotificationStatus::Sent).then(Timestamp::now);
            tx.execute(
                "UPDATE notifications SET status = ?1, sent_at = ?2 WHERE id = ?3",
                rusqlite::params![status.as_str(), sent_at.map(|t| t.0), notification_id],
            )
            .map_err(|e| {
                MarshalError::Storage(format!("Failed to update notification status: {}", e))
            })?;

            notification.status = status;
            notification.sent_at = sent_at;
            Ok(notification)
        })
    }
}

/// Convert a `notifications` row into a Notification.
pub(crate) fn row_to_notification(row: &rusqlite::Row<'_>) -> Result<Notification, MarshalError> {
    let status: String = row.get(4).map_err(|e| MarshalError::Storage(e.to_string()))?;
    let sent_at: Option<i64> = row.get(6).map_err(|e| MarshalError::Storage(e.to_string()))?;

    Ok(Notification {
        id: row.get(0).map_err(|e| MarshalError::Storage(e.to_string()))?,
        record_id: RecordId(row.get(1).map_err(|e| MarshalError::Storage(e.to_string()))?),
        channel: row.get(2).map_err(|e| MarshalError::Storage(e.to_string()))?,
        message: row.get(3).map_err(|e| MarshalError::Storage(e.to_string()))?,
        status: status.parse().map_err(MarshalError::Storage)?,
        created_at: Timestamp(row.get(5).map_err(|e| MarshalError::Storage(e.to_string()))?),
        sent_at: sent_at.map(Timestamp),
    })
}

/// Convert a `tags` row into a Tag.
pub(crate) fn row_to_tag(row: &rusqlite::Row<'_>) -> Result<Tag, MarshalError> {
    Ok(Tag {
        id: row.get(0).map_err(|e| MarshalError::Storage(e.to_string()))?,
        record_id: RecordId(row.get(1).map_err(|e| MarshalError::Storage(e.to_string()))?),
        tag_name: row.get(2).map_err(|e| MarshalError::Storage(e.to_string()))?,
        created_at: Timestamp(row.get(3).map_err(|e| MarshalError::Storage(e.to_string()))?),
    })
}
