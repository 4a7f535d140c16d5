//! Read-side queries over tags and notification history.

use std::sync::Arc;

use marshal_core::error::MarshalError;
use marshal_core::types::{Notification, NotificationStatus, RecordId, Tag};

use crate::db::Database;
use crate::store::{row_to_notification, row_to_tag};

/// Filters for listing notifications.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilters {
    pub status: Option<NotificationStatus>,
    pub record_id: Option<RecordId>,
    pub limit: Option<u64>,
}

/// Read-only query service.
pub struct QueryService {
    db: Arc<Database>,
}

impl QueryService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// All tags on a record, oldest first. Duplicates are returned as stored.
    pub fn tags_for_record(&self, record_id: RecordId) -> Result<Vec<Tag>, MarshalError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, record_id, tag_name, created_at
                     FROM tags WHERE record_id = ?1
                     ORDER BY created_at ASC, id ASC",
                )
                .map_err(|e| MarshalError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![record_id.0], |row| Ok(row_to_tag(row)))
                .map_err(|e| MarshalError::Storage(e.to_string()))?;

            let mut tags = Vec::new();
            for row in rows {
                tags.push(row.map_err(|e| MarshalError::Storage(e.to_string()))??);
            }
            Ok(tags)
        })
    }

    /// Notifications still awaiting a delivery outcome.
    pub fn pending_notifications(&self) -> Result<Vec<Notification>, MarshalError> {
        self.notifications(&NotificationFilters {
            status: Some(NotificationStatus::Pending),
            ..NotificationFilters::default()
        })
    }

    /// Delivery history of one record.
    pub fn notifications_for_record(
        &self,
        record_id: RecordId,
    ) -> Result<Vec<Notification>, MarshalError> {
        self.notifications(&NotificationFilters {
            record_id: Some(record_id),
            ..NotificationFilters::default()
        })
    }

    /// List notifications, oldest first.
    pub fn notifications(
        &self,
        filters: &NotificationFilters,
    ) -> Result<Vec<Notification>, MarshalError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, record_id, channel, message, status, created_at, sent_at
                     FROM notifications
                     WHERE (?1 IS NULL OR status = ?1)
                       AND (?2 IS NULL OR record_id = ?2)
                     ORDER BY created_at ASC, id ASC
                     LIMIT ?3",
                )
                .map_err(|e| MarshalError::Storage(e.to_string()))?;

            let limit = filters.limit.map(|l| l as i64).unwrap_or(-1);
            let rows = stmt
                .query_map(
                    rusqlite::params![
                        filters.status.map(|s| s.as_str()),
                        filters.record_id.map(|r| r.0),
                        limit,
                    ],
                    |row| Ok(row_to_notification(row)),
                )
                .map_err(|e| MarshalError::Storage(e.to_string()))?;

            let mut notifications = Vec::new();
            for row in rows {
                notifications.push(row.map_err(|e| MarshalError::Storage(e.to_string()))??);
            }
            Ok(notifications)
        })
    }
}
