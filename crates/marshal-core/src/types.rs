use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MarshalError;

// =============================================================================
// Newtype Wrappers
// =============================================================================

/// Unix timestamp in seconds (UTC).
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

/// Numeric identifier of a subject record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// =============================================================================
// Notification lifecycle
// =============================================================================

/// Delivery status of a notification.
///
/// `Pending` is the only non-terminal state: a notification moves to either
/// `Sent` or `Failed` exactly once and never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, NotificationStatus::Pending)
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NotificationStatus::Pending),
            "sent" => Ok(NotificationStatus::Sent),
            "failed" => Ok(NotificationStatus::Failed),
            _ => Err(format!("Unknown notification status: {}", s)),
        }
    }
}

/// Validate that a notification status transition is allowed.
///
/// Valid transitions:
/// - Pending -> Sent
/// - Pending -> Failed
pub fn validate_transition(
    from: NotificationStatus,
    to: NotificationStatus,
) -> Result<(), MarshalError> {
    let valid = matches!(
        (from, to),
        (NotificationStatus::Pending, NotificationStatus::Sent)
            | (NotificationStatus::Pending, NotificationStatus::Failed)
    );

    if valid {
        Ok(())
    } else {
        Err(MarshalError::InvalidTransition { from, to })
    }
}

// =============================================================================
// Domain Structs
// =============================================================================

/// The record of one attempted notification delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub record_id: RecordId,
    pub channel: String,
    pub message: String,
    pub status: NotificationStatus,
    pub created_at: Timestamp,
    pub sent_at: Option<Timestamp>,
}

/// A label attached to a subject record. Append-only, never deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub record_id: RecordId,
    pub tag_name: String,
    pub created_at: Timestamp,
}

/// A piece of content submitted for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    pub id: RecordId,
    pub record_type: String,
    pub content: String,
    /// JSON object; the `status` key is written by status-update actions.
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DataRecord {
    /// Current status from the metadata object, if one has been set.
    pub fn status(&self) -> Option<&str> {
        self.metadata.get("status").and_then(|v| v.as_str())
    }
}

/// Persisted summary of one analysis run over a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub record_id: RecordId,
    pub analysis: String,
    pub suggestions: Vec<String>,
    pub confidence: f64,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_to_datetime_roundtrip() {
        let now = Utc::now();
        let ts = Timestamp::from_datetime(now);
        assert_eq!(ts.to_datetime().timestamp(), now.timestamp());
    }

    #[test]
    fn test_timestamp_display() {
        assert_eq!(Timestamp(0).to_string(), "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_record_id_is_transparent_in_json() {
        let json = serde_json::to_string(&RecordId(7)).unwrap();
        assert_eq!(json, "7");
        let id: RecordId = serde_json::from_str("12").unwrap();
        assert_eq!(id, RecordId(12));
    }

    #[test]
    fn test_notification_status_display_and_parse() {
        for status in [
            NotificationStatus::Pending,
            NotificationStatus::Sent,
            NotificationStatus::Failed,
        ] {
            let parsed: NotificationStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("delivered".parse::<NotificationStatus>().is_err());
    }

    #[test]
    fn test_only_pending_is_non_terminal() {
        assert!(!NotificationStatus::Pending.is_terminal());
        assert!(NotificationStatus::Sent.is_terminal());
        assert!(NotificationStatus::Failed.is_terminal());
    }

    #[test]
    fn test_pending_transitions_are_valid() {
        assert!(validate_transition(NotificationStatus::Pending, NotificationStatus::Sent).is_ok());
        assert!(
            validate_transition(NotificationStatus::Pending, NotificationStatus::Failed).is_ok()
        );
    }

    #[test]
    fn test_terminal_states_never_change() {
        let statuses = [
            NotificationStatus::Pending,
            NotificationStatus::Sent,
            NotificationStatus::Failed,
        ];
        for from in [NotificationStatus::Sent, NotificationStatus::Failed] {
            for to in statuses {
                let err = validate_transition(from, to).unwrap_err();
                assert!(matches!(err, MarshalError::InvalidTransition { .. }));
            }
        }
    }

    #[test]
    fn test_pending_to_pending_invalid() {
        assert!(
            validate_transition(NotificationStatus::Pending, NotificationStatus::Pending).is_err()
        );
    }

    #[test]
    fn test_data_record_status_from_metadata() {
        let mut record = DataRecord {
            id: RecordId(1),
            record_type: "text".to_string(),
            content: "hello".to_string(),
            metadata: serde_json::json!({}),
            created_at: Timestamp(0),
            updated_at: Timestamp(0),
        };
        assert_eq!(record.status(), None);
        record.metadata = serde_json::json!({"status": "reviewed"});
        assert_eq!(record.status(), Some("reviewed"));
    }
}
