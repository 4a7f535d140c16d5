//! Core types for the action engine.
//!
//! Defines the suggested-action wire shape, the handler families it routes
//! to, the analysis envelope a batch arrives in, and the effects of applying
//! an action.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use marshal_core::error::MarshalError;
use marshal_core::types::{Notification, RecordId, Tag};

use crate::params::integral;

// =============================================================================
// Enums
// =============================================================================

/// Handler families an action's `type` selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Database,
    Notification,
    Tag,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Database => write!(f, "database"),
            ActionType::Notification => write!(f, "notification"),
            ActionType::Tag => write!(f, "tag"),
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "database" => Ok(ActionType::Database),
            "notification" => Ok(ActionType::Notification),
            "tag" | "tagging" => Ok(ActionType::Tag),
            _ => Err(format!("Unknown action type: {}", s)),
        }
    }
}

// =============================================================================
// Domain Structs
// =============================================================================

/// A single operation suggested by an analysis result.
///
/// `type` and `target` are kept as raw strings so that an unknown
/// discriminator surfaces as a routing error for that action alone instead of
/// failing the whole batch at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Ranking hint. Execution order is arrival order regardless of priority.
    #[serde(default, deserialize_with = "integral_priority")]
    pub priority: i64,
    /// Free-text undo hint. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<String>,
}

/// Accept `2` and `2.0` alike; the analysis service emits floats.
fn integral_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;
    integral(&number).ok_or_else(|| {
        serde::de::Error::custom(format!("priority must be an integer, got {}", number))
    })
}

impl Action {
    pub fn new(action_type: &str, target: &str, params: serde_json::Value) -> Self {
        Self {
            action_type: action_type.to_string(),
            target: target.to_string(),
            params: match params {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            },
            priority: 0,
            rollback: None,
        }
    }
}

/// What applying an action changed.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionEffect {
    StatusUpdated { record_id: RecordId, status: String },
    Tagged(Tag),
    Notified(Notification),
}

impl fmt::Display for ActionEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionEffect::StatusUpdated { record_id, status } => {
                write!(f, "record {} status set to '{}'", record_id, status)
            }
            ActionEffect::Tagged(tag) => {
                write!(f, "record {} tagged '{}'", tag.record_id, tag.tag_name)
            }
            ActionEffect::Notified(n) => write!(
                f,
                "notification {} for record {} {} via {}",
                n.id, n.record_id, n.status, n.channel
            ),
        }
    }
}

/// An array element that could not be read as an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedAction {
    /// Zero-based position in the batch.
    pub index: usize,
    /// The element's `type` and `target`, when they were strings.
    pub action_type: String,
    pub target: String,
    pub reason: String,
}

/// An action list as handed over by the analysis service.
///
/// Accepts a bare JSON array of actions or any analysis result object
/// carrying an `actions` array (text, metrics and log analyses all do).
/// Every element keeps its position in the original array; elements that are
/// not valid actions land in `rejected` instead of `actions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisEnvelope {
    pub actions: Vec<(usize, Action)>,
    /// Remaining fields of an analysis result object (summary, level, ...).
    pub details: serde_json::Map<String, serde_json::Value>,
    pub rejected: Vec<RejectedAction>,
}

impl AnalysisEnvelope {
    pub fn parse(input: &str) -> Result<Self, MarshalError> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, MarshalError> {
        let (items, details) = match value {
            serde_json::Value::Array(items) => (items, serde_json::Map::new()),
            serde_json::Value::Object(mut details) => {
                let items = match details.remove("actions") {
                    None | Some(serde_json::Value::Null) => Vec::new(),
                    Some(serde_json::Value::Array(items)) => items,
                    Some(_) => {
                        return Err(MarshalError::Serialization(
                            "'actions' must be an array".to_string(),
                        ))
                    }
                };
                (items, details)
            }
            _ => {
                return Err(MarshalError::Serialization(
                    "expected an action array or an analysis result object".to_string(),
                ))
            }
        };

        let mut envelope = AnalysisEnvelope {
            details,
            ..AnalysisEnvelope::default()
        };
        for (index, item) in items.into_iter().enumerate() {
            let label = |field: &str| {
                item.get(field)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            let (action_type, target) = (label("type"), label("target"));

            match serde_json::from_value::<Action>(item) {
                Ok(action) => envelope.actions.push((index, action)),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping malformed action");
                    envelope.rejected.push(RejectedAction {
                        index,
                        action_type,
                        target,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(envelope)
    }

    /// Number of elements in the original array, valid or not.
    pub fn len(&self) -> usize {
        self.actions.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
