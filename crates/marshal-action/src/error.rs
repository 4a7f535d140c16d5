//! Error types for the action engine.

use std::fmt;

use marshal_core::error::MarshalError;

use crate::types::ActionType;

/// Errors from routing and applying a single action.
///
/// Every variant is attributed to one action and is recoverable at the batch
/// level; the execution driver records it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Malformed action: {0}")]
    Malformed(String),
    #[error("No such action type: {0}")]
    UnknownType(String),
    #[error("No such action target for {action_type}: {target}")]
    UnknownTarget {
        action_type: ActionType,
        target: String,
    },
    #[error("Parameter validation failed: {0}")]
    InvalidParams(#[from] ParamError),
    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("Persistence failed: {0}")]
    Persistence(#[from] MarshalError),
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::Malformed(_) => ErrorKind::MalformedAction,
            ActionError::UnknownType(_) | ActionError::UnknownTarget { .. } => {
                ErrorKind::UnresolvedAction
            }
            ActionError::InvalidParams(_) => ErrorKind::ParameterValidation,
            ActionError::Delivery(_) => ErrorKind::DeliveryFailure,
            ActionError::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }
}

/// Coarse classification of an [`ActionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The batch element could not be read as an action at all.
    MalformedAction,
    UnresolvedAction,
    ParameterValidation,
    DeliveryFailure,
    PersistenceFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MalformedAction => write!(f, "malformed_action"),
            ErrorKind::UnresolvedAction => write!(f, "unresolved_action"),
            ErrorKind::ParameterValidation => write!(f, "parameter_validation"),
            ErrorKind::DeliveryFailure => write!(f, "delivery_failure"),
            ErrorKind::PersistenceFailure => write!(f, "persistence_failure"),
        }
    }
}

/// A required action parameter was absent or of the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("missing required parameter '{0}'")]
    Missing(&'static str),
    #[error("parameter '{field}' must be {expected}")]
    WrongKind {
        field: &'static str,
        expected: &'static str,
    },
}

/// Errors reported by channel senders and their transports.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Unsupported channel: {0}")]
    UnsupportedChannel(String),
    #[error("{channel} channel requires parameter '{param}'")]
    MissingParam {
        channel: &'static str,
        param: &'static str,
    },
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("SMTP send failed: {0}")]
    Smtp(String),
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("Webhook responded with status {0}")]
    Status(u16),
}
