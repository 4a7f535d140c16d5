use thiserror::Error;

use crate::types::NotificationStatus;

/// Top-level error type for the Marshal system.
///
/// Storage and configuration failures from every crate funnel into this type
/// so that the `?` operator works across crate boundaries. The action crate
/// wraps it as its persistence failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MarshalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid notification transition: {from} -> {to}")]
    InvalidTransition {
        from: NotificationStatus,
        to: NotificationStatus,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for MarshalError {
    fn from(err: toml::de::Error) -> Self {
        MarshalError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MarshalError {
    fn from(err: toml::ser::Error) -> Self {
        MarshalError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MarshalError {
    fn from(err: serde_json::Error) -> Self {
        MarshalError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Marshal operations.
pub type Result<T> = std::result::Result<T, MarshalError>;
