//! Action engine for Marshal.
//!
//! Validates and routes the actions suggested by an analysis result, applies
//! them against the record store, and delivers notifications through
//! pluggable channel senders while tracking each delivery's status.

pub mod channel;
pub mod driver;
pub mod error;
pub mod params;
pub mod router;
pub mod tracker;
pub mod types;

pub use channel::{ChannelRegistry, ChannelSender};
pub use driver::{ActionOutcome, BatchReport, ExecutionDriver};
pub use error::{ActionError, DeliveryError, ErrorKind, ParamError};
pub use router::{ActionRouter, Route};
pub use tracker::NotificationTracker;
pub use types::{Action, ActionEffect, ActionType, AnalysisEnvelope, RejectedAction};
