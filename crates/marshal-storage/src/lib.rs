//! Marshal Storage crate - SQLite persistence for records, tags and notifications.
//!
//! Provides a WAL-mode SQLite database with migrations, the narrow
//! `RecordStore` write interface used by the action engine, and read-side
//! repositories for records and delivery history.

pub mod db;
pub mod migrations;
pub mod queries;
pub mod repository;
pub mod store;

pub use db::Database;
pub use queries::{NotificationFilters, QueryService};
pub use repository::RecordRepository;
pub use store::{RecordStore, SqliteRecordStore};
