//! Database schema migrations.
//!
//! Applies the initial schema: data_records, tags, notifications,
//! analysis_results and the schema_migrations bookkeeping table.

use rusqlite::Connection;
use tracing::info;

use marshal_core::error::MarshalError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), MarshalError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| MarshalError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| MarshalError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), MarshalError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS data_records (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            record_type     TEXT NOT NULL,
            content         TEXT NOT NULL DEFAULT '',
            metadata        TEXT NOT NULL DEFAULT '{}',
            created_at      INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL
        );

        -- Tags are append-only; identical (record_id, tag_name) pairs are allowed.
        CREATE TABLE IF NOT EXISTS tags (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id       INTEGER NOT NULL,
            tag_name        TEXT NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tags_record
            ON tags (record_id, created_at ASC);

        CREATE TABLE IF NOT EXISTS notifications (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id       INTEGER NOT NULL,
            channel         TEXT NOT NULL,
            message         TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'pending'
                            CHECK (status IN ('pending', 'sent', 'failed')),
            created_at      INTEGER NOT NULL,
            sent_at         INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_status
            ON notifications (status, created_at ASC);

        CREATE INDEX IF NOT EXISTS idx_notifications_record
            ON notifications (record_id, created_at ASC);

        CREATE TABLE IF NOT EXISTS analysis_results (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id       INTEGER NOT NULL,
            analysis        TEXT NOT NULL,
            suggestions     TEXT NOT NULL DEFAULT '[]',
            confidence      REAL NOT NULL DEFAULT 0.0,
            created_at      INTEGER NOT NULL
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| MarshalError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}
