//! Record and analysis-result persistence.

use std::sync::Arc;

use rusqlite::OptionalExtension;

use marshal_core::error::MarshalError;
use marshal_core::types::{AnalysisResult, DataRecord, RecordId, Timestamp};

use crate::db::Database;

/// Repository for analyzed data records.
pub struct RecordRepository {
    db: Arc<Database>,
}

impl RecordRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new record with empty metadata.
    pub fn create(&self, record_type: &str, content: &str) -> Result<DataRecord, MarshalError> {
        let now = Timestamp::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO data_records (record_type, content, metadata, created_at, updated_at)
                 VALUES (?1, ?2, '{}', ?3, ?3)",
                rusqlite::params![record_type, content, now.0],
            )
            .map_err(|e| MarshalError::Storage(format!("Failed to create record: {}", e)))?;

            Ok(DataRecord {
                id: RecordId(conn.last_insert_rowid()),
                record_type: record_type.to_string(),
                content: content.to_string(),
                metadata: serde_json::json!({}),
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Find a record by ID.
    pub fn get(&self, id: RecordId) -> Result<Option<DataRecord>, MarshalError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, record_type, content, metadata, created_at, updated_at
                     FROM data_records WHERE id = ?1",
                    rusqlite::params![id.0],
                    |row| Ok(row_to_record(row)),
                )
                .optional()
                .map_err(|e| MarshalError::Storage(e.to_string()))?;

            match result {
                Some(record) => Ok(Some(record?)),
                None => Ok(None),
            }
        })
    }

    /// Persist the summary of an analysis run.
    pub fn save_analysis_result(&self, result: &AnalysisResult) -> Result<i64, MarshalError> {
        let suggestions = serde_json::to_string(&result.suggestions)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO analysis_results (record_id, analysis, suggestions, confidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    result.record_id.0,
                    result.analysis,
                    suggestions,
                    result.confidence,
                    result.created_at.0,
                ],
            )
            .map_err(|e| MarshalError::Storage(format!("Failed to save analysis result: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<DataRecord, MarshalError> {
    let metadata: String = row.get(3).map_err(|e| MarshalError::Storage(e.to_string()))?;
    let metadata = if metadata.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(&metadata)?
    };

    Ok(DataRecord {
        id: RecordId(row.get(0).map_err(|e| MarshalError::Storage(e.to_string()))?),
        record_type: row.get(1).map_err(|e| MarshalError::Storage(e.to_string()))?,
        content: row.get(2).map_err(|e| MarshalError::Storage(e.to_string()))?,
        metadata,
        created_at: Timestamp(row.get(4).map_err(|e| MarshalError::Storage(e.to_string()))?),
        updated_at: Timestamp(row.get(5).map_err(|e| MarshalError::Storage(e.to_string()))?),
    })
}
