//! Marshal application binary - composition root.
//!
//! 1. Load configuration from TOML and the SMTP_* environment
//! 2. Initialize logging
//! 3. Open the SQLite record store
//! 4. Run the requested command (apply an analysis result, or inspect
//!    records, tags and notifications)

mod cli;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use marshal_action::{ActionRouter, AnalysisEnvelope, BatchReport, ChannelRegistry, ExecutionDriver};
use marshal_core::config::MarshalConfig;
use marshal_core::error::MarshalError;
use marshal_core::types::{NotificationStatus, RecordId};
use marshal_storage::{Database, NotificationFilters, QueryService, RecordRepository, SqliteRecordStore};

use cli::{CliArgs, Command, RecordCommand};

/// Read an analysis result from a file, or from stdin when the path is `-`.
fn read_input(path: &Path) -> Result<String, MarshalError> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        Ok(input)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn print_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(effect) => println!("[{}] ok     {}", outcome.index, effect),
            Err(err) => println!(
                "[{}] failed {}/{}: {}",
                outcome.index, outcome.action_type, outcome.target, err
            ),
        }
    }
    println!("batch {}: {}", report.batch_id, report);
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), MarshalError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn apply(config: &MarshalConfig, db: Arc<Database>, path: &Path) -> Result<(), MarshalError> {
    let envelope = AnalysisEnvelope::parse(&read_input(path)?)?;

    let registry = ChannelRegistry::from_config(config);
    tracing::info!(channels = ?registry.channels(), "Channel senders ready");

    let store = Arc::new(SqliteRecordStore::new(db));
    let driver = ExecutionDriver::new(ActionRouter::new(store, registry));
    let report = driver.run_envelope(&envelope).await;
    print_report(&report);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = MarshalConfig::load_or_default(&config_file);
    config.apply_env_overrides()?;

    // Tracing. RUST_LOG wins over flags and config.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(path = %config_file.display(), "Starting Marshal v{}", env!("CARGO_PKG_VERSION"));

    // Storage.
    let db_path = args.resolve_database(&config.storage.database_path);
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    match args.command {
        Command::Apply { file } => apply(&config, db, &file).await?,
        Command::Record { command } => {
            let records = RecordRepository::new(db);
            match command {
                RecordCommand::Add {
                    record_type,
                    content,
                } => print_json(&records.create(&record_type, &content)?)?,
                RecordCommand::Show { id } => match records.get(RecordId(id))? {
                    Some(record) => print_json(&record)?,
                    None => return Err(MarshalError::NotFound { entity: "record", id }.into()),
                },
            }
        }
        Command::Tags { record_id } => {
            let tags = QueryService::new(db).tags_for_record(RecordId(record_id))?;
            print_json(&tags)?;
        }
        Command::Notifications {
            pending,
            record,
            limit,
        } => {
            let filters = NotificationFilters {
                status: pending.then_some(NotificationStatus::Pending),
                record_id: record.map(RecordId),
                limit,
            };
            print_json(&QueryService::new(db).notifications(&filters)?)?;
        }
    }

    Ok(())
}
