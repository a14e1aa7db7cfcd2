// dbops/src/verify/outcome.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const RESULT_SKIPPED: &str = "Skipped";
pub const RESULT_SUCCESS: &str = "Success";
pub const RESULT_NOT_SHARED: &str = "Restore not located on shared location";

/// Per-database result of the verification workflow; the sole externally
/// visible output. Never mutated after emission.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutcome {
    pub source_instance: String,
    pub destination_instance: String,
    pub database: String,
    pub file_exists: bool,
    pub restore_result: String,
    pub dbcc_result: String,
    pub restore_start: Option<DateTime<Utc>>,
    pub restore_end: Option<DateTime<Utc>>,
    pub restore_elapsed_secs: Option<i64>,
    pub dbcc_start: Option<DateTime<Utc>>,
    pub dbcc_end: Option<DateTime<Utc>>,
    pub dbcc_elapsed_secs: Option<i64>,
    pub backup_date: Option<DateTime<Utc>>,
    pub backup_files: Vec<String>,
    /// Size of the backup set as recorded in the history tables, not as
    /// measured from the media.
    pub backup_size_mb: Option<f64>,
    pub copy_only: bool,
}

impl VerifyOutcome {
    /// Starts a record with both steps marked skipped; the orchestrator
    /// fills in whatever actually ran.
    pub fn new(source: &str, destination: &str, database: &str) -> Self {
        VerifyOutcome {
            source_instance: source.to_string(),
            destination_instance: destination.to_string(),
            database: database.to_string(),
            file_exists: false,
            restore_result: RESULT_SKIPPED.to_string(),
            dbcc_result: RESULT_SKIPPED.to_string(),
            restore_start: None,
            restore_end: None,
            restore_elapsed_secs: None,
            dbcc_start: None,
            dbcc_end: None,
            dbcc_elapsed_secs: None,
            backup_date: None,
            backup_files: Vec::new(),
            backup_size_mb: None,
            copy_only: false,
        }
    }
}
