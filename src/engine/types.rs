// dbops/src/engine/types.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

/// SQL login credential for an instance. When absent, the engine client
/// falls back to integrated/trusted authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// One addressable server instance, e.g. `HOST`, `HOST\NAMED` or `host,1433`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub credential: Option<Credential>,
}

impl Instance {
    pub fn new(name: impl Into<String>, credential: Option<Credential>) -> Self {
        Instance {
            name: name.into(),
            credential,
        }
    }
}

impl std::fmt::Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Engine major/minor version. Ordering is derived field-by-field, which is
/// exactly the comparison the cross-instance restore guard needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
}

impl std::fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Snapshot of a connected instance: version, default directories and the
/// database catalog at connect time. Restores invalidate the catalog view,
/// so callers re-connect after mutating server state.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub instance: String,
    pub version: EngineVersion,
    pub data_path: String,
    pub log_path: String,
    pub backup_path: String,
    pub databases: Vec<String>,
}

/// The most recent full backup of one database, as recorded in the engine's
/// backup history. `paths` holds every stripe of the media set; the fields are
/// rewritten in place when the files are relocated to a destination share.
#[derive(Debug, Clone, Serialize)]
pub struct BackupRecord {
    pub server: String,
    pub database: String,
    pub paths: Vec<String>,
    pub total_size_mb: f64,
    pub start_time: DateTime<Utc>,
    pub copy_only: bool,
}

/// One logical file inside a backup set, as reported by the file list.
#[derive(Debug, Clone)]
pub struct LogicalFile {
    pub logical_name: String,
    /// "D" for data, "L" for log.
    pub file_type: String,
}

/// Header/file-list metadata read from the backup media itself, without
/// restoring it.
#[derive(Debug, Clone)]
pub struct BackupHeader {
    /// Uncompressed size of the database the backup would materialize.
    pub size_mb: f64,
    pub files: Vec<LogicalFile>,
}

/// Everything the engine needs to restore a backup under a new identity.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreRequest {
    /// Target database name on the destination (already prefixed).
    pub database: String,
    pub backup_files: Vec<String>,
    pub data_directory: String,
    pub log_directory: String,
    /// Prefix applied to relocated physical file names so a test restore
    /// never collides with the original database's files.
    pub file_prefix: String,
    /// When set, run a verification pass over the media without
    /// materializing any data.
    pub verify_only: bool,
}

#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct CheckReport {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryModel {
    Simple,
    Full,
    BulkLogged,
}

impl std::fmt::Display for RecoveryModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecoveryModel::Simple => "SIMPLE",
            RecoveryModel::Full => "FULL",
            RecoveryModel::BulkLogged => "BULK_LOGGED",
        };
        write!(f, "{s}")
    }
}

/// Sizing for one data or log file, in megabytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileSpec {
    pub logical_name: String,
    pub physical_path: String,
    pub size_mb: u64,
    pub growth_mb: Option<u64>,
    pub max_size_mb: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroupSpec {
    pub name: String,
    pub files: Vec<DataFileSpec>,
}

/// Fully resolved creation plan for one database. When `primary_file`,
/// `log_file` and `secondary_filegroup` are all `None` the engine creates the
/// database with its own defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabasePlan {
    pub name: String,
    pub collation: Option<String>,
    pub recovery_model: Option<RecoveryModel>,
    pub primary_file: Option<DataFileSpec>,
    pub log_file: Option<DataFileSpec>,
    pub secondary_filegroup: Option<FileGroupSpec>,
}

/// Primary-file and log sizes of the engine's template ("model") database.
/// New databases are cloned from the template and can never be created
/// smaller than it.
#[derive(Debug, Clone, Copy)]
pub struct TemplateLayout {
    pub primary_size_mb: u64,
    pub log_size_mb: u64,
}

/// One physical file of an existing database.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseFileInfo {
    pub logical_name: String,
    pub filegroup: String,
    pub size_mb: f64,
}

/// Descriptor of a database re-queried from the instance after creation.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseInfo {
    pub instance: String,
    pub name: String,
    pub owner: String,
    pub collation: String,
    pub recovery_model: String,
    pub files: Vec<DatabaseFileInfo>,
}
