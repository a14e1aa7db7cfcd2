// dbops/src/engine/mod.rs
pub mod types;
pub(crate) mod sqlcmd;

pub use sqlcmd::SqlcmdEngine;
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;

/// Everything the orchestrators need from the database engine and the file
/// system it can reach. The real implementation drives the engine's own
/// client tool; tests substitute `MockEngine`.
#[mockall::automock]
#[async_trait]
pub trait Engine: Send + Sync {
    /// Connect to an instance and snapshot its version, service account,
    /// default directories and database catalog.
    async fn connect(&self, instance: &Instance) -> Result<ServerInfo>;

    /// Most recent full backup for `database` from the instance's backup
    /// history, or `None` when no full backup exists.
    async fn last_full_backup(
        &self,
        instance: &Instance,
        database: &str,
        ignore_copy_only: bool,
    ) -> Result<Option<BackupRecord>>;

    /// Read size and logical file list from the backup media without
    /// restoring it.
    async fn read_backup_header(
        &self,
        instance: &Instance,
        files: &[String],
    ) -> Result<BackupHeader>;

    /// Whether `path` is reachable from the instance's own host.
    async fn file_exists(&self, instance: &Instance, path: &str) -> Result<bool>;

    async fn database_exists(&self, instance: &Instance, name: &str) -> Result<bool>;

    /// Create a directory on the instance's host (no-op when present).
    async fn create_directory(&self, instance: &Instance, path: &str) -> Result<()>;

    async fn restore_database(
        &self,
        instance: &Instance,
        request: &RestoreRequest,
    ) -> Result<RestoreReport>;

    /// Full structural consistency check of a named database.
    async fn run_checkdb(&self, instance: &Instance, database: &str) -> Result<CheckReport>;

    async fn drop_database(&self, instance: &Instance, database: &str) -> Result<()>;

    async fn create_database(&self, instance: &Instance, plan: &DatabasePlan) -> Result<()>;

    async fn set_owner(&self, instance: &Instance, database: &str, owner: &str) -> Result<()>;

    async fn set_default_filegroup(
        &self,
        instance: &Instance,
        database: &str,
        filegroup: &str,
    ) -> Result<()>;

    async fn database_info(&self, instance: &Instance, name: &str) -> Result<DatabaseInfo>;

    /// Primary/log sizes of the template database, for the creation floor.
    async fn template_layout(&self, instance: &Instance) -> Result<TemplateLayout>;

    /// Copy a backup file between paths reachable from the operator host
    /// (local paths or UNC shares).
    async fn copy_backup_file(&self, source: &str, destination: &str) -> Result<()>;

    async fn remove_backup_file(&self, path: &str) -> Result<()>;

    /// Remove `path` if it is an empty directory. Returns whether it was
    /// removed.
    async fn remove_directory_if_empty(&self, path: &str) -> Result<bool>;
}
