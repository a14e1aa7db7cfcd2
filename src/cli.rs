// dbops/src/cli.rs
use clap::{Parser, Subcommand, ValueEnum};

/// Administrative automation for SQL Server instances: test-restore the
/// latest backups or provision new databases.
#[derive(Debug, Parser)]
#[command(name = "dbops", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Preview every state-mutating step without executing it.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Ask for confirmation before each state-mutating step.
    #[arg(long, global = true)]
    pub confirm: bool,

    /// Suppress informational output; warnings and results still print.
    #[arg(long, global = true)]
    pub silent: bool,

    /// Emit result records as a JSON array on stdout.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Restore each database's most recent full backup onto a test
    /// destination, optionally check it with DBCC CHECKDB, and report one
    /// outcome row per database.
    Verify(VerifyArgs),
    /// Create databases, optionally with custom file and filegroup layouts.
    Provision(ProvisionArgs),
}

#[derive(Debug, clap::Args)]
pub struct VerifyArgs {
    /// Source instance(s) whose backups are verified.
    #[arg(long, required = true, num_args = 1..)]
    pub source: Vec<String>,

    /// Destination instance the test restores run on (defaults to each
    /// source).
    #[arg(long)]
    pub destination: Option<String>,

    /// Databases to verify (defaults to every database on the source).
    #[arg(long)]
    pub database: Vec<String>,

    /// Databases to leave out.
    #[arg(long)]
    pub exclude: Vec<String>,

    /// SQL login for the source instance(s); omitted means integrated
    /// authentication.
    #[arg(long, requires = "password")]
    pub username: Option<String>,

    #[arg(long, requires = "username")]
    pub password: Option<String>,

    /// SQL login for the destination (defaults to the source login).
    #[arg(long, requires = "dest_password")]
    pub dest_username: Option<String>,

    #[arg(long, requires = "dest_username")]
    pub dest_password: Option<String>,

    /// Verify the backup media only; no database is materialized.
    #[arg(long)]
    pub verify_only: bool,

    /// Skip DBCC CHECKDB against the restored copy.
    #[arg(long)]
    pub no_check: bool,

    /// Keep the restored copy instead of dropping it.
    #[arg(long)]
    pub no_drop: bool,

    /// Copy each backup file to the destination's default backup directory
    /// before restoring.
    #[arg(long)]
    pub copy_file: bool,

    /// Copy backups to this directory instead of the destination default
    /// (implies --copy-file).
    #[arg(long)]
    pub copy_path: Option<String>,

    /// Ignore copy-only backups when resolving the latest full backup.
    #[arg(long)]
    pub ignore_copy_only: bool,

    /// Skip databases whose backup reports more than this many megabytes.
    #[arg(long, value_name = "MB")]
    pub max_size: Option<u64>,

    /// Name prefix for the restored test copies.
    #[arg(long, default_value = "dbops-testrestore-")]
    pub prefix: String,

    /// Directory for restored data files (defaults to the destination's
    /// default data path).
    #[arg(long)]
    pub data_directory: Option<String>,

    /// Directory for restored log files (defaults to the destination's
    /// default log path).
    #[arg(long)]
    pub log_directory: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecoveryModelArg {
    Simple,
    Full,
    BulkLogged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DefaultFileGroupArg {
    Primary,
    Secondary,
}

#[derive(Debug, clap::Args)]
pub struct ProvisionArgs {
    /// Target instance(s).
    #[arg(long, required = true, num_args = 1..)]
    pub instance: Vec<String>,

    /// Database name(s) to create; a random name is generated when omitted.
    #[arg(long)]
    pub name: Vec<String>,

    /// SQL login for the target instance(s).
    #[arg(long, requires = "password")]
    pub username: Option<String>,

    #[arg(long, requires = "username")]
    pub password: Option<String>,

    /// Collation for the new database(s).
    #[arg(long)]
    pub collation: Option<String>,

    #[arg(long, value_enum)]
    pub recovery_model: Option<RecoveryModelArg>,

    /// Login to own the new database(s).
    #[arg(long)]
    pub owner: Option<String>,

    /// Directory for data files (defaults to the instance's default data
    /// path).
    #[arg(long)]
    pub data_path: Option<String>,

    /// Directory for the log file (defaults to the instance's default log
    /// path).
    #[arg(long)]
    pub log_path: Option<String>,

    #[arg(long, value_name = "MB")]
    pub primary_filesize: Option<u64>,

    #[arg(long, value_name = "MB")]
    pub primary_file_growth: Option<u64>,

    #[arg(long, value_name = "MB")]
    pub primary_file_max_size: Option<u64>,

    #[arg(long, value_name = "MB")]
    pub log_size: Option<u64>,

    #[arg(long, value_name = "MB")]
    pub log_growth: Option<u64>,

    #[arg(long, value_name = "MB")]
    pub log_max_size: Option<u64>,

    /// Size of each secondary data file; activates the secondary filegroup.
    #[arg(long, value_name = "MB")]
    pub secondary_filesize: Option<u64>,

    #[arg(long, value_name = "MB")]
    pub secondary_file_growth: Option<u64>,

    #[arg(long, value_name = "MB")]
    pub secondary_file_max_size: Option<u64>,

    /// Number of secondary data files (requires --secondary-filesize).
    #[arg(long, value_name = "N")]
    pub secondary_file_count: Option<u32>,

    /// Which filegroup becomes the default for new objects.
    #[arg(long, value_enum)]
    pub default_file_group: Option<DefaultFileGroupArg>,
}
