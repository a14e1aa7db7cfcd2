// dbops/src/config/mod.rs
use anyhow::Result;

use crate::cli::{
    Cli, Command, DefaultFileGroupArg, ProvisionArgs, RecoveryModelArg, VerifyArgs,
};
use crate::engine::{Credential, Instance, RecoveryModel};

/// Cross-cutting invocation switches shared by both workflows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub confirm: bool,
    pub silent: bool,
    pub json: bool,
}

/// Validated configuration for the backup-verification workflow.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub sources: Vec<Instance>,
    /// Test restores land here; `None` restores back onto each source.
    pub destination: Option<Instance>,
    /// Empty means every database in the source catalog.
    pub databases: Vec<String>,
    pub excludes: Vec<String>,
    pub prefix: String,
    pub verify_only: bool,
    pub no_check: bool,
    pub no_drop: bool,
    pub copy_file: bool,
    pub copy_path: Option<String>,
    pub ignore_copy_only: bool,
    pub max_size_mb: Option<u64>,
    pub data_directory: Option<String>,
    pub log_directory: Option<String>,
}

/// File/filegroup layout options for provisioning. All-`None` means the
/// engine creates the database entirely from its own defaults.
#[derive(Debug, Clone, Default)]
pub struct FileLayoutConfig {
    pub data_path: Option<String>,
    pub log_path: Option<String>,
    pub primary_filesize_mb: Option<u64>,
    pub primary_file_growth_mb: Option<u64>,
    pub primary_file_max_size_mb: Option<u64>,
    pub log_size_mb: Option<u64>,
    pub log_growth_mb: Option<u64>,
    pub log_max_size_mb: Option<u64>,
    pub secondary_filesize_mb: Option<u64>,
    pub secondary_file_growth_mb: Option<u64>,
    pub secondary_file_max_size_mb: Option<u64>,
    pub secondary_file_count: Option<u32>,
    pub default_filegroup: Option<DefaultFileGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultFileGroup {
    Primary,
    Secondary,
}

impl FileLayoutConfig {
    /// Any advanced option at all switches provisioning from engine defaults
    /// to an explicit file/filegroup plan.
    pub fn is_advanced(&self) -> bool {
        self.data_path.is_some()
            || self.log_path.is_some()
            || self.primary_filesize_mb.is_some()
            || self.primary_file_growth_mb.is_some()
            || self.primary_file_max_size_mb.is_some()
            || self.log_size_mb.is_some()
            || self.log_growth_mb.is_some()
            || self.log_max_size_mb.is_some()
            || self.wants_secondary()
            || self.default_filegroup.is_some()
    }

    pub fn wants_secondary(&self) -> bool {
        self.secondary_filesize_mb.is_some()
            || self.secondary_file_growth_mb.is_some()
            || self.secondary_file_max_size_mb.is_some()
            || self.secondary_file_count.is_some()
    }
}

/// Validated configuration for the database-provisioning workflow.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub instances: Vec<Instance>,
    /// Empty means one database with a generated random name per instance.
    pub names: Vec<String>,
    pub collation: Option<String>,
    pub recovery_model: Option<RecoveryModel>,
    pub owner: Option<String>,
    pub layout: FileLayoutConfig,
}

#[derive(Debug, Clone)]
pub enum OperationConfig {
    Verify(VerifyConfig),
    Provision(ProvisionConfig),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub options: RunOptions,
    pub operation: OperationConfig,
}

impl AppConfig {
    /// Translates and validates the parsed CLI into internal configuration.
    /// Every rejection here happens before any instance is contacted.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let options = RunOptions {
            dry_run: cli.dry_run,
            confirm: cli.confirm,
            silent: cli.silent,
            json: cli.json,
        };
        let operation = match cli.command {
            Command::Verify(args) => OperationConfig::Verify(verify_config_from_args(args)?),
            Command::Provision(args) => {
                OperationConfig::Provision(provision_config_from_args(args)?)
            }
        };
        Ok(AppConfig { options, operation })
    }
}

fn credential_from(username: Option<String>, password: Option<String>) -> Option<Credential> {
    match (username, password) {
        (Some(username), Some(password)) => Some(Credential { username, password }),
        _ => None,
    }
}

fn verify_config_from_args(args: VerifyArgs) -> Result<VerifyConfig> {
    if args.prefix.trim().is_empty() {
        anyhow::bail!("--prefix cannot be empty: the restored test copy needs a distinct name.");
    }
    if args.max_size == Some(0) {
        anyhow::bail!("--max-size must be greater than zero.");
    }
    if let Some(db) = args.database.iter().find(|db| args.exclude.contains(db)) {
        anyhow::bail!("Database '{db}' appears in both --database and --exclude.");
    }

    let source_credential = credential_from(args.username, args.password);
    let destination_credential =
        credential_from(args.dest_username, args.dest_password).or_else(|| source_credential.clone());
    let sources = args
        .source
        .into_iter()
        .map(|name| Instance::new(name, source_credential.clone()))
        .collect();
    let destination = args
        .destination
        .map(|name| Instance::new(name, destination_credential));

    Ok(VerifyConfig {
        sources,
        destination,
        databases: args.database,
        excludes: args.exclude,
        prefix: args.prefix,
        verify_only: args.verify_only,
        no_check: args.no_check,
        no_drop: args.no_drop,
        // An explicit copy directory implies the copy itself.
        copy_file: args.copy_file || args.copy_path.is_some(),
        copy_path: args.copy_path,
        ignore_copy_only: args.ignore_copy_only,
        max_size_mb: args.max_size,
        data_directory: args.data_directory,
        log_directory: args.log_directory,
    })
}

fn provision_config_from_args(args: ProvisionArgs) -> Result<ProvisionConfig> {
    let layout = FileLayoutConfig {
        data_path: args.data_path,
        log_path: args.log_path,
        primary_filesize_mb: args.primary_filesize,
        primary_file_growth_mb: args.primary_file_growth,
        primary_file_max_size_mb: args.primary_file_max_size,
        log_size_mb: args.log_size,
        log_growth_mb: args.log_growth,
        log_max_size_mb: args.log_max_size,
        secondary_filesize_mb: args.secondary_filesize,
        secondary_file_growth_mb: args.secondary_file_growth,
        secondary_file_max_size_mb: args.secondary_file_max_size,
        secondary_file_count: args.secondary_file_count,
        default_filegroup: args.default_file_group.map(|fg| match fg {
            DefaultFileGroupArg::Primary => DefaultFileGroup::Primary,
            DefaultFileGroupArg::Secondary => DefaultFileGroup::Secondary,
        }),
    };

    if layout.wants_secondary() && layout.secondary_filesize_mb.is_none() {
        anyhow::bail!("Secondary data files require --secondary-filesize.");
    }
    if layout.secondary_file_count == Some(0) {
        anyhow::bail!("--secondary-file-count must be at least 1.");
    }
    if layout.default_filegroup == Some(DefaultFileGroup::Secondary) && !layout.wants_secondary() {
        anyhow::bail!(
            "--default-file-group secondary requires secondary data files (--secondary-filesize)."
        );
    }
    if let Some(name) = args.name.iter().find(|name| name.trim().is_empty()) {
        anyhow::bail!("Database name '{name}' is empty.");
    }

    let credential = credential_from(args.username, args.password);
    Ok(ProvisionConfig {
        instances: args
            .instance
            .into_iter()
            .map(|name| Instance::new(name, credential.clone()))
            .collect(),
        names: args.name,
        collation: args.collation,
        recovery_model: args.recovery_model.map(|model| match model {
            RecoveryModelArg::Simple => RecoveryModel::Simple,
            RecoveryModelArg::Full => RecoveryModel::Full,
            RecoveryModelArg::BulkLogged => RecoveryModel::BulkLogged,
        }),
        owner: args.owner,
        layout,
    })
}
