// dbops/src/engine/sqlcmd.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use which::which;

use super::types::*;
use super::Engine;
use crate::utils::paths::join_engine_path;

const COLUMN_SEPARATOR: &str = "|";

/// Finds the sqlcmd executable in the system PATH.
fn find_sqlcmd_executable() -> Result<PathBuf> {
    which("sqlcmd").context(
        "sqlcmd executable not found in PATH. Please ensure the SQL Server command-line tools are installed and in your PATH.",
    )
}

/// Bracket-quote an identifier for T-SQL, doubling closing brackets.
fn quote_name(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Quote a Unicode string literal for T-SQL, doubling single quotes.
fn quote_str(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}

/// Real engine client: every capability is expressed as T-SQL executed
/// through the engine's own `sqlcmd` client tool, plus plain file-system
/// calls for backup files reachable from the operator host.
pub struct SqlcmdEngine {
    sqlcmd_path: PathBuf,
}

impl SqlcmdEngine {
    pub fn new() -> Result<Self> {
        Ok(SqlcmdEngine {
            sqlcmd_path: find_sqlcmd_executable()?,
        })
    }

    /// Executes a batch against an instance and returns the raw rows, split
    /// on the column separator and trimmed. `-b` makes sqlcmd exit non-zero
    /// on any SQL error, `-h -1 -W` strips headers and padding.
    async fn query(&self, instance: &Instance, sql: &str) -> Result<Vec<Vec<String>>> {
        let mut command = Command::new(&self.sqlcmd_path);
        command
            .arg("-S")
            .arg(&instance.name)
            .arg("-b")
            .arg("-h")
            .arg("-1")
            .arg("-W")
            .arg("-s")
            .arg(COLUMN_SEPARATOR)
            .arg("-Q")
            .arg(sql);

        match &instance.credential {
            Some(credential) => {
                command
                    .arg("-U")
                    .arg(&credential.username)
                    .arg("-P")
                    .arg(&credential.password);
            }
            None => {
                command.arg("-E");
            }
        }

        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to execute sqlcmd against instance '{}'", instance))?;

        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "sqlcmd batch failed on instance '{}'.\nStatus: {}\nStdout: {}\nStderr: {}",
                instance,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_rows(&stdout))
    }

    /// Like `query`, but failure is folded into the report instead of an Err,
    /// so callers can surface the engine's message per item.
    async fn run_batch(&self, instance: &Instance, sql: &str) -> Result<(bool, String)> {
        match self.query(instance, sql).await {
            Ok(_) => Ok((true, "Success".to_string())),
            Err(e) => Ok((false, format!("{e:#}"))),
        }
    }
}

/// Splits sqlcmd output into trimmed cell rows, dropping blank lines and the
/// trailing "(N rows affected)" marker.
fn parse_rows(stdout: &str) -> Vec<Vec<String>> {
    stdout
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .filter(|line| !(line.starts_with('(') && line.ends_with("affected)")))
        .map(|line| {
            line.split(COLUMN_SEPARATOR)
                .map(|cell| cell.trim().to_string())
                .collect()
        })
        .collect()
}

/// Parses "15.0.2000.5"-style product versions down to major/minor.
fn parse_version(product_version: &str) -> Result<EngineVersion> {
    let re = Regex::new(r"^(\d+)\.(\d+)").expect("static version pattern");
    let caps = re
        .captures(product_version)
        .with_context(|| format!("Unrecognized engine version string: '{product_version}'"))?;
    Ok(EngineVersion {
        major: caps[1].parse().context("Engine major version is not a number")?,
        minor: caps[2].parse().context("Engine minor version is not a number")?,
    })
}

/// Parses a `CONVERT(varchar(19), ..., 120)` timestamp ("2026-08-29 13:05:00").
fn parse_engine_timestamp(value: &str) -> Result<chrono::DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("Unrecognized engine timestamp: '{value}'"))?;
    Ok(naive.and_utc())
}

fn disk_clause(files: &[String]) -> String {
    files
        .iter()
        .map(|f| format!("DISK = {}", quote_str(f)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn file_clause(spec: &DataFileSpec) -> String {
    let mut clause = format!(
        "(NAME = {}, FILENAME = {}, SIZE = {}MB",
        quote_name(&spec.logical_name),
        quote_str(&spec.physical_path),
        spec.size_mb
    );
    if let Some(growth) = spec.growth_mb {
        clause.push_str(&format!(", FILEGROWTH = {growth}MB"));
    }
    if let Some(max_size) = spec.max_size_mb {
        clause.push_str(&format!(", MAXSIZE = {max_size}MB"));
    }
    clause.push(')');
    clause
}

/// Renders the full CREATE DATABASE batch for a plan, including collation and
/// a follow-up recovery-model change when requested.
fn create_database_sql(plan: &DatabasePlan) -> String {
    let name = quote_name(&plan.name);
    let mut sql = format!("CREATE DATABASE {name}");

    if let Some(primary) = &plan.primary_file {
        sql.push_str(&format!(" ON PRIMARY {}", file_clause(primary)));
        if let Some(group) = &plan.secondary_filegroup {
            let files = group
                .files
                .iter()
                .map(file_clause)
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(", FILEGROUP {} {}", quote_name(&group.name), files));
        }
        if let Some(log) = &plan.log_file {
            sql.push_str(&format!(" LOG ON {}", file_clause(log)));
        }
    }

    if let Some(collation) = &plan.collation {
        sql.push_str(&format!(" COLLATE {collation}"));
    }
    sql.push(';');

    if let Some(model) = plan.recovery_model {
        sql.push_str(&format!(" ALTER DATABASE {name} SET RECOVERY {model};"));
    }
    sql
}

/// Renders the RESTORE batch: VERIFYONLY for dry verification, otherwise a
/// full restore with every logical file moved under the target directories
/// and a prefixed physical name.
fn restore_sql(request: &RestoreRequest, files: &[LogicalFile]) -> String {
    let disks = disk_clause(&request.backup_files);
    if request.verify_only {
        return format!("RESTORE VERIFYONLY FROM {disks};");
    }

    let mut moves = Vec::new();
    for (index, file) in files.iter().enumerate() {
        let (directory, extension) = if file.file_type == "L" {
            (request.log_directory.as_str(), "ldf")
        } else if index == 0 {
            (request.data_directory.as_str(), "mdf")
        } else {
            (request.data_directory.as_str(), "ndf")
        };
        let physical = join_engine_path(
            directory,
            &format!("{}{}.{}", request.file_prefix, file.logical_name, extension),
        );
        moves.push(format!(
            "MOVE {} TO {}",
            quote_str(&file.logical_name),
            quote_str(&physical)
        ));
    }

    format!(
        "RESTORE DATABASE {} FROM {disks} WITH {}, RECOVERY, STATS = 0;",
        quote_name(&request.database),
        moves.join(", ")
    )
}

#[async_trait]
impl Engine for SqlcmdEngine {
    async fn connect(&self, instance: &Instance) -> Result<ServerInfo> {
        let properties_sql = "SET NOCOUNT ON; \
            SELECT CAST(SERVERPROPERTY('ProductVersion') AS nvarchar(128)), \
            ISNULL(CAST(SERVERPROPERTY('InstanceDefaultDataPath') AS nvarchar(512)), N''), \
            ISNULL(CAST(SERVERPROPERTY('InstanceDefaultLogPath') AS nvarchar(512)), N'');";
        let rows = self
            .query(instance, properties_sql)
            .await
            .with_context(|| format!("Failed to connect to instance '{instance}'"))?;
        let row = rows
            .first()
            .with_context(|| format!("Instance '{instance}' returned no server properties"))?;
        if row.len() < 3 {
            anyhow::bail!("Unexpected server property row from instance '{instance}': {row:?}");
        }

        let backup_sql = "SET NOCOUNT ON; \
            DECLARE @dir nvarchar(512); \
            EXEC master.dbo.xp_instance_regread N'HKEY_LOCAL_MACHINE', \
             N'Software\\Microsoft\\MSSQLServer\\MSSQLServer', N'BackupDirectory', @dir OUTPUT; \
            SELECT ISNULL(@dir, N'');";
        let backup_rows = self.query(instance, backup_sql).await.with_context(|| {
            format!("Failed to resolve default backup directory on '{instance}'")
        })?;
        let backup_path = backup_rows
            .first()
            .and_then(|r| r.first())
            .cloned()
            .unwrap_or_default();

        let catalog_rows = self
            .query(
                instance,
                "SET NOCOUNT ON; SELECT name FROM sys.databases ORDER BY name;",
            )
            .await
            .with_context(|| format!("Failed to read database catalog on '{instance}'"))?;

        Ok(ServerInfo {
            instance: instance.name.clone(),
            version: parse_version(&row[0])?,
            data_path: row[1].clone(),
            log_path: row[2].clone(),
            backup_path,
            databases: catalog_rows
                .into_iter()
                .filter_map(|r| r.into_iter().next())
                .collect(),
        })
    }

    async fn last_full_backup(
        &self,
        instance: &Instance,
        database: &str,
        ignore_copy_only: bool,
    ) -> Result<Option<BackupRecord>> {
        let copy_only_filter = if ignore_copy_only {
            " AND b.is_copy_only = 0"
        } else {
            ""
        };
        let sql = format!(
            "SET NOCOUNT ON; \
             SELECT b.server_name, b.database_name, \
              CONVERT(varchar(19), b.backup_start_date, 120), b.is_copy_only, \
              CAST(b.backup_size / 1048576.0 AS numeric(20, 2)), mf.physical_device_name \
             FROM msdb.dbo.backupset b \
             JOIN msdb.dbo.backupmediafamily mf ON mf.media_set_id = b.media_set_id \
             WHERE b.backup_set_id = ( \
              SELECT TOP 1 backup_set_id FROM msdb.dbo.backupset b \
              WHERE b.database_name = {} AND b.type = 'D'{} \
              ORDER BY b.backup_start_date DESC);",
            quote_str(database),
            copy_only_filter
        );
        let rows = self.query(instance, &sql).await.with_context(|| {
            format!("Failed to query backup history for '{database}' on '{instance}'")
        })?;

        let Some(first) = rows.first() else {
            return Ok(None);
        };
        if first.len() < 6 {
            anyhow::bail!("Unexpected backup history row for '{database}': {first:?}");
        }

        Ok(Some(BackupRecord {
            server: first[0].clone(),
            database: first[1].clone(),
            start_time: parse_engine_timestamp(&first[2])?,
            copy_only: first[3] == "1",
            total_size_mb: first[4]
                .parse()
                .with_context(|| format!("Backup size is not numeric: '{}'", first[4]))?,
            paths: rows.iter().filter_map(|r| r.get(5).cloned()).collect(),
        }))
    }

    async fn read_backup_header(
        &self,
        instance: &Instance,
        files: &[String],
    ) -> Result<BackupHeader> {
        // FILELISTONLY column order is stable on supported engines:
        // LogicalName | PhysicalName | Type | FileGroupName | Size | ...
        let sql = format!("RESTORE FILELISTONLY FROM {};", disk_clause(files));
        let rows = self
            .query(instance, &sql)
            .await
            .with_context(|| format!("Failed to read backup header from {files:?}"))?;

        let mut size_bytes: f64 = 0.0;
        let mut logical_files = Vec::new();
        for row in &rows {
            if row.len() < 5 {
                anyhow::bail!("Unexpected backup file-list row: {row:?}");
            }
            size_bytes += row[4]
                .parse::<f64>()
                .with_context(|| format!("Backup file size is not numeric: '{}'", row[4]))?;
            logical_files.push(LogicalFile {
                logical_name: row[0].clone(),
                file_type: row[2].clone(),
            });
        }
        Ok(BackupHeader {
            size_mb: size_bytes / (1024.0 * 1024.0),
            files: logical_files,
        })
    }

    async fn file_exists(&self, instance: &Instance, path: &str) -> Result<bool> {
        let sql = format!("EXEC master.dbo.xp_fileexist {};", quote_str(path));
        let rows = self
            .query(instance, &sql)
            .await
            .with_context(|| format!("Failed to probe path '{path}' from '{instance}'"))?;
        // Row layout: File Exists | File is a Directory | Parent Directory Exists
        let row = rows
            .first()
            .with_context(|| format!("Path probe for '{path}' returned no rows"))?;
        Ok(row.first().map(String::as_str) == Some("1")
            || row.get(1).map(String::as_str) == Some("1"))
    }

    async fn database_exists(&self, instance: &Instance, name: &str) -> Result<bool> {
        let sql = format!(
            "SET NOCOUNT ON; SELECT COUNT(*) FROM sys.databases WHERE name = {};",
            quote_str(name)
        );
        let rows = self.query(instance, &sql).await.with_context(|| {
            format!("Failed to check existence of database '{name}' on '{instance}'")
        })?;
        Ok(rows.first().and_then(|r| r.first()).map(String::as_str) == Some("1"))
    }

    async fn create_directory(&self, instance: &Instance, path: &str) -> Result<()> {
        let sql = format!("EXEC master.dbo.xp_create_subdir {};", quote_str(path));
        self.query(instance, &sql)
            .await
            .with_context(|| format!("Failed to create directory '{path}' on '{instance}'"))?;
        Ok(())
    }

    async fn restore_database(
        &self,
        instance: &Instance,
        request: &RestoreRequest,
    ) -> Result<RestoreReport> {
        let files = if request.verify_only {
            Vec::new()
        } else {
            self.read_backup_header(instance, &request.backup_files)
                .await?
                .files
        };
        let (success, message) = self
            .run_batch(instance, &restore_sql(request, &files))
            .await?;
        Ok(RestoreReport { success, message })
    }

    async fn run_checkdb(&self, instance: &Instance, database: &str) -> Result<CheckReport> {
        let sql = format!(
            "DBCC CHECKDB ({}) WITH NO_INFOMSGS, ALL_ERRORMSGS;",
            quote_name(database)
        );
        let (success, message) = self.run_batch(instance, &sql).await?;
        Ok(CheckReport { success, message })
    }

    async fn drop_database(&self, instance: &Instance, database: &str) -> Result<()> {
        let name = quote_name(database);
        let sql = format!(
            "ALTER DATABASE {name} SET SINGLE_USER WITH ROLLBACK IMMEDIATE; DROP DATABASE {name};"
        );
        self.query(instance, &sql)
            .await
            .with_context(|| format!("Failed to drop database '{database}' on '{instance}'"))?;
        Ok(())
    }

    async fn create_database(&self, instance: &Instance, plan: &DatabasePlan) -> Result<()> {
        self.query(instance, &create_database_sql(plan))
            .await
            .with_context(|| format!("Failed to create database '{}' on '{instance}'", plan.name))?;
        Ok(())
    }

    async fn set_owner(&self, instance: &Instance, database: &str, owner: &str) -> Result<()> {
        let sql = format!(
            "ALTER AUTHORIZATION ON DATABASE::{} TO {};",
            quote_name(database),
            quote_name(owner)
        );
        self.query(instance, &sql)
            .await
            .with_context(|| format!("Failed to set owner of '{database}' to '{owner}'"))?;
        Ok(())
    }

    async fn set_default_filegroup(
        &self,
        instance: &Instance,
        database: &str,
        filegroup: &str,
    ) -> Result<()> {
        let sql = format!(
            "ALTER DATABASE {} MODIFY FILEGROUP {} DEFAULT;",
            quote_name(database),
            quote_name(filegroup)
        );
        self.query(instance, &sql).await.with_context(|| {
            format!("Failed to set default filegroup '{filegroup}' on '{database}'")
        })?;
        Ok(())
    }

    async fn database_info(&self, instance: &Instance, name: &str) -> Result<DatabaseInfo> {
        let header_sql = format!(
            "SET NOCOUNT ON; \
             SELECT d.name, ISNULL(SUSER_SNAME(d.owner_sid), N''), \
              ISNULL(d.collation_name, N''), d.recovery_model_desc \
             FROM sys.databases d WHERE d.name = {};",
            quote_str(name)
        );
        let rows = self
            .query(instance, &header_sql)
            .await
            .with_context(|| format!("Failed to re-query database '{name}' on '{instance}'"))?;
        let row = rows
            .first()
            .with_context(|| format!("Database '{name}' not found on '{instance}' after creation"))?;
        if row.len() < 4 {
            anyhow::bail!("Unexpected database descriptor row for '{name}': {row:?}");
        }

        let quoted_db = quote_name(name);
        let files_sql = format!(
            "SET NOCOUNT ON; \
             SELECT f.name, ISNULL(fg.name, N'LOG'), CAST(f.size / 128.0 AS numeric(20, 2)) \
             FROM {quoted_db}.sys.database_files f \
             LEFT JOIN {quoted_db}.sys.filegroups fg ON f.data_space_id = fg.data_space_id \
             ORDER BY f.file_id;"
        );
        let file_rows = self
            .query(instance, &files_sql)
            .await
            .with_context(|| format!("Failed to read file layout of '{name}' on '{instance}'"))?;

        let mut files = Vec::new();
        for file_row in &file_rows {
            if file_row.len() < 3 {
                anyhow::bail!("Unexpected database file row for '{name}': {file_row:?}");
            }
            files.push(DatabaseFileInfo {
                logical_name: file_row[0].clone(),
                filegroup: file_row[1].clone(),
                size_mb: file_row[2]
                    .parse()
                    .with_context(|| format!("File size is not numeric: '{}'", file_row[2]))?,
            });
        }

        Ok(DatabaseInfo {
            instance: instance.name.clone(),
            name: row[0].clone(),
            owner: row[1].clone(),
            collation: row[2].clone(),
            recovery_model: row[3].clone(),
            files,
        })
    }

    async fn template_layout(&self, instance: &Instance) -> Result<TemplateLayout> {
        let sql = "SET NOCOUNT ON; \
            SELECT type, CAST(CEILING(size / 128.0) AS bigint) \
            FROM model.sys.database_files ORDER BY file_id;";
        let rows = self
            .query(instance, sql)
            .await
            .with_context(|| format!("Failed to read template database layout on '{instance}'"))?;

        let mut layout = TemplateLayout {
            primary_size_mb: 0,
            log_size_mb: 0,
        };
        for row in &rows {
            if row.len() < 2 {
                anyhow::bail!("Unexpected template file row: {row:?}");
            }
            let size: u64 = row[1]
                .parse()
                .with_context(|| format!("Template file size is not numeric: '{}'", row[1]))?;
            match row[0].as_str() {
                "0" if layout.primary_size_mb == 0 => layout.primary_size_mb = size,
                "1" if layout.log_size_mb == 0 => layout.log_size_mb = size,
                _ => {}
            }
        }
        Ok(layout)
    }

    async fn copy_backup_file(&self, source: &str, destination: &str) -> Result<()> {
        let source = source.to_string();
        let destination = destination.to_string();
        tokio::task::spawn_blocking(move || -> Result<()> {
            if let Some(parent) = Path::new(&destination).parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create copy directory '{}'", parent.display())
                })?;
            }
            std::fs::copy(&source, &destination)
                .with_context(|| format!("Failed to copy '{source}' to '{destination}'"))?;
            Ok(())
        })
        .await
        .context("Backup copy task panicked")?
    }

    async fn remove_backup_file(&self, path: &str) -> Result<()> {
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("Failed to delete copied backup file '{path}'"))
    }

    async fn remove_directory_if_empty(&self, path: &str) -> Result<bool> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .with_context(|| format!("Failed to inspect directory '{path}'"))?;
        if entries
            .next_entry()
            .await
            .with_context(|| format!("Failed to inspect directory '{path}'"))?
            .is_some()
        {
            return Ok(false);
        }
        tokio::fs::remove_dir(path)
            .await
            .with_context(|| format!("Failed to remove directory '{path}'"))?;
        Ok(true)
    }
}
