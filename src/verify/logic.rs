// dbops/src/verify/logic.rs
use anyhow::{Context, Result};
use chrono::Utc;

use crate::config::{RunOptions, VerifyConfig};
use crate::engine::{BackupRecord, Engine, Instance, RestoreRequest, ServerInfo};
use crate::utils::paths::{engine_file_name, is_network_path, join_engine_path};
use crate::utils::{confirm_step, Reporter};

use super::outcome::{VerifyOutcome, RESULT_NOT_SHARED, RESULT_SKIPPED, RESULT_SUCCESS};
use super::plan::{resolve_restore_plan, RestorePlan};

/// Runs the backup-verification workflow over every source instance and
/// returns one outcome per processed database. Connection and version
/// failures skip the instance pair with a warning; everything narrower skips
/// a single database.
pub async fn run_verify(
    engine: &dyn Engine,
    config: &VerifyConfig,
    options: &RunOptions,
) -> Result<Vec<VerifyOutcome>> {
    let reporter = Reporter::new(options.silent);
    let mut outcomes = Vec::new();

    for source in &config.sources {
        let destination = config.destination.clone().unwrap_or_else(|| source.clone());
        if let Err(e) = verify_instance_pair(
            engine,
            config,
            options,
            &reporter,
            source,
            &destination,
            &mut outcomes,
        )
        .await
        {
            reporter.warn(format!(
                "Skipping instance '{source}' -> '{destination}': {e:#}"
            ));
        }
    }

    Ok(outcomes)
}

async fn verify_instance_pair(
    engine: &dyn Engine,
    config: &VerifyConfig,
    options: &RunOptions,
    reporter: &Reporter,
    source: &Instance,
    destination: &Instance,
    outcomes: &mut Vec<VerifyOutcome>,
) -> Result<()> {
    let source_info = engine
        .connect(source)
        .await
        .with_context(|| format!("Failed to connect to source instance '{source}'"))?;
    let destination_info = engine
        .connect(destination)
        .await
        .with_context(|| format!("Failed to connect to destination instance '{destination}'"))?;

    // Backups never restore onto an older engine.
    if destination_info.version < source_info.version {
        anyhow::bail!(
            "Destination '{destination}' (v{}) is older than source '{source}' (v{}); backups are not backward-compatible.",
            destination_info.version,
            source_info.version
        );
    }

    let data_directory = match &config.data_directory {
        Some(dir) => dir.clone(),
        None => destination_info.data_path.clone(),
    };
    let log_directory = match &config.log_directory {
        Some(dir) => dir.clone(),
        None => destination_info.log_path.clone(),
    };
    for directory in [&data_directory, &log_directory] {
        if !engine.file_exists(destination, directory).await? {
            anyhow::bail!(
                "Restore target directory '{directory}' is not reachable from '{destination}'."
            );
        }
    }

    let databases: Vec<String> = if config.databases.is_empty() {
        source_info.databases.clone()
    } else {
        config.databases.clone()
    };
    let databases = databases
        .into_iter()
        .filter(|db| !config.excludes.iter().any(|ex| ex.eq_ignore_ascii_case(db)))
        .collect::<Vec<_>>();

    reporter.info(format!(
        "🚀 Verifying {} database(s) from '{source}' on '{destination}'...",
        databases.len()
    ));

    for database in &databases {
        match verify_one_database(
            engine,
            config,
            options,
            reporter,
            source,
            destination,
            &destination_info,
            &data_directory,
            &log_directory,
            database,
        )
        .await
        {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => reporter.warn(format!(
                "[{source}] Failed to verify database '{database}': {e:#}"
            )),
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn verify_one_database(
    engine: &dyn Engine,
    config: &VerifyConfig,
    options: &RunOptions,
    reporter: &Reporter,
    source: &Instance,
    destination: &Instance,
    destination_info: &ServerInfo,
    data_directory: &str,
    log_directory: &str,
    database: &str,
) -> Result<VerifyOutcome> {
    let mut outcome = VerifyOutcome::new(&source.name, &destination.name, database);
    let cross_instance = !destination.name.eq_ignore_ascii_case(&source.name);

    // tempdb is rebuilt on every engine start; it has no backup worth testing.
    if database.eq_ignore_ascii_case("tempdb") {
        reporter.info(format!("[{source}] Skipping system database 'tempdb'."));
        return Ok(outcome);
    }

    let mut backup = engine
        .last_full_backup(source, database, config.ignore_copy_only)
        .await
        .with_context(|| format!("Failed to query backup history for '{database}'"))?;

    // Copied files to delete afterwards, plus their container directory.
    let mut copied_files: Vec<String> = Vec::new();
    let mut copy_directory: Option<String> = None;

    if config.copy_file {
        if let Some(record) = backup.as_mut() {
            if record.paths.iter().all(|path| is_network_path(path)) {
                reporter.info(format!(
                    "[{source}] Backup for '{database}' is already on a network share; copy skipped."
                ));
            } else {
                let directory = match &config.copy_path {
                    Some(path) => path.clone(),
                    None => join_engine_path(
                        &destination_info.backup_path,
                        config.prefix.trim_end_matches(['-', '_']),
                    ),
                };
                if confirm_step(
                    options,
                    &format!(
                        "copy {} backup file(s) for '{database}' to '{directory}'",
                        record.paths.len()
                    ),
                )? {
                    copy_backup_files(engine, record, &directory).await?;
                    copied_files = record.paths.clone();
                    copy_directory = Some(directory);
                }
            }
        }
    }

    let plan = resolve_restore_plan(
        engine,
        destination,
        backup.as_ref(),
        cross_instance,
        config.max_size_mb,
    )
    .await?;

    if let Some(record) = &backup {
        outcome.backup_date = Some(record.start_time);
        outcome.backup_files = record.paths.clone();
        outcome.backup_size_mb = Some(record.total_size_mb);
        outcome.copy_only = record.copy_only;
    }

    match plan {
        RestorePlan::NotFound => {
            reporter.info(format!("[{source}] No full backup found for '{database}'."));
            return Ok(outcome);
        }
        RestorePlan::NotShared => {
            outcome.file_exists = true;
            outcome.restore_result = RESULT_NOT_SHARED.to_string();
            reporter.warn(format!(
                "[{source}] Backup for '{database}' is not on a shared location reachable from '{destination}'."
            ));
            cleanup_copies(engine, reporter, &copied_files, &copy_directory).await;
            return Ok(outcome);
        }
        RestorePlan::FileNotSeen(path) => {
            reporter.warn(format!(
                "[{destination}] Backup file '{path}' for '{database}' does not exist from the destination's perspective."
            ));
            cleanup_copies(engine, reporter, &copied_files, &copy_directory).await;
            return Ok(outcome);
        }
        RestorePlan::TooLarge { size_mb, limit_mb } => {
            outcome.file_exists = true;
            outcome.restore_result = format!(
                "The backup size for {database} ({size_mb:.0}MB) exceeds the specified maximum size ({limit_mb}MB)."
            );
            reporter.info(format!("[{source}] {}", outcome.restore_result));
            cleanup_copies(engine, reporter, &copied_files, &copy_directory).await;
            return Ok(outcome);
        }
        RestorePlan::Ready { header } => reporter.info(format!(
            "[{source}] Backup media for '{database}' reports {:.0}MB.",
            header.size_mb
        )),
    }
    outcome.file_exists = true;

    let Some(record) = backup.as_ref() else {
        return Ok(outcome);
    };
    let target = format!("{}{}", config.prefix, database);

    if engine.database_exists(destination, &target).await? {
        outcome.restore_result = format!(
            "The target database name '{target}' already exists on '{destination}'."
        );
        reporter.warn(format!("[{destination}] {}", outcome.restore_result));
        cleanup_copies(engine, reporter, &copied_files, &copy_directory).await;
        return Ok(outcome);
    }

    let step = if config.verify_only {
        format!("verify backup media of '{database}' against '{destination}'")
    } else {
        format!("restore '{database}' as '{target}' on '{destination}'")
    };
    if !confirm_step(options, &step)? {
        cleanup_copies(engine, reporter, &copied_files, &copy_directory).await;
        return Ok(outcome);
    }

    let request = RestoreRequest {
        database: target.clone(),
        backup_files: record.paths.clone(),
        data_directory: data_directory.to_string(),
        log_directory: log_directory.to_string(),
        file_prefix: config.prefix.clone(),
        verify_only: config.verify_only,
    };

    let restore_start = Utc::now();
    let restore_success = match engine.restore_database(destination, &request).await {
        Ok(report) => {
            outcome.restore_result = if report.success {
                RESULT_SUCCESS.to_string()
            } else {
                report.message
            };
            report.success
        }
        Err(e) => {
            outcome.restore_result = format!("Restore failed: {e:#}");
            reporter.warn(format!("[{destination}] {}", outcome.restore_result));
            false
        }
    };
    let restore_end = Utc::now();
    outcome.restore_start = Some(restore_start);
    outcome.restore_end = Some(restore_end);
    outcome.restore_elapsed_secs = Some((restore_end - restore_start).num_seconds());

    // DBCC CHECKDB is never run for a verify-only pass, when suppressed, or
    // when the restore did not succeed. Checking a restored master online is
    // unsafe and is skipped categorically.
    if config.verify_only || config.no_check {
        outcome.dbcc_result = RESULT_SKIPPED.to_string();
    } else if database.eq_ignore_ascii_case("master") {
        outcome.dbcc_result =
            format!("DBCC CHECKDB skipped for restored master ({target}) database");
        reporter.info(format!("[{destination}] {}", outcome.dbcc_result));
    } else if restore_success {
        let dbcc_start = Utc::now();
        match engine.run_checkdb(destination, &target).await {
            Ok(report) => {
                outcome.dbcc_result = if report.success {
                    RESULT_SUCCESS.to_string()
                } else {
                    report.message
                };
            }
            Err(e) => {
                outcome.dbcc_result = format!("DBCC CHECKDB failed: {e:#}");
                reporter.warn(format!("[{destination}] {}", outcome.dbcc_result));
            }
        }
        let dbcc_end = Utc::now();
        outcome.dbcc_start = Some(dbcc_start);
        outcome.dbcc_end = Some(dbcc_end);
        outcome.dbcc_elapsed_secs = Some((dbcc_end - dbcc_start).num_seconds());
    }

    if !config.no_drop && !config.verify_only {
        drop_test_database(engine, options, reporter, destination, &target).await;
    }

    cleanup_copies(engine, reporter, &copied_files, &copy_directory).await;
    Ok(outcome)
}

/// Copies every stripe of the backup into `directory` and rewrites the
/// record's paths to point at the copies.
async fn copy_backup_files(
    engine: &dyn Engine,
    record: &mut BackupRecord,
    directory: &str,
) -> Result<()> {
    let mut relocated = Vec::with_capacity(record.paths.len());
    for path in &record.paths {
        let destination_path = join_engine_path(directory, engine_file_name(path));
        engine.copy_backup_file(path, &destination_path).await?;
        relocated.push(destination_path);
    }
    record.paths = relocated;
    Ok(())
}

/// Drops the restored test copy. A failed drop (or existence probe) is a
/// warning, never a workflow failure.
async fn drop_test_database(
    engine: &dyn Engine,
    options: &RunOptions,
    reporter: &Reporter,
    destination: &Instance,
    target: &str,
) {
    match engine.database_exists(destination, target).await {
        Ok(true) => {}
        Ok(false) => return,
        Err(e) => {
            reporter.warn(format!(
                "[{destination}] Could not check for test database '{target}' before dropping: {e:#}"
            ));
            return;
        }
    }

    match confirm_step(options, &format!("drop test database '{target}' on '{destination}'")) {
        Ok(true) => {
            if let Err(e) = engine.drop_database(destination, target).await {
                reporter.warn(format!(
                    "[{destination}] Failed to drop test database '{target}': {e:#}"
                ));
            }
        }
        Ok(false) => {}
        Err(e) => reporter.warn(format!("Confirmation failed for dropping '{target}': {e:#}")),
    }
}

/// Best-effort removal of relocated backup copies and, when it ends up
/// empty, their container directory.
async fn cleanup_copies(
    engine: &dyn Engine,
    reporter: &Reporter,
    copied_files: &[String],
    copy_directory: &Option<String>,
) {
    for file in copied_files {
        if let Err(e) = engine.remove_backup_file(file).await {
            reporter.warn(format!("Failed to delete copied backup '{file}': {e:#}"));
        }
    }
    if let Some(directory) = copy_directory {
        if let Err(e) = engine.remove_directory_if_empty(directory).await {
            reporter.warn(format!(
                "Failed to remove copy directory '{directory}': {e:#}"
            ));
        }
    }
}
