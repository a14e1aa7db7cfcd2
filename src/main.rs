//! Administrative automation for SQL Server instances.
//!
//! `dbops verify` test-restores the latest full backups onto a destination
//! instance and checks them; `dbops provision` creates databases with
//! optional custom file layouts.

// dbops/src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use dbops::cli::Cli;
use dbops::config::{AppConfig, OperationConfig, RunOptions};
use dbops::engine::{DatabaseInfo, SqlcmdEngine};
use dbops::provision::run_provision;
use dbops::verify::{run_verify, VerifyOutcome};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run_app(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

/// Per-item failures inside the workflows are reported as outcome rows or
/// warnings and never bubble up here; an Err means the invocation itself was
/// unusable (bad arguments, missing client tool).
async fn run_app(cli: Cli) -> Result<()> {
    let app_config = AppConfig::from_cli(cli).context("Invalid invocation arguments")?;
    let engine = SqlcmdEngine::new()?;
    let options = app_config.options;

    match &app_config.operation {
        OperationConfig::Verify(config) => {
            let outcomes = run_verify(&engine, config, &options).await?;
            report_outcomes(&options, &outcomes)?;
        }
        OperationConfig::Provision(config) => {
            let created = run_provision(&engine, config, &options).await?;
            report_created(&options, &created)?;
        }
    }
    Ok(())
}

fn report_outcomes(options: &RunOptions, outcomes: &[VerifyOutcome]) -> Result<()> {
    if options.json {
        println!(
            "{}",
            serde_json::to_string_pretty(outcomes).context("Failed to serialize outcomes")?
        );
        return Ok(());
    }

    for outcome in outcomes {
        println!(
            "📋 {} ({} -> {})",
            outcome.database, outcome.source_instance, outcome.destination_instance
        );
        println!("   FileExists:    {}", outcome.file_exists);
        println!("   RestoreResult: {}", outcome.restore_result);
        println!("   DbccResult:    {}", outcome.dbcc_result);
        if let Some(date) = outcome.backup_date {
            println!("   BackupDate:    {}", date.format("%Y-%m-%d %H:%M:%S"));
        }
        if let Some(size) = outcome.backup_size_mb {
            println!("   BackupSize:    {size:.0}MB");
        }
        if outcome.copy_only {
            println!("   CopyOnly:      true");
        }
        if let Some(elapsed) = outcome.restore_elapsed_secs {
            println!("   RestoreElapsed: {elapsed}s");
        }
        if let Some(elapsed) = outcome.dbcc_elapsed_secs {
            println!("   DbccElapsed:    {elapsed}s");
        }
        for file in &outcome.backup_files {
            println!("   BackupFile:    {file}");
        }
    }
    Ok(())
}

fn report_created(options: &RunOptions, created: &[DatabaseInfo]) -> Result<()> {
    if options.json {
        println!(
            "{}",
            serde_json::to_string_pretty(created).context("Failed to serialize descriptors")?
        );
        return Ok(());
    }

    for database in created {
        println!("📋 {} on {}", database.name, database.instance);
        println!("   Owner:         {}", database.owner);
        println!("   Collation:     {}", database.collation);
        println!("   RecoveryModel: {}", database.recovery_model);
        for file in &database.files {
            println!(
                "   File:          {} [{}] {:.0}MB",
                file.logical_name, file.filegroup, file.size_mb
            );
        }
    }
    Ok(())
}
