// dbops/src/provision/logic.rs
use anyhow::{Context, Result};

use crate::config::{ProvisionConfig, RunOptions};
use crate::engine::{DatabaseInfo, Engine, Instance, TemplateLayout};
use crate::utils::{confirm_step, Reporter};

use super::layout::{build_plan, default_filegroup_name, random_database_name};

/// Oldest engine major version that supports custom file/filegroup layouts
/// through this tool.
const MIN_ADVANCED_LAYOUT_MAJOR: u32 = 9;

/// Runs the provisioning workflow and returns the descriptor of every
/// database that was actually created. Instance-level failures (connectivity,
/// version, directories) skip that instance; name conflicts and creation
/// failures skip one database.
pub async fn run_provision(
    engine: &dyn Engine,
    config: &ProvisionConfig,
    options: &RunOptions,
) -> Result<Vec<DatabaseInfo>> {
    let reporter = Reporter::new(options.silent);
    let mut created = Vec::new();

    for instance in &config.instances {
        if let Err(e) =
            provision_instance(engine, config, options, &reporter, instance, &mut created).await
        {
            reporter.warn(format!("Skipping instance '{instance}': {e:#}"));
        }
    }

    Ok(created)
}

async fn provision_instance(
    engine: &dyn Engine,
    config: &ProvisionConfig,
    options: &RunOptions,
    reporter: &Reporter,
    instance: &Instance,
    created: &mut Vec<DatabaseInfo>,
) -> Result<()> {
    let info = engine
        .connect(instance)
        .await
        .with_context(|| format!("Failed to connect to instance '{instance}'"))?;

    let advanced = config.layout.is_advanced();
    if advanced && info.version.major < MIN_ADVANCED_LAYOUT_MAJOR {
        anyhow::bail!(
            "Instance '{instance}' (v{}) does not support custom file layouts; remove the file sizing options or target a newer engine.",
            info.version
        );
    }

    let data_path = match &config.layout.data_path {
        Some(path) => path.clone(),
        None => info.data_path.clone(),
    };
    let log_path = match &config.layout.log_path {
        Some(path) => path.clone(),
        None => info.log_path.clone(),
    };

    let template = if advanced {
        for directory in [&data_path, &log_path] {
            if !engine.file_exists(instance, directory).await? {
                engine
                    .create_directory(instance, directory)
                    .await
                    .with_context(|| {
                        format!("Failed to create directory '{directory}' on '{instance}'")
                    })?;
            }
        }
        engine
            .template_layout(instance)
            .await
            .with_context(|| format!("Failed to read template layout on '{instance}'"))?
    } else {
        TemplateLayout {
            primary_size_mb: 0,
            log_size_mb: 0,
        }
    };

    let names = if config.names.is_empty() {
        vec![random_database_name()]
    } else {
        config.names.clone()
    };

    for name in &names {
        match provision_database(
            engine, config, options, reporter, instance, &data_path, &log_path, &template, name,
        )
        .await
        {
            Ok(Some(info)) => {
                reporter.info(format!("✅ Created database '{name}' on '{instance}'."));
                created.push(info);
            }
            Ok(None) => {}
            Err(e) => reporter.warn(format!(
                "[{instance}] Failed to create database '{name}': {e:#}"
            )),
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn provision_database(
    engine: &dyn Engine,
    config: &ProvisionConfig,
    options: &RunOptions,
    reporter: &Reporter,
    instance: &Instance,
    data_path: &str,
    log_path: &str,
    template: &TemplateLayout,
    name: &str,
) -> Result<Option<DatabaseInfo>> {
    if engine.database_exists(instance, name).await? {
        anyhow::bail!("A database named '{name}' already exists on '{instance}'.");
    }

    let plan = build_plan(name, config, data_path, log_path, template);
    if !confirm_step(options, &format!("create database '{name}' on '{instance}'"))? {
        return Ok(None);
    }

    engine.create_database(instance, &plan).await?;

    // The database exists from here on; owner and default-filegroup problems
    // are reported, not treated as a failed creation.
    if let Some(owner) = &config.owner {
        if let Err(e) = engine.set_owner(instance, name, owner).await {
            reporter.warn(format!(
                "[{instance}] Could not set owner of '{name}' to '{owner}': {e:#}"
            ));
        }
    }
    if let Some(choice) = config.layout.default_filegroup {
        let filegroup = default_filegroup_name(name, choice);
        if let Err(e) = engine.set_default_filegroup(instance, name, &filegroup).await {
            reporter.warn(format!(
                "[{instance}] Could not set default filegroup of '{name}' to '{filegroup}': {e:#}"
            ));
        }
    }

    let info = engine
        .database_info(instance, name)
        .await
        .with_context(|| format!("Failed to re-query created database '{name}'"))?;
    Ok(Some(info))
}
