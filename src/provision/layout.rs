// dbops/src/provision/layout.rs
use uuid::Uuid;

use crate::config::{DefaultFileGroup, ProvisionConfig};
use crate::engine::{DataFileSpec, DatabasePlan, FileGroupSpec, TemplateLayout};
use crate::utils::paths::join_engine_path;

/// Suffix of the secondary filegroup: `<database>_MainData`, with files
/// `<filegroup>_1`, `<filegroup>_2`, ...
const SECONDARY_SUFFIX: &str = "MainData";

/// A database is cloned from the template ("model") database and can never be
/// created smaller than it, so requested sizes are floored at the template's.
pub fn clamp_to_template(requested_mb: Option<u64>, template_mb: u64) -> u64 {
    requested_mb.unwrap_or(template_mb).max(template_mb)
}

pub fn secondary_filegroup_name(database: &str) -> String {
    format!("{database}_{SECONDARY_SUFFIX}")
}

/// Name used when the caller did not supply one.
pub fn random_database_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("random-{}", &id[..8])
}

/// Resolves the filegroup that should become the default for new objects.
pub fn default_filegroup_name(database: &str, choice: DefaultFileGroup) -> String {
    match choice {
        DefaultFileGroup::Primary => "PRIMARY".to_string(),
        DefaultFileGroup::Secondary => secondary_filegroup_name(database),
    }
}

/// Builds the creation plan for one database. Without advanced layout options
/// the file specs stay `None` and the engine applies its own defaults.
pub fn build_plan(
    name: &str,
    config: &ProvisionConfig,
    data_path: &str,
    log_path: &str,
    template: &TemplateLayout,
) -> DatabasePlan {
    let layout = &config.layout;
    let mut plan = DatabasePlan {
        name: name.to_string(),
        collation: config.collation.clone(),
        recovery_model: config.recovery_model,
        primary_file: None,
        log_file: None,
        secondary_filegroup: None,
    };
    if !layout.is_advanced() {
        return plan;
    }

    let primary_size = clamp_to_template(layout.primary_filesize_mb, template.primary_size_mb);
    plan.primary_file = Some(DataFileSpec {
        logical_name: name.to_string(),
        physical_path: join_engine_path(data_path, &format!("{name}.mdf")),
        size_mb: primary_size,
        growth_mb: layout.primary_file_growth_mb,
        max_size_mb: layout
            .primary_file_max_size_mb
            .map(|max| max.max(primary_size)),
    });

    let log_size = clamp_to_template(layout.log_size_mb, template.log_size_mb);
    plan.log_file = Some(DataFileSpec {
        logical_name: format!("{name}_log"),
        physical_path: join_engine_path(log_path, &format!("{name}_log.ldf")),
        size_mb: log_size,
        growth_mb: layout.log_growth_mb,
        max_size_mb: layout.log_max_size_mb.map(|max| max.max(log_size)),
    });

    if layout.wants_secondary() {
        let filegroup = secondary_filegroup_name(name);
        let size_mb = layout
            .secondary_filesize_mb
            .expect("validated: secondary layout requires a file size");
        let count = layout.secondary_file_count.unwrap_or(1);
        let files = (1..=count)
            .map(|index| {
                let logical_name = format!("{filegroup}_{index}");
                DataFileSpec {
                    physical_path: join_engine_path(data_path, &format!("{logical_name}.ndf")),
                    logical_name,
                    size_mb,
                    growth_mb: layout.secondary_file_growth_mb,
                    max_size_mb: layout.secondary_file_max_size_mb,
                }
            })
            .collect();
        plan.secondary_filegroup = Some(FileGroupSpec {
            name: filegroup,
            files,
        });
    }

    plan
}
