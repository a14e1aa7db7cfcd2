// dbops/src/verify/plan.rs
use anyhow::Result;

use crate::engine::{BackupHeader, BackupRecord, Engine, Instance};
use crate::utils::paths::is_network_path;

/// Terminal classification of one database's backup before any restore is
/// attempted. Each variant maps to exactly one outcome shape, so every skip
/// branch of the workflow is auditable without a live engine.
#[derive(Debug)]
pub enum RestorePlan {
    /// No full backup in the source's history.
    NotFound,
    /// Cross-instance run, but the backup sits on a path only the source
    /// host can read.
    NotShared,
    /// The destination's path probe could not see this file.
    FileNotSeen(String),
    /// The backup would materialize more data than the configured limit.
    TooLarge { size_mb: f64, limit_mb: u64 },
    /// Restore can proceed.
    Ready { header: BackupHeader },
}

/// Resolves the restore plan for a (possibly relocated) backup record,
/// probing paths and reading the media header from the destination's
/// perspective.
pub async fn resolve_restore_plan(
    engine: &dyn Engine,
    destination: &Instance,
    backup: Option<&BackupRecord>,
    cross_instance: bool,
    max_size_mb: Option<u64>,
) -> Result<RestorePlan> {
    let Some(record) = backup else {
        return Ok(RestorePlan::NotFound);
    };

    if cross_instance && !record.paths.iter().all(|path| is_network_path(path)) {
        return Ok(RestorePlan::NotShared);
    }

    for path in &record.paths {
        if !engine.file_exists(destination, path).await? {
            return Ok(RestorePlan::FileNotSeen(path.clone()));
        }
    }

    let header = engine.read_backup_header(destination, &record.paths).await?;
    if let Some(limit_mb) = max_size_mb {
        if header.size_mb > limit_mb as f64 {
            return Ok(RestorePlan::TooLarge {
                size_mb: header.size_mb,
                limit_mb,
            });
        }
    }

    Ok(RestorePlan::Ready { header })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LogicalFile, MockEngine};
    use chrono::Utc;
    use mockall::predicate::always;

    fn record(paths: &[&str]) -> BackupRecord {
        BackupRecord {
            server: "SRC01".to_string(),
            database: "sales".to_string(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            total_size_mb: 500.0,
            start_time: Utc::now(),
            copy_only: false,
        }
    }

    fn header(size_mb: f64) -> BackupHeader {
        BackupHeader {
            size_mb,
            files: vec![LogicalFile {
                logical_name: "sales".to_string(),
                file_type: "D".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn missing_backup_resolves_to_not_found() {
        let engine = MockEngine::new();
        let destination = Instance::new("DEST01", None);
        let plan = resolve_restore_plan(&engine, &destination, None, true, None)
            .await
            .unwrap();
        assert!(matches!(plan, RestorePlan::NotFound));
    }

    #[tokio::test]
    async fn cross_instance_local_path_is_not_shared() {
        let engine = MockEngine::new();
        let destination = Instance::new("DEST01", None);
        let backup = record(&[r"D:\backups\sales.bak"]);
        let plan = resolve_restore_plan(&engine, &destination, Some(&backup), true, None)
            .await
            .unwrap();
        assert!(matches!(plan, RestorePlan::NotShared));
    }

    #[tokio::test]
    async fn same_instance_local_path_is_probed_not_rejected() {
        let mut engine = MockEngine::new();
        engine
            .expect_file_exists()
            .with(always(), always())
            .returning(|_, _| Ok(true));
        engine
            .expect_read_backup_header()
            .returning(|_, _| Ok(header(500.0)));

        let destination = Instance::new("SRC01", None);
        let backup = record(&[r"D:\backups\sales.bak"]);
        let plan = resolve_restore_plan(&engine, &destination, Some(&backup), false, None)
            .await
            .unwrap();
        assert!(matches!(plan, RestorePlan::Ready { .. }));
    }

    #[tokio::test]
    async fn unreachable_path_reports_the_file() {
        let mut engine = MockEngine::new();
        engine.expect_file_exists().returning(|_, _| Ok(false));

        let destination = Instance::new("DEST01", None);
        let backup = record(&[r"\\nas01\backups\sales.bak"]);
        let plan = resolve_restore_plan(&engine, &destination, Some(&backup), true, None)
            .await
            .unwrap();
        match plan {
            RestorePlan::FileNotSeen(path) => assert_eq!(path, r"\\nas01\backups\sales.bak"),
            other => panic!("expected FileNotSeen, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_backup_is_classified_with_both_numbers() {
        let mut engine = MockEngine::new();
        engine.expect_file_exists().returning(|_, _| Ok(true));
        engine
            .expect_read_backup_header()
            .returning(|_, _| Ok(header(500.0)));

        let destination = Instance::new("DEST01", None);
        let backup = record(&[r"\\nas01\backups\sales.bak"]);
        let plan = resolve_restore_plan(&engine, &destination, Some(&backup), true, Some(100))
            .await
            .unwrap();
        match plan {
            RestorePlan::TooLarge { size_mb, limit_mb } => {
                assert_eq!(size_mb, 500.0);
                assert_eq!(limit_mb, 100);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn backup_at_limit_still_restores() {
        let mut engine = MockEngine::new();
        engine.expect_file_exists().returning(|_, _| Ok(true));
        engine
            .expect_read_backup_header()
            .returning(|_, _| Ok(header(100.0)));

        let destination = Instance::new("DEST01", None);
        let backup = record(&[r"\\nas01\backups\sales.bak"]);
        let plan = resolve_restore_plan(&engine, &destination, Some(&backup), true, Some(100))
            .await
            .unwrap();
        assert!(matches!(plan, RestorePlan::Ready { .. }));
    }
}
