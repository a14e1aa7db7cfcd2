use dbops::config::{DefaultFileGroup, FileLayoutConfig, ProvisionConfig, RunOptions};
use dbops::engine::{
    DatabaseFileInfo, DatabaseInfo, EngineVersion, Instance, MockEngine, RecoveryModel,
    ServerInfo, TemplateLayout,
};
use dbops::provision::run_provision;

fn server_info(name: &str, major: u32) -> ServerInfo {
    ServerInfo {
        instance: name.to_string(),
        version: EngineVersion { major, minor: 0 },
        data_path: r"D:\data".to_string(),
        log_path: r"E:\log".to_string(),
        backup_path: r"F:\backups".to_string(),
        databases: vec!["master".to_string()],
    }
}

fn database_info(instance: &str, name: &str, files: Vec<DatabaseFileInfo>) -> DatabaseInfo {
    DatabaseInfo {
        instance: instance.to_string(),
        name: name.to_string(),
        owner: "sa".to_string(),
        collation: "SQL_Latin1_General_CP1_CI_AS".to_string(),
        recovery_model: "FULL".to_string(),
        files,
    }
}

fn config(instances: &[&str], names: &[&str], layout: FileLayoutConfig) -> ProvisionConfig {
    ProvisionConfig {
        instances: instances.iter().map(|i| Instance::new(*i, None)).collect(),
        names: names.iter().map(|n| n.to_string()).collect(),
        collation: None,
        recovery_model: None,
        owner: None,
        layout,
    }
}

fn options() -> RunOptions {
    RunOptions {
        silent: true,
        ..Default::default()
    }
}

fn expect_advanced_instance(engine: &mut MockEngine) {
    engine
        .expect_connect()
        .returning(|instance| Ok(server_info(&instance.name, 15)));
    engine
        .expect_file_exists()
        .withf(|_, path| path == r"D:\data" || path == r"E:\log")
        .returning(|_, _| Ok(true));
    engine.expect_template_layout().returning(|_| {
        Ok(TemplateLayout {
            primary_size_mb: 16,
            log_size_mb: 8,
        })
    });
}

#[tokio::test]
async fn plain_creation_uses_engine_defaults() {
    let mut engine = MockEngine::new();
    engine
        .expect_connect()
        .returning(|instance| Ok(server_info(&instance.name, 15)));
    // No file_exists/template_layout expectations: a plain creation must not
    // prepare directories or read the template.
    engine
        .expect_database_exists()
        .returning(|_, _| Ok(false));
    engine
        .expect_create_database()
        .withf(|_, plan| {
            plan.name == "demo"
                && plan.primary_file.is_none()
                && plan.log_file.is_none()
                && plan.secondary_filegroup.is_none()
        })
        .times(1)
        .returning(|_, _| Ok(()));
    engine
        .expect_database_info()
        .returning(|instance, name| Ok(database_info(&instance.name, name, Vec::new())));

    let created = run_provision(
        &engine,
        &config(&["DEST01"], &["demo"], FileLayoutConfig::default()),
        &options(),
    )
    .await
    .unwrap();

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].name, "demo");
}

#[tokio::test]
async fn secondary_layout_creates_exactly_n_suffixed_files() {
    let mut engine = MockEngine::new();
    expect_advanced_instance(&mut engine);
    engine.expect_database_exists().returning(|_, _| Ok(false));
    engine
        .expect_create_database()
        .withf(|_, plan| {
            let group = plan.secondary_filegroup.as_ref().expect("secondary group");
            group.name == "demo_MainData"
                && group.files.len() == 2
                && group.files[0].logical_name == "demo_MainData_1"
                && group.files[1].logical_name == "demo_MainData_2"
                && group.files.iter().all(|f| f.size_mb == 50)
        })
        .times(1)
        .returning(|_, _| Ok(()));
    engine.expect_database_info().returning(|instance, name| {
        Ok(database_info(
            &instance.name,
            name,
            vec![
                DatabaseFileInfo {
                    logical_name: "demo_MainData_1".to_string(),
                    filegroup: "demo_MainData".to_string(),
                    size_mb: 50.0,
                },
                DatabaseFileInfo {
                    logical_name: "demo_MainData_2".to_string(),
                    filegroup: "demo_MainData".to_string(),
                    size_mb: 50.0,
                },
            ],
        ))
    });

    let layout = FileLayoutConfig {
        secondary_filesize_mb: Some(50),
        secondary_file_count: Some(2),
        ..Default::default()
    };
    let created = run_provision(&engine, &config(&["DEST01"], &["demo"], layout), &options())
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    let files: Vec<_> = created[0]
        .files
        .iter()
        .filter(|f| f.filegroup == "demo_MainData")
        .collect();
    assert_eq!(files.len(), 2);
}

#[tokio::test]
async fn undersized_request_is_clamped_to_the_template() {
    let mut engine = MockEngine::new();
    expect_advanced_instance(&mut engine);
    engine.expect_database_exists().returning(|_, _| Ok(false));
    engine
        .expect_create_database()
        .withf(|_, plan| {
            plan.primary_file.as_ref().expect("primary").size_mb == 16
                && plan.log_file.as_ref().expect("log").size_mb == 8
        })
        .times(1)
        .returning(|_, _| Ok(()));
    engine
        .expect_database_info()
        .returning(|instance, name| Ok(database_info(&instance.name, name, Vec::new())));

    let layout = FileLayoutConfig {
        primary_filesize_mb: Some(4),
        log_size_mb: Some(2),
        ..Default::default()
    };
    let created = run_provision(&engine, &config(&["DEST01"], &["demo"], layout), &options())
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
}

#[tokio::test]
async fn existing_name_is_rejected_per_database() {
    let mut engine = MockEngine::new();
    engine
        .expect_connect()
        .returning(|instance| Ok(server_info(&instance.name, 15)));
    engine.expect_database_exists().returning(|_, name| Ok(name == "demo"));
    engine
        .expect_create_database()
        .withf(|_, plan| plan.name == "fresh")
        .times(1)
        .returning(|_, _| Ok(()));
    engine
        .expect_database_info()
        .returning(|instance, name| Ok(database_info(&instance.name, name, Vec::new())));

    let created = run_provision(
        &engine,
        &config(&["DEST01"], &["demo", "fresh"], FileLayoutConfig::default()),
        &options(),
    )
    .await
    .unwrap();

    // "demo" conflicts and is skipped; the loop continues with "fresh".
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].name, "fresh");
}

#[tokio::test]
async fn advanced_layout_on_an_old_engine_rejects_the_instance() {
    let mut engine = MockEngine::new();
    engine
        .expect_connect()
        .returning(|instance| Ok(server_info(&instance.name, 8)));
    // Nothing beyond connect may run against the old instance.

    let layout = FileLayoutConfig {
        primary_filesize_mb: Some(64),
        ..Default::default()
    };
    let created = run_provision(&engine, &config(&["OLD01"], &["demo"], layout), &options())
        .await
        .unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn missing_directories_are_created_before_any_database() {
    let mut engine = MockEngine::new();
    engine
        .expect_connect()
        .returning(|instance| Ok(server_info(&instance.name, 15)));
    engine
        .expect_file_exists()
        .withf(|_, path| path == r"G:\custom" || path == r"E:\log")
        .returning(|_, path| Ok(path == r"E:\log"));
    engine
        .expect_create_directory()
        .withf(|_, path| path == r"G:\custom")
        .times(1)
        .returning(|_, _| Ok(()));
    engine.expect_template_layout().returning(|_| {
        Ok(TemplateLayout {
            primary_size_mb: 16,
            log_size_mb: 8,
        })
    });
    engine.expect_database_exists().returning(|_, _| Ok(false));
    engine
        .expect_create_database()
        .withf(|_, plan| {
            plan.primary_file.as_ref().expect("primary").physical_path == r"G:\custom\demo.mdf"
        })
        .returning(|_, _| Ok(()));
    engine
        .expect_database_info()
        .returning(|instance, name| Ok(database_info(&instance.name, name, Vec::new())));

    let layout = FileLayoutConfig {
        data_path: Some(r"G:\custom".to_string()),
        primary_filesize_mb: Some(64),
        ..Default::default()
    };
    let created = run_provision(&engine, &config(&["DEST01"], &["demo"], layout), &options())
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
}

#[tokio::test]
async fn omitted_name_generates_a_random_one() {
    let mut engine = MockEngine::new();
    engine
        .expect_connect()
        .returning(|instance| Ok(server_info(&instance.name, 15)));
    engine
        .expect_database_exists()
        .withf(|_, name| name.starts_with("random-"))
        .returning(|_, _| Ok(false));
    engine
        .expect_create_database()
        .withf(|_, plan| plan.name.starts_with("random-"))
        .times(1)
        .returning(|_, _| Ok(()));
    engine
        .expect_database_info()
        .returning(|instance, name| Ok(database_info(&instance.name, name, Vec::new())));

    let created = run_provision(
        &engine,
        &config(&["DEST01"], &[], FileLayoutConfig::default()),
        &options(),
    )
    .await
    .unwrap();
    assert_eq!(created.len(), 1);
    assert!(created[0].name.starts_with("random-"));
}

#[tokio::test]
async fn owner_and_default_filegroup_follow_creation() {
    let mut engine = MockEngine::new();
    expect_advanced_instance(&mut engine);
    engine.expect_database_exists().returning(|_, _| Ok(false));
    engine.expect_create_database().returning(|_, _| Ok(()));
    engine
        .expect_set_owner()
        .withf(|_, database, owner| database == "demo" && owner == "app_login")
        .times(1)
        .returning(|_, _, _| Ok(()));
    engine
        .expect_set_default_filegroup()
        .withf(|_, database, filegroup| database == "demo" && filegroup == "demo_MainData")
        .times(1)
        .returning(|_, _, _| Ok(()));
    engine
        .expect_database_info()
        .returning(|instance, name| Ok(database_info(&instance.name, name, Vec::new())));

    let layout = FileLayoutConfig {
        secondary_filesize_mb: Some(50),
        default_filegroup: Some(DefaultFileGroup::Secondary),
        ..Default::default()
    };
    let mut cfg = config(&["DEST01"], &["demo"], layout);
    cfg.owner = Some("app_login".to_string());
    cfg.recovery_model = Some(RecoveryModel::Full);

    let created = run_provision(&engine, &cfg, &options()).await.unwrap();
    assert_eq!(created.len(), 1);
}

#[tokio::test]
async fn owner_failure_is_a_warning_not_a_failed_creation() {
    let mut engine = MockEngine::new();
    engine
        .expect_connect()
        .returning(|instance| Ok(server_info(&instance.name, 15)));
    engine.expect_database_exists().returning(|_, _| Ok(false));
    engine.expect_create_database().returning(|_, _| Ok(()));
    engine
        .expect_set_owner()
        .returning(|_, _, _| anyhow::bail!("login 'ghost' does not exist"));
    engine
        .expect_database_info()
        .returning(|instance, name| Ok(database_info(&instance.name, name, Vec::new())));

    let mut cfg = config(&["DEST01"], &["demo"], FileLayoutConfig::default());
    cfg.owner = Some("ghost".to_string());

    let created = run_provision(&engine, &cfg, &options()).await.unwrap();
    assert_eq!(created.len(), 1);
}

#[tokio::test]
async fn dry_run_creates_nothing() {
    let mut engine = MockEngine::new();
    engine
        .expect_connect()
        .returning(|instance| Ok(server_info(&instance.name, 15)));
    engine.expect_database_exists().returning(|_, _| Ok(false));
    // No create_database expectation: reaching it would panic the test.

    let opts = RunOptions {
        dry_run: true,
        silent: true,
        ..Default::default()
    };
    let created = run_provision(
        &engine,
        &config(&["DEST01"], &["demo"], FileLayoutConfig::default()),
        &opts,
    )
    .await
    .unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn one_bad_instance_does_not_stop_the_rest() {
    let mut engine = MockEngine::new();
    engine.expect_connect().returning(|instance| {
        if instance.name == "BAD01" {
            anyhow::bail!("network path not found")
        }
        Ok(server_info(&instance.name, 15))
    });
    engine.expect_database_exists().returning(|_, _| Ok(false));
    engine.expect_create_database().returning(|_, _| Ok(()));
    engine
        .expect_database_info()
        .returning(|instance, name| Ok(database_info(&instance.name, name, Vec::new())));

    let created = run_provision(
        &engine,
        &config(&["BAD01", "DEST02"], &["demo"], FileLayoutConfig::default()),
        &options(),
    )
    .await
    .unwrap();

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].instance, "DEST02");
}
