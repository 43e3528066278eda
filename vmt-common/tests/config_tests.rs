//! Unit tests for configuration loading and root folder resolution
//!
//! Tests that manipulate VMT_ROOT_FOLDER are marked #[serial] so they
//! don't race each other on the process environment.

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;
use vmt_common::config::{
    default_root_folder, load_toml_config, write_toml_config, LoggingConfig, NotificationConfig,
    RootFolderInitializer, RootFolderResolver, TomlConfig, DEFAULT_DATABASE_FILE, ROOT_FOLDER_ENV,
};

#[test]
fn test_missing_config_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    let config = load_toml_config(Some(&missing)).expect("missing file must not fail");

    assert!(config.root_folder.is_none());
    assert_eq!(config.database_file(), DEFAULT_DATABASE_FILE);
    assert_eq!(config.logging.level, "info");
    assert!(config.notifications.enabled);
    assert_eq!(config.notifications.event_capacity, 100);
}

#[test]
fn test_partial_config_fills_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        root_folder = "/srv/vmt"

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/vmt")));
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.file.is_none());
    assert!(config.notifications.enabled);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let err = TomlConfig::from_toml_str("root_folder = [").unwrap_err();
    assert!(matches!(err, vmt_common::Error::Config(_)));
}

#[test]
fn test_write_then_load_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("nested").join("config.toml");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/data/vmt")),
        database_file: Some("issues.db".to_string()),
        logging: LoggingConfig {
            level: "warn".to_string(),
            file: None,
        },
        notifications: NotificationConfig {
            enabled: false,
            event_capacity: 16,
        },
    };

    write_toml_config(&config, &target).unwrap();
    assert!(target.exists());
    assert!(!target.with_extension("toml.tmp").exists());

    let loaded = load_toml_config(Some(&target)).unwrap();
    assert_eq!(loaded.root_folder, config.root_folder);
    assert_eq!(loaded.database_file(), "issues.db");
    assert_eq!(loaded.logging.level, "warn");
    assert!(!loaded.notifications.enabled);
    assert_eq!(loaded.notifications.event_capacity, 16);
}

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/vmt-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/vmt-toml")),
        ..Default::default()
    };

    let resolver = RootFolderResolver::new(Some(PathBuf::from("/tmp/vmt-cli")), &config);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/vmt-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/vmt-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/vmt-toml")),
        ..Default::default()
    };

    let resolver = RootFolderResolver::new(None, &config);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/vmt-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/vmt-toml")),
        ..Default::default()
    };
    assert_eq!(
        RootFolderResolver::new(None, &config).resolve(),
        PathBuf::from("/tmp/vmt-toml")
    );

    let resolver = RootFolderResolver::new(None, &TomlConfig::default());
    assert_eq!(resolver.resolve(), default_root_folder());
}

#[test]
fn test_initializer_creates_folder_and_locates_database() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("vmt-root");

    let initializer = RootFolderInitializer::new(root.clone(), &TomlConfig::default());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join(DEFAULT_DATABASE_FILE));
}
