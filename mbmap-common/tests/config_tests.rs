//! Unit tests for configuration resolution and graceful degradation
//!
//! Tests that manipulate environment variables are marked with #[serial]
//! so they run sequentially, not in parallel.

use mbmap_common::config::{
    load_toml_config, resolve_setting, CompiledDefaults, ConfigSource, LoggingConfig,
    ResolverSection, TomlConfig,
};
use mbmap_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_compiled_defaults() {
    let defaults = CompiledDefaults::new();

    assert_eq!(defaults.archive_path, PathBuf::from("mbdump.tar.bz2"));
    assert_eq!(defaults.output_path, PathBuf::from("isrc_to_mbid_map.csv"));
    assert_eq!(defaults.sought_column, "isrc");
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.preflight);
    assert!(defaults.progress_interval > 0);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var("MBMAP_TEST_ARCHIVE", "/data/env-dump.tar.bz2");

    let resolved = resolve_setting(
        "archive_path",
        None,
        "MBMAP_TEST_ARCHIVE",
        Some(PathBuf::from("/data/toml-dump.tar.bz2")),
        PathBuf::from("mbdump.tar.bz2"),
    );

    assert_eq!(resolved.value, PathBuf::from("/data/env-dump.tar.bz2"));
    assert_eq!(resolved.source, ConfigSource::Environment);

    env::remove_var("MBMAP_TEST_ARCHIVE");
}

#[test]
#[serial]
fn test_cli_beats_env_var() {
    env::set_var("MBMAP_TEST_OUTPUT", "/data/env.csv");

    let resolved = resolve_setting(
        "output_path",
        Some(PathBuf::from("/data/cli.csv")),
        "MBMAP_TEST_OUTPUT",
        None,
        PathBuf::from("isrc_to_mbid_map.csv"),
    );

    assert_eq!(resolved.value, PathBuf::from("/data/cli.csv"));
    assert_eq!(resolved.source, ConfigSource::CommandLine);

    env::remove_var("MBMAP_TEST_OUTPUT");
}

#[test]
#[serial]
fn test_unparsable_env_var_falls_through_to_toml() {
    env::set_var("MBMAP_TEST_INTERVAL", "not-a-number");

    let resolved: mbmap_common::config::Resolved<u64> =
        resolve_setting("progress_interval", None, "MBMAP_TEST_INTERVAL", Some(500), 1_000_000);

    assert_eq!(resolved.value, 500);
    assert_eq!(resolved.source, ConfigSource::TomlFile);

    env::remove_var("MBMAP_TEST_INTERVAL");
}

#[test]
#[serial]
fn test_empty_env_var_is_ignored() {
    env::set_var("MBMAP_TEST_COLUMN", "   ");

    let resolved = resolve_setting(
        "sought_column",
        None,
        "MBMAP_TEST_COLUMN",
        None,
        "isrc".to_string(),
    );

    assert_eq!(resolved.value, "isrc");
    assert_eq!(resolved.source, ConfigSource::Default);

    env::remove_var("MBMAP_TEST_COLUMN");
}

#[test]
fn test_explicit_config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mbmap.toml");
    std::fs::write(
        &path,
        r#"
            [logging]
            level = "debug"

            [resolver]
            archive_path = "/dumps/mbdump.tar.bz2"
            canonical_member = "exact:mbdump/recording"
            preflight = false
        "#,
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.resolver.archive_path,
        Some(PathBuf::from("/dumps/mbdump.tar.bz2"))
    );
    assert_eq!(config.resolver.preflight, Some(false));
    assert_eq!(config.resolver.output_path, None);
}

#[test]
fn test_explicit_missing_config_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_toml_config(Some(&dir.path().join("absent.toml")));

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_toml_roundtrip() {
    let config = TomlConfig {
        logging: LoggingConfig::default(),
        resolver: ResolverSection {
            sought_keys_path: Some(PathBuf::from("features.csv")),
            sought_column: Some("isrc_code".to_string()),
            progress_interval: Some(250_000),
            ..Default::default()
        },
    };

    let toml_str = toml::to_string(&config).unwrap();
    let parsed: TomlConfig = toml::from_str(&toml_str).unwrap();

    assert_eq!(parsed, config);
}

#[test]
fn test_logging_section_optional() {
    let config: TomlConfig = toml::from_str(
        r#"
            [resolver]
            output_path = "out.csv"
        "#,
    )
    .unwrap();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.resolver.output_path, Some(PathBuf::from("out.csv")));
}
