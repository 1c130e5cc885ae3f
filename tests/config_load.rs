// tests/config_load.rs
use std::{env, fs};

use daily_brief::config::{PipelineConfig, ServeMode, ENV_CONFIG_PATH};

#[serial_test::serial]
#[test]
fn env_path_takes_precedence_over_default_location() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("pipeline.toml");
    fs::write(
        &path,
        r#"
cache_ttl_hours = 6
serve_mode = "produced"

[general]
select_min = 10
select_max = 12
"#,
    )
    .unwrap();

    env::set_var(ENV_CONFIG_PATH, path.display().to_string());
    let cfg = PipelineConfig::load_default().unwrap();
    env::remove_var(ENV_CONFIG_PATH);

    assert_eq!(cfg.cache_ttl_hours, 6);
    assert_eq!(cfg.serve_mode, ServeMode::Produced);
    assert_eq!(cfg.general.select_min, 10);
    assert_eq!(cfg.general.select_max, 12);
    // Unset fields keep their defaults.
    assert_eq!(cfg.uplifting.select_max, 10);
}

#[serial_test::serial]
#[test]
fn missing_file_falls_back_to_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    env::set_var(
        ENV_CONFIG_PATH,
        tmp.path().join("does_not_exist.toml").display().to_string(),
    );
    let cfg = PipelineConfig::load_default().unwrap();
    env::remove_var(ENV_CONFIG_PATH);

    assert_eq!(cfg.cache_ttl_hours, 24);
    assert_eq!(cfg.serve_mode, ServeMode::Live);
}

#[serial_test::serial]
#[test]
fn malformed_file_is_an_error_not_a_silent_default() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("pipeline.toml");
    fs::write(&path, "serve_mode = 42").unwrap();

    env::set_var(ENV_CONFIG_PATH, path.display().to_string());
    let result = PipelineConfig::load_default();
    env::remove_var(ENV_CONFIG_PATH);

    assert!(result.is_err());
}
