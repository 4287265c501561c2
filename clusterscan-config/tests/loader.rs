use std::fs;

use clusterscan_config::{ConfigLoader, ConfigSource, EnvConfig};
use tempfile::TempDir;

fn empty_root() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

#[test]
fn defaults_when_nothing_is_configured() {
    let root = empty_root();
    let load = ConfigLoader::new()
        .with_search_root(root.path())
        .load_with_env(EnvConfig::default())
        .expect("defaults load");

    assert_eq!(load.source, ConfigSource::Default);
    assert_eq!(load.config.workers, 4);
    assert_eq!(load.config.controller_name, "clusterscan-operator");
    assert!(
        load.warnings
            .iter()
            .any(|warning| warning.message.contains("default_profile"))
    );
}

#[test]
fn default_candidate_file_is_discovered() {
    let root = empty_root();
    fs::create_dir_all(root.path().join("config")).expect("mkdir");
    let path = root.path().join("config/clusterscan.toml");
    fs::write(
        &path,
        "controller_name = \"edge-scanner\"\ndefault_profile = \"cis-1.6\"\n\n[retry]\nbackoff_base_ms = 100\n",
    )
    .expect("write config");

    let load = ConfigLoader::new()
        .with_search_root(root.path())
        .load_with_env(EnvConfig::default())
        .expect("file loads");

    assert_eq!(load.source, ConfigSource::File(path));
    assert_eq!(load.config.controller_name, "edge-scanner");
    assert_eq!(load.config.retry.backoff_base_ms, 100);
    assert_eq!(load.config.retry.backoff_max_ms, 300_000);
    assert!(load.warnings.is_empty());
}

#[test]
fn explicit_path_beats_environment() {
    let root = empty_root();
    let explicit = root.path().join("explicit.json");
    fs::write(&explicit, r#"{"workers": 7, "default_profile": "cis-1.6"}"#)
        .expect("write explicit");
    let env_file = root.path().join("env.toml");
    fs::write(&env_file, "workers = 9\n").expect("write env file");

    let env = EnvConfig {
        config_path: Some(env_file),
        config_json: Some(r#"{"workers": 11}"#.into()),
        ..EnvConfig::default()
    };
    let load = ConfigLoader::new()
        .with_config_path(&explicit)
        .with_search_root(root.path())
        .load_with_env(env)
        .expect("explicit loads");

    assert_eq!(load.source, ConfigSource::Explicit(explicit));
    assert_eq!(load.config.workers, 7);
}

#[test]
fn env_path_beats_inline_json() {
    let root = empty_root();
    let env_file = root.path().join("env.toml");
    fs::write(&env_file, "workers = 9\n").expect("write env file");

    let env = EnvConfig {
        config_path: Some(env_file.clone()),
        config_json: Some(r#"{"workers": 11}"#.into()),
        ..EnvConfig::default()
    };
    let load = ConfigLoader::new()
        .with_search_root(root.path())
        .load_with_env(env)
        .expect("env path loads");

    assert_eq!(load.source, ConfigSource::EnvPath(env_file));
    assert_eq!(load.config.workers, 9);
}

#[test]
fn inline_json_and_scalar_overrides() {
    let root = empty_root();
    let env = EnvConfig {
        config_json: Some(r#"{"workers": 11, "output_namespace": "scans"}"#.into()),
        controller_name: Some("night-shift".into()),
        workers: Some("3".into()),
        ..EnvConfig::default()
    };
    let load = ConfigLoader::new()
        .with_search_root(root.path())
        .load_with_env(env)
        .expect("inline loads");

    assert_eq!(load.source, ConfigSource::EnvInline);
    assert_eq!(load.config.output_namespace, "scans");
    assert_eq!(load.config.controller_name, "night-shift");
    assert_eq!(load.config.workers, 3);
}

#[test]
fn invalid_values_are_rejected_with_context() {
    let root = empty_root();
    let path = root.path().join("clusterscan.toml");
    fs::write(&path, "workers = 0\n").expect("write config");

    let err = ConfigLoader::new()
        .with_search_root(root.path())
        .load_with_env(EnvConfig::default())
        .expect_err("zero workers rejected");
    let chain = format!("{err:#}");
    assert!(chain.contains("clusterscan.toml"));
    assert!(chain.contains("workers must be at least 1"));

    let bad_env = EnvConfig {
        workers: Some("many".into()),
        ..EnvConfig::default()
    };
    let err = ConfigLoader::new()
        .with_search_root(root.path())
        .load_with_env(bad_env)
        .expect_err("unparsable worker override");
    assert!(format!("{err:#}").contains("CLUSTERSCAN_WORKERS"));
}

#[test]
fn unreadable_explicit_path_is_an_error() {
    let root = empty_root();
    let missing = root.path().join("absent.toml");
    let err = ConfigLoader::new()
        .with_config_path(&missing)
        .load_with_env(EnvConfig::default())
        .expect_err("missing file");
    assert!(format!("{err:#}").contains("absent.toml"));
}
