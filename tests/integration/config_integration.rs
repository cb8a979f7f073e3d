//! Integration tests for layered configuration loading
//!
//! Verifies source precedence end to end: defaults, then the global file
//! under HOME, then the working-directory file, then environment variables.

use crate::integration::test_utils::with_isolated_env;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vaultgen::config::ConfigLoader;

fn write_global_config(home: &Path, body: &str) {
    let config_dir = home.join(".config").join("vaultgen");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), body).unwrap();
}

fn make_workdir(test_dir: &TempDir) -> std::path::PathBuf {
    let workdir = test_dir.path().join("work");
    fs::create_dir_all(&workdir).unwrap();
    workdir
}

#[test]
fn test_defaults_when_no_sources_present() {
    let test_dir = TempDir::new().unwrap();
    let workdir = make_workdir(&test_dir);

    let config = with_isolated_env(&test_dir, &[], |_| ConfigLoader::load(&workdir).unwrap());

    assert_eq!(config.vault.address, "http://127.0.0.1:8200");
    assert_eq!(config.vault.auth_mount, "kubernetes");
    assert_eq!(config.kv.mount, "kv");
    assert_eq!(config.output.filename, "secrets.conf");
    assert!(config.vault.role.is_none());
}

#[test]
fn test_global_file_under_home_is_read() {
    let test_dir = TempDir::new().unwrap();
    let workdir = make_workdir(&test_dir);

    let config = with_isolated_env(&test_dir, &[], |home| {
        write_global_config(
            home,
            r#"
[vault]
address = "https://global:8200"
role = "global-role"
"#,
        );
        ConfigLoader::load(&workdir).unwrap()
    });

    assert_eq!(config.vault.address, "https://global:8200");
    assert_eq!(config.vault.role.as_deref(), Some("global-role"));
}

#[test]
fn test_local_file_overrides_global() {
    let test_dir = TempDir::new().unwrap();
    let workdir = make_workdir(&test_dir);
    fs::write(
        workdir.join(ConfigLoader::LOCAL_FILE),
        r#"
[vault]
address = "https://local:8200"
"#,
    )
    .unwrap();

    let config = with_isolated_env(&test_dir, &[], |home| {
        write_global_config(
            home,
            r#"
[vault]
address = "https://global:8200"
role = "global-role"
"#,
        );
        ConfigLoader::load(&workdir).unwrap()
    });

    // Local address wins; untouched keys still come from the global layer
    assert_eq!(config.vault.address, "https://local:8200");
    assert_eq!(config.vault.role.as_deref(), Some("global-role"));
}

#[test]
fn test_environment_overrides_files() {
    let test_dir = TempDir::new().unwrap();
    let workdir = make_workdir(&test_dir);
    fs::write(
        workdir.join(ConfigLoader::LOCAL_FILE),
        r#"
[vault]
address = "https://local:8200"
"#,
    )
    .unwrap();

    let config = with_isolated_env(
        &test_dir,
        &[("VAULTGEN_VAULT__ADDRESS", "https://env:8200")],
        |_| ConfigLoader::load(&workdir).unwrap(),
    );

    assert_eq!(config.vault.address, "https://env:8200");
}

#[test]
fn test_environment_parses_non_string_values() {
    let test_dir = TempDir::new().unwrap();
    let workdir = make_workdir(&test_dir);

    let config = with_isolated_env(
        &test_dir,
        &[
            ("VAULTGEN_VAULT__TLS_VERIFY", "false"),
            ("VAULTGEN_KV__MAX_DEPTH", "4"),
        ],
        |_| ConfigLoader::load(&workdir).unwrap(),
    );

    assert!(!config.vault.tls_verify);
    assert_eq!(config.kv.max_depth, 4);
}
