//! Integration tests for rendering and file writing
//!
//! Covers the render-then-write pipeline: materialized trees serialized to
//! each supported format and persisted through the atomic writer.

use crate::integration::test_utils::RecordingStore;
use std::fs;
use tempfile::TempDir;
use vaultgen::error::AppError;
use vaultgen::render::{render, OutputFormat};
use vaultgen::tree::{SecretTree, SecretValue, TreeBuilder};
use vaultgen::writer::write_output_file;

fn flat_tree(entries: &[(&str, &str)]) -> SecretTree {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), SecretValue::Scalar(v.to_string())))
        .collect()
}

/// env format end to end: materialize, render, write, read back
#[test]
fn test_env_file_end_to_end() {
    let store = RecordingStore::new().with_node(
        "secret/app",
        &[("db_user", "svc"), ("api_key", "k-123")],
        &[],
    );
    let tree = TreeBuilder::new(&store).build("secret/app").unwrap();

    let rendered = render(&tree, OutputFormat::Env).unwrap();
    let dir = TempDir::new().unwrap();
    let path = write_output_file(dir.path(), "secrets.conf", &rendered).unwrap();

    assert_eq!(
        fs::read_to_string(path).unwrap(),
        "api_key='k-123'\ndb_user='svc'\n"
    );
}

/// export format prefixes every line
#[test]
fn test_export_file_end_to_end() {
    let tree = flat_tree(&[("db_user", "svc")]);
    let rendered = render(&tree, OutputFormat::Export).unwrap();

    let dir = TempDir::new().unwrap();
    let path = write_output_file(dir.path(), "secrets.sh", &rendered).unwrap();

    assert_eq!(
        fs::read_to_string(path).unwrap(),
        "export db_user='svc'\n"
    );
}

/// toml format writes a nested document that parses back to the same values
#[test]
fn test_toml_file_end_to_end() {
    let store = RecordingStore::new()
        .with_node("secret/app", &[("db_user", "svc")], &["db/"])
        .with_node("secret/app/db", &[("password", "p@ss")], &[]);
    let tree = TreeBuilder::new(&store).build("secret/app").unwrap();

    let rendered = render(&tree, OutputFormat::Toml).unwrap();
    let dir = TempDir::new().unwrap();
    let path = write_output_file(dir.path(), "secrets.toml", &rendered).unwrap();

    let parsed: toml::Value = fs::read_to_string(path).unwrap().parse().unwrap();
    assert_eq!(parsed["db_user"].as_str(), Some("svc"));
    assert_eq!(parsed["db"]["password"].as_str(), Some("p@ss"));
}

/// A nested tree rejected by a flat format fails before any file exists
#[test]
fn test_format_mismatch_leaves_no_file() {
    let store = RecordingStore::new()
        .with_node("secret/app", &[], &["db/"])
        .with_node("secret/app/db", &[("password", "p@ss")], &[]);
    let tree = TreeBuilder::new(&store).build("secret/app").unwrap();

    let dir = TempDir::new().unwrap();
    let err = render(&tree, OutputFormat::Env).unwrap_err();
    assert!(matches!(err, AppError::SerializationMismatch { .. }));

    let leftover: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftover.is_empty());
}

/// An empty subtree produces an empty but present file
#[test]
fn test_empty_tree_writes_empty_file() {
    let store = RecordingStore::new();
    let tree = TreeBuilder::new(&store).build("secret/app").unwrap();

    let rendered = render(&tree, OutputFormat::Env).unwrap();
    let dir = TempDir::new().unwrap();
    let path = write_output_file(dir.path(), "secrets.conf", &rendered).unwrap();

    assert!(path.exists());
    assert_eq!(fs::read_to_string(path).unwrap(), "");
}

/// Rewriting the output replaces prior contents atomically
#[test]
fn test_regeneration_replaces_previous_file() {
    let dir = TempDir::new().unwrap();

    let first = render(&flat_tree(&[("k", "old")]), OutputFormat::Env).unwrap();
    write_output_file(dir.path(), "secrets.conf", &first).unwrap();

    let second = render(&flat_tree(&[("k", "new")]), OutputFormat::Env).unwrap();
    let path = write_output_file(dir.path(), "secrets.conf", &second).unwrap();

    assert_eq!(fs::read_to_string(path).unwrap(), "k='new'\n");
}
