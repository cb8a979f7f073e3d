//! Shared test utilities for integration tests
//!
//! Provides an in-memory secret store that records every backend call, plus
//! environment isolation helpers for configuration tests.

use std::collections::HashMap;
use std::sync::Mutex;
use tempfile::TempDir;
use vaultgen::backend::{LeafRecord, SecretStore};
use vaultgen::error::BackendError;

/// In-memory secret store that records every read and list call, so tests
/// can assert how often each path was visited
pub struct RecordingStore {
    nodes: HashMap<String, (LeafRecord, Vec<String>)>,
    failing_reads: Vec<String>,
    reads: Mutex<Vec<String>>,
    lists: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            failing_reads: Vec::new(),
            reads: Mutex::new(Vec::new()),
            lists: Mutex::new(Vec::new()),
        }
    }

    /// Register a path with its own key/value payload and child listing
    pub fn with_node(mut self, path: &str, leaf: &[(&str, &str)], children: &[&str]) -> Self {
        let record: LeafRecord = leaf
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let names: Vec<String> = children.iter().map(|c| c.to_string()).collect();
        self.nodes.insert(path.to_string(), (record, names));
        self
    }

    /// Make reads of `path` fail with a backend error
    pub fn with_failing_read(mut self, path: &str) -> Self {
        self.failing_reads.push(path.to_string());
        self
    }

    /// Paths passed to `read_leaf`, in call order
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }

    /// Paths passed to `list_children`, in call order
    pub fn lists(&self) -> Vec<String> {
        self.lists.lock().unwrap().clone()
    }

    /// Number of `read_leaf` calls for one path
    pub fn read_count(&self, path: &str) -> usize {
        self.reads().iter().filter(|p| *p == path).count()
    }

    /// Number of `list_children` calls for one path
    pub fn list_count(&self, path: &str) -> usize {
        self.lists().iter().filter(|p| *p == path).count()
    }
}

impl SecretStore for RecordingStore {
    fn read_leaf(&self, path: &str) -> Result<LeafRecord, BackendError> {
        self.reads.lock().unwrap().push(path.to_string());
        if self.failing_reads.iter().any(|p| p == path) {
            return Err(BackendError::Unavailable(format!(
                "injected read failure for '{}'",
                path
            )));
        }
        Ok(self
            .nodes
            .get(path)
            .map(|(leaf, _)| leaf.clone())
            .unwrap_or_default())
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>, BackendError> {
        self.lists.lock().unwrap().push(path.to_string());
        Ok(self
            .nodes
            .get(path)
            .map(|(_, children)| children.clone())
            .unwrap_or_default())
    }
}

/// Global mutex to serialize HOME / VAULTGEN_* environment access across
/// tests running in parallel threads
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Run `f` with HOME pointed into `test_dir` and the given VAULTGEN_*
/// variables set, restoring the original environment afterwards
pub fn with_isolated_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let original_home = std::env::var("HOME").ok();
    let saved: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
        .collect();

    let home = test_dir.path().join("home");
    std::fs::create_dir_all(&home).unwrap();
    std::env::set_var("HOME", &home);
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let result = f(&home);

    if let Some(orig) = original_home {
        std::env::set_var("HOME", orig);
    } else {
        std::env::remove_var("HOME");
    }
    for (key, orig) in saved {
        if let Some(value) = orig {
            std::env::set_var(&key, value);
        } else {
            std::env::remove_var(&key);
        }
    }

    result
}
