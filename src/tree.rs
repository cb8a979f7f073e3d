//! Tree builder for materializing hierarchical secret namespaces
//!
//! Walks a subtree of the secret store with an explicit worklist, then
//! assembles the collected records bottom-up into a [`SecretTree`]. Listings
//! that name the same child both bare and with a trailing delimiter collapse
//! into one traversal, and when a path stores a key under the same name as
//! one of its child branches, the directly stored value wins.

use crate::backend::{LeafRecord, SecretStore, BRANCH_DELIMITER};
use crate::error::BackendError;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Upper bound on nesting below the subtree root
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// A materialized value: either a scalar stored at a path, or a nested
/// branch of further values
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum SecretValue {
    Scalar(String),
    Branch(SecretTree),
}

/// Nested, key-sorted view of a secret subtree
pub type SecretTree = BTreeMap<String, SecretValue>;

/// One visited path: its own key/value payload and its deduplicated
/// child names
struct PathEntry {
    path: String,
    own: LeafRecord,
    children: Vec<String>,
}

#[derive(Default)]
struct ListedForms {
    bare: bool,
    delimited: bool,
}

/// Tree builder over any [`SecretStore`]
pub struct TreeBuilder<'a, S: SecretStore> {
    store: &'a S,
    max_depth: usize,
}

impl<'a, S: SecretStore> TreeBuilder<'a, S> {
    /// Create a builder with the default depth bound
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Override the depth bound
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Materialize the subtree rooted at `root`
    ///
    /// Every visited path is read and listed exactly once. Any backend
    /// failure aborts the build; a partially fetched tree is never returned.
    #[instrument(skip(self))]
    pub fn build(&self, root: &str) -> Result<SecretTree, BackendError> {
        let start = Instant::now();
        info!("Starting secret tree build");

        // Phase 1: walk the namespace depth-first and collect one entry per
        // path. Children are pushed in reverse so pops come out in sorted
        // order, which keeps the traversal deterministic.
        let root = root.trim_end_matches(BRANCH_DELIMITER);
        let mut worklist: Vec<(String, usize)> = vec![(root.to_string(), 0)];
        let mut entries: Vec<PathEntry> = Vec::new();

        while let Some((path, depth)) = worklist.pop() {
            let own = self.store.read_leaf(&path)?;
            let listed = self.store.list_children(&path)?;
            let children = dedupe_listing(&path, listed)?;

            if !children.is_empty() && depth + 1 > self.max_depth {
                return Err(BackendError::MalformedListing {
                    path,
                    detail: format!("nesting exceeds maximum depth {}", self.max_depth),
                });
            }

            for child in children.iter().rev() {
                worklist.push((join_path(&path, child), depth + 1));
            }
            entries.push(PathEntry {
                path,
                own,
                children,
            });
        }

        // Phase 2: assemble bottom-up. Entries are in depth-first pre-order,
        // so walking them in reverse guarantees every child subtree exists
        // before its parent is assembled.
        let mut subtrees: HashMap<String, SecretTree> = HashMap::new();

        for entry in entries.iter().rev() {
            let mut tree = SecretTree::new();

            for child in &entry.children {
                let child_path = join_path(&entry.path, child);
                let subtree = subtrees.remove(&child_path).ok_or_else(|| {
                    error!(path = %child_path, "Subtree missing during assembly");
                    BackendError::BadResponse {
                        path: child_path.clone(),
                        detail: "subtree missing during assembly".to_string(),
                    }
                })?;
                tree.insert(child.clone(), SecretValue::Branch(subtree));
            }

            // Directly stored keys land last: on a name collision the leaf
            // value replaces the branch.
            for (key, value) in &entry.own {
                if tree.contains_key(key) {
                    warn!(
                        path = %entry.path,
                        key = %key,
                        "Leaf key shadows a child branch of the same name"
                    );
                }
                tree.insert(key.clone(), SecretValue::Scalar(value.clone()));
            }

            subtrees.insert(entry.path.clone(), tree);
        }

        let tree = subtrees.remove(root).ok_or_else(|| {
            error!(path = %root, "Root subtree missing during assembly");
            BackendError::BadResponse {
                path: root.to_string(),
                detail: "root subtree missing during assembly".to_string(),
            }
        })?;

        let duration = start.elapsed();
        info!(
            paths_visited = entries.len(),
            duration_ms = duration.as_millis(),
            "Secret tree build completed"
        );

        Ok(tree)
    }
}

/// Collapse a raw listing into one sorted traversal name per child
///
/// A child listed both bare and with a trailing delimiter is a single child;
/// the result is independent of listing order. Names that are empty after
/// stripping, are `.` or `..`, or contain an embedded delimiter reject the
/// whole listing.
fn dedupe_listing(path: &str, listed: Vec<String>) -> Result<Vec<String>, BackendError> {
    let mut forms: BTreeMap<String, ListedForms> = BTreeMap::new();

    for name in listed {
        let (stripped, is_branch) = match name.strip_suffix(BRANCH_DELIMITER) {
            Some(stripped) => (stripped, true),
            None => (name.as_str(), false),
        };

        if stripped.is_empty() {
            return Err(BackendError::MalformedListing {
                path: path.to_string(),
                detail: format!("listing entry '{}' has an empty name", name),
            });
        }
        if stripped == "." || stripped == ".." {
            return Err(BackendError::MalformedListing {
                path: path.to_string(),
                detail: format!("listing entry '{}' is a traversal name", name),
            });
        }
        if stripped.contains(BRANCH_DELIMITER) {
            return Err(BackendError::MalformedListing {
                path: path.to_string(),
                detail: format!("listing entry '{}' contains an embedded delimiter", name),
            });
        }

        let entry = forms.entry(stripped.to_string()).or_default();
        if is_branch {
            entry.delimited = true;
        } else {
            entry.bare = true;
        }
    }

    for (child, listed_as) in &forms {
        if listed_as.bare && listed_as.delimited {
            debug!(%path, %child, "Child listed in both forms, traversing once");
        }
    }

    Ok(forms.into_keys().collect())
}

fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}{}{}", parent, BRANCH_DELIMITER, child)
    }
}
