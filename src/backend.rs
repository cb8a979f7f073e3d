//! Secret Store Backend
//!
//! The port the tree builder consumes (`SecretStore`) plus the concrete
//! HashiCorp Vault KV v2 adapter. The port is deliberately tiny: two blocking
//! read primitives. Absence of data is an empty result; every transport,
//! authentication, or protocol failure is an error and propagates to the
//! caller — a secret that failed to read is never indistinguishable from a
//! legitimately absent one.

use crate::error::BackendError;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::trace;

/// Reserved delimiter: a trailing `/` in a listing entry marks a branch name
pub const BRANCH_DELIMITER: char = '/';

/// Key/value payload stored directly at one path
pub type LeafRecord = BTreeMap<String, String>;

/// Read access to the hierarchical secret namespace
///
/// Both operations are synchronous and blocking. `read_leaf` returns an
/// empty record on confirmed absence; `list_children` returns an empty
/// sequence for leaf-only paths.
pub trait SecretStore {
    /// The key/value payload stored exactly at `path`
    fn read_leaf(&self, path: &str) -> Result<LeafRecord, BackendError>;

    /// Immediate child names of `path`; a name ending in [`BRANCH_DELIMITER`]
    /// denotes a branch
    fn list_children(&self, path: &str) -> Result<Vec<String>, BackendError>;
}

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the blocking HTTP client shared by the auth exchange and all
/// KV calls
pub fn build_http_client(tls_verify: bool) -> Result<Client, BackendError> {
    Client::builder()
        .no_proxy()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(!tls_verify)
        .build()
        .map_err(|e| BackendError::Unavailable(format!("Failed to create HTTP client: {}", e)))
}

/// Client for the Vault KV version 2 secrets engine
pub struct VaultKv2Client {
    http: Client,
    address: String,
    mount: String,
    token: String,
}

impl VaultKv2Client {
    /// Create a client for the KV engine mounted at `mount` on `address`,
    /// using an already-exchanged client token
    pub fn new(http: Client, address: &str, mount: &str, token: String) -> Self {
        Self {
            http,
            address: address.trim_end_matches('/').to_string(),
            mount: mount.trim_matches('/').to_string(),
            token,
        }
    }

    fn data_url(&self, path: &str) -> String {
        format!("{}/v1/{}/data/{}", self.address, self.mount, path)
    }

    fn metadata_url(&self, path: &str) -> String {
        format!("{}/v1/{}/metadata/{}", self.address, self.mount, path)
    }
}

// Vault KV v2 wire shapes. Read payloads nest the secret data one level
// deeper than v1 did.
#[derive(Deserialize)]
struct ReadSecretResponse {
    data: ReadSecretData,
}

#[derive(Deserialize)]
struct ReadSecretData {
    data: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct ListSecretsResponse {
    data: ListSecretsData,
}

#[derive(Deserialize)]
struct ListSecretsData {
    keys: Vec<String>,
}

impl SecretStore for VaultKv2Client {
    fn read_leaf(&self, path: &str) -> Result<LeafRecord, BackendError> {
        trace!(%path, "Reading leaf record");
        let response = self
            .http
            .get(self.data_url(path))
            .header("X-Vault-Token", &self.token)
            .send()
            .map_err(|e| map_transport_error(e, path))?;

        match response.status() {
            // Vault reports "nothing stored here" as 404; that is absence,
            // not a failure.
            StatusCode::NOT_FOUND => {
                trace!(%path, "No secret stored at path");
                Ok(LeafRecord::new())
            }
            status if status.is_success() => {
                let parsed: ReadSecretResponse =
                    response.json().map_err(|e| BackendError::BadResponse {
                        path: path.to_string(),
                        detail: format!("invalid read payload: {}", e),
                    })?;
                Ok(parsed
                    .data
                    .data
                    .into_iter()
                    .map(|(k, v)| (k, coerce_value(v)))
                    .collect())
            }
            StatusCode::FORBIDDEN => Err(BackendError::AuthFailed(format!(
                "read of '{}' denied: {}",
                path,
                response_errors(response)
            ))),
            status => Err(BackendError::Unavailable(format!(
                "read of '{}' failed with status {}: {}",
                path,
                status,
                response_errors(response)
            ))),
        }
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>, BackendError> {
        trace!(%path, "Listing children");
        // LIST semantics via the documented `?list=true` query form, which
        // keeps the client on plain GET.
        let response = self
            .http
            .get(self.metadata_url(path))
            .query(&[("list", "true")])
            .header("X-Vault-Token", &self.token)
            .send()
            .map_err(|e| map_transport_error(e, path))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                trace!(%path, "Path has no children");
                Ok(Vec::new())
            }
            status if status.is_success() => {
                let parsed: ListSecretsResponse =
                    response.json().map_err(|e| BackendError::BadResponse {
                        path: path.to_string(),
                        detail: format!("invalid list payload: {}", e),
                    })?;
                Ok(parsed.data.keys)
            }
            StatusCode::FORBIDDEN => Err(BackendError::AuthFailed(format!(
                "listing of '{}' denied: {}",
                path,
                response_errors(response)
            ))),
            status => Err(BackendError::Unavailable(format!(
                "listing of '{}' failed with status {}: {}",
                path,
                status,
                response_errors(response)
            ))),
        }
    }
}

/// Vault KV payloads are JSON; the data model here is strictly string to
/// string. Strings pass through; any other JSON value keeps its compact
/// JSON text.
fn coerce_value(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Best-effort extraction of Vault's `{"errors": [..]}` body
pub(crate) fn response_errors(response: Response) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        errors: Vec<String>,
    }

    match response.json::<ErrorBody>() {
        Ok(body) if !body.errors.is_empty() => body.errors.join("; "),
        _ => "no error detail".to_string(),
    }
}

/// Map reqwest transport failures to backend errors
fn map_transport_error(error: reqwest::Error, path: &str) -> BackendError {
    if error.is_timeout() {
        BackendError::Unavailable(format!("request for '{}' timed out: {}", path, error))
    } else if error.is_connect() {
        BackendError::Unavailable(format!("connection error for '{}': {}", path, error))
    } else {
        BackendError::Unavailable(format!("transport error for '{}': {}", path, error))
    }
}

// In-memory store for unit tests of the tree builder.
#[cfg(test)]
pub(crate) struct MemoryStore {
    nodes: std::collections::HashMap<String, (LeafRecord, Vec<String>)>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self {
            nodes: std::collections::HashMap::new(),
        }
    }

    pub fn with_node(mut self, path: &str, leaf: &[(&str, &str)], children: &[&str]) -> Self {
        let record: LeafRecord = leaf
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let names: Vec<String> = children.iter().map(|c| c.to_string()).collect();
        self.nodes.insert(path.to_string(), (record, names));
        self
    }
}

#[cfg(test)]
impl SecretStore for MemoryStore {
    fn read_leaf(&self, path: &str) -> Result<LeafRecord, BackendError> {
        Ok(self
            .nodes
            .get(path)
            .map(|(leaf, _)| leaf.clone())
            .unwrap_or_default())
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>, BackendError> {
        Ok(self
            .nodes
            .get(path)
            .map(|(_, children)| children.clone())
            .unwrap_or_default())
    }
}
