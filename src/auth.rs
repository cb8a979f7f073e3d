//! Vault Authentication
//!
//! Exchanges a Kubernetes service account JWT for a Vault client token via
//! the Kubernetes auth backend. The JWT is read fresh from the projected
//! token file on every login, so rotated tokens are picked up without a
//! restart.

use crate::error::BackendError;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Default location of the projected service account token inside a pod
pub const DEFAULT_JWT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Kubernetes auth backend login
pub struct KubernetesAuth {
    role: String,
    mount: String,
    jwt_path: PathBuf,
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: LoginAuth,
}

#[derive(Deserialize)]
struct LoginAuth {
    client_token: String,
}

impl KubernetesAuth {
    pub fn new(role: &str, mount: &str, jwt_path: PathBuf) -> Self {
        Self {
            role: role.to_string(),
            mount: mount.trim_matches('/').to_string(),
            jwt_path,
        }
    }

    /// Exchange the service account JWT for a client token
    pub fn login(&self, http: &Client, address: &str) -> Result<String, BackendError> {
        info!(role = %self.role, mount = %self.mount, "Authenticating via Kubernetes backend");

        let jwt = fs::read_to_string(&self.jwt_path).map_err(|e| {
            BackendError::AuthFailed(format!(
                "cannot read service account token at '{}': {}",
                self.jwt_path.display(),
                e
            ))
        })?;
        let jwt = jwt.trim();
        if jwt.is_empty() {
            return Err(BackendError::AuthFailed(format!(
                "service account token at '{}' is empty",
                self.jwt_path.display()
            )));
        }

        let url = format!(
            "{}/v1/auth/{}/login",
            address.trim_end_matches('/'),
            self.mount
        );
        let response = http
            .post(&url)
            .json(&serde_json::json!({ "role": self.role, "jwt": jwt }))
            .send()
            .map_err(|e| BackendError::Unavailable(format!("login request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::AuthFailed(format!(
                "login as role '{}' rejected with status {}: {}",
                self.role,
                status,
                crate::backend::response_errors(response)
            )));
        }

        let parsed: LoginResponse = response.json().map_err(|e| BackendError::BadResponse {
            path: format!("auth/{}/login", self.mount),
            detail: format!("invalid login payload: {}", e),
        })?;

        debug!("Client token obtained");
        Ok(parsed.auth.client_token)
    }
}
