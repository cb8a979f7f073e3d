//! Configuration System
//!
//! Layered configuration with file and environment sources. Precedence, from
//! lowest to highest: built-in defaults, the global file at
//! `$HOME/.config/vaultgen/config.toml`, `vaultgen.toml` in the working
//! directory, environment variables (`VAULTGEN_VAULT__ADDRESS` and friends),
//! and finally CLI flags applied by the run context. `--config PATH` bypasses
//! the layering and loads exactly one file.

use crate::error::AppError;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultgenConfig {
    /// Vault server connection and authentication
    #[serde(default)]
    pub vault: VaultConfig,

    /// KV engine settings
    #[serde(default)]
    pub kv: KvConfig,

    /// Output file settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Vault server connection and Kubernetes auth settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Vault server address
    #[serde(default = "default_address")]
    pub address: String,

    /// Verify TLS certificates when talking to the server
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Role to validate against the Vault Kubernetes auth backend
    #[serde(default)]
    pub role: Option<String>,

    /// Mount point of the Kubernetes auth method
    #[serde(default = "default_auth_mount")]
    pub auth_mount: String,

    /// Path to the service-account JWT used for the login exchange
    #[serde(default = "default_jwt_path")]
    pub jwt_path: PathBuf,
}

/// KV engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    /// Mount point of the KV v2 secrets engine
    #[serde(default = "default_kv_mount")]
    pub mount: String,

    /// Maximum namespace depth materialized by structured fetches
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Output file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the generated file is written into (must already exist)
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Name of the generated secrets file
    #[serde(default = "default_filename")]
    pub filename: String,
}

fn default_address() -> String {
    "http://127.0.0.1:8200".to_string()
}

fn default_true() -> bool {
    true
}

fn default_auth_mount() -> String {
    "kubernetes".to_string()
}

fn default_jwt_path() -> PathBuf {
    PathBuf::from("/var/run/secrets/kubernetes.io/serviceaccount/token")
}

fn default_kv_mount() -> String {
    "kv".to_string()
}

fn default_max_depth() -> usize {
    crate::tree::DEFAULT_MAX_DEPTH
}

fn default_filename() -> String {
    "secrets.conf".to_string()
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            tls_verify: default_true(),
            role: None,
            auth_mount: default_auth_mount(),
            jwt_path: default_jwt_path(),
        }
    }
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            mount: default_kv_mount(),
            max_depth: default_max_depth(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            filename: default_filename(),
        }
    }
}

impl Default for VaultgenConfig {
    fn default() -> Self {
        Self {
            vault: VaultConfig::default(),
            kv: KvConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Vault(String),
    Kv(String),
    Output(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Vault(msg) => write!(f, "vault: {}", msg),
            ValidationError::Kv(msg) => write!(f, "kv: {}", msg),
            ValidationError::Output(msg) => write!(f, "output: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl VaultConfig {
    /// Validate the Vault connection settings
    pub fn validate(&self) -> Result<(), String> {
        if self.address.is_empty() {
            return Err("address cannot be empty".to_string());
        }
        let url = reqwest::Url::parse(&self.address)
            .map_err(|e| format!("address '{}' is not a valid URL: {}", self.address, e))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(format!(
                    "address '{}' has unsupported scheme '{}' (must be http or https)",
                    self.address, other
                ));
            }
        }
        if self.auth_mount.is_empty() {
            return Err("auth_mount cannot be empty".to_string());
        }
        Ok(())
    }
}

impl KvConfig {
    /// Validate the KV engine settings
    pub fn validate(&self) -> Result<(), String> {
        if self.mount.is_empty() {
            return Err("mount cannot be empty".to_string());
        }
        if self.max_depth == 0 {
            return Err("max_depth must be at least 1".to_string());
        }
        Ok(())
    }
}

impl OutputConfig {
    /// Validate the output file settings
    pub fn validate(&self) -> Result<(), String> {
        if self.filename.is_empty() {
            return Err("filename cannot be empty".to_string());
        }
        if self.filename.contains('/') {
            return Err(format!(
                "filename '{}' must not contain path separators",
                self.filename
            ));
        }
        Ok(())
    }
}

impl VaultgenConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.vault.validate() {
            errors.push(ValidationError::Vault(e));
        }
        if let Err(e) = self.kv.validate() {
            errors.push(ValidationError::Kv(e));
        }
        if let Err(e) = self.output.validate() {
            errors.push(ValidationError::Output(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loader for the layered file/env sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Name of the working-directory configuration file
    pub const LOCAL_FILE: &'static str = "vaultgen.toml";

    /// Path to the global config file, if HOME is set
    pub fn global_config_path() -> Option<PathBuf> {
        std::env::var("HOME").ok().map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("vaultgen")
                .join("config.toml")
        })
    }

    /// Load configuration with full layering relative to `working_dir`
    pub fn load(working_dir: &Path) -> Result<VaultgenConfig, AppError> {
        let mut builder = Config::builder();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(
                    File::from(global_path.as_path()).required(false),
                );
            } else {
                debug!(
                    config_path = %global_path.display(),
                    "No global configuration file; using defaults"
                );
            }
        }

        let local_path = working_dir.join(Self::LOCAL_FILE);
        builder = builder.add_source(File::from(local_path.as_path()).required(false));

        builder = builder.add_source(
            Environment::with_prefix("VAULTGEN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?.try_deserialize::<VaultgenConfig>()?;
        Ok(config)
    }

    /// Load configuration from exactly one file, bypassing the layering
    pub fn load_from_file(path: &Path) -> Result<VaultgenConfig, AppError> {
        let config = Config::builder()
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize::<VaultgenConfig>()?;
        Ok(config)
    }
}
