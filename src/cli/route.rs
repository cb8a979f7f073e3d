//! CLI route: single route table and run context. Dispatches to domain services.

use crate::auth::KubernetesAuth;
use crate::backend::{self, SecretStore, VaultKv2Client};
use crate::cli::parse::{Cli, Commands};
use crate::config::{ConfigLoader, VaultgenConfig};
use crate::error::AppError;
use crate::render::{self, OutputFormat};
use crate::tree::{SecretTree, SecretValue, TreeBuilder};
use crate::writer;
use std::path::{Path, PathBuf};
use tracing::info;

/// Runtime context for CLI execution: resolved configuration only.
/// Built from the parsed CLI using ConfigLoader, with flags applied on top.
#[derive(Debug)]
pub struct RunContext {
    config: VaultgenConfig,
}

impl RunContext {
    /// Create a run context from the parsed CLI. Loads layered configuration
    /// (or the single file named by `--config`), then applies flag overrides
    /// and validates the result.
    pub fn new(cli: &Cli) -> Result<Self, AppError> {
        let mut config = if let Some(ref path) = cli.config {
            ConfigLoader::load_from_file(path)?
        } else {
            let working_dir = std::env::current_dir()?;
            ConfigLoader::load(&working_dir)?
        };

        if let Some(ref address) = cli.vault_address {
            config.vault.address = address.clone();
        }
        if cli.no_tls_verify {
            config.vault.tls_verify = false;
        }
        if let Some(ref role) = cli.role {
            config.vault.role = Some(role.clone());
        }
        if let Some(ref auth_mount) = cli.auth_mount {
            config.vault.auth_mount = auth_mount.clone();
        }
        if let Some(ref jwt_path) = cli.jwt_path {
            config.vault.jwt_path = jwt_path.clone();
        }

        if let Err(errors) = config.validate() {
            let details = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AppError::ConfigError(details));
        }

        Ok(Self { config })
    }

    /// Resolved configuration backing this context.
    pub fn config(&self) -> &VaultgenConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, AppError> {
        match command {
            Commands::Kv {
                path,
                mount,
                format,
                max_depth,
                output_dir,
                output_file,
            } => self.run_kv(
                path,
                mount.as_deref(),
                format,
                *max_depth,
                output_dir.as_deref(),
                output_file.as_deref(),
            ),
        }
    }

    fn run_kv(
        &self,
        path: &str,
        mount: Option<&str>,
        format: &str,
        max_depth: Option<usize>,
        output_dir: Option<&Path>,
        output_file: Option<&str>,
    ) -> Result<String, AppError> {
        let format: OutputFormat = format.parse().map_err(AppError::ConfigError)?;

        let path = path.trim_matches('/');
        if path.is_empty() {
            return Err(AppError::ConfigError(
                "secret path must not be empty".to_string(),
            ));
        }

        let mount = mount.unwrap_or(&self.config.kv.mount);
        let max_depth = max_depth.unwrap_or(self.config.kv.max_depth);
        let output_dir: PathBuf = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => self.config.output.dir.clone().ok_or_else(|| {
                AppError::ConfigError(
                    "no output directory configured; pass --output-dir or set [output] dir"
                        .to_string(),
                )
            })?,
        };
        let output_file = output_file.unwrap_or(&self.config.output.filename);

        let role = self.config.vault.role.as_deref().ok_or_else(|| {
            AppError::ConfigError(
                "no Vault role configured; pass --role or set [vault] role".to_string(),
            )
        })?;

        info!(%path, %mount, %format, "Grabbing secrets from KV");

        let http = backend::build_http_client(self.config.vault.tls_verify)?;
        let auth = KubernetesAuth::new(
            role,
            &self.config.vault.auth_mount,
            self.config.vault.jwt_path.clone(),
        );
        let token = auth.login(&http, &self.config.vault.address)?;
        let client = VaultKv2Client::new(http, &self.config.vault.address, mount, token);

        let tree: SecretTree = if format.supports_nesting() {
            info!("Generating structured secrets");
            TreeBuilder::new(&client)
                .with_max_depth(max_depth)
                .build(path)?
        } else {
            // Flat formats read exactly the addressed record; no traversal.
            info!("Generating flat key/value secrets");
            client
                .read_leaf(path)?
                .into_iter()
                .map(|(key, value)| (key, SecretValue::Scalar(value)))
                .collect()
        };

        let rendered = render::render(&tree, format)?;
        let written = writer::write_output_file(&output_dir, output_file, &rendered)?;

        Ok(format!(
            "Generated {} ({} top-level keys, {} format)",
            written.display(),
            tree.len(),
            format
        ))
    }
}
