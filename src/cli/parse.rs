//! CLI parse: clap types for vaultgen. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vaultgen CLI - Generate local config files from a secret store
#[derive(Parser)]
#[command(name = "vaultgen")]
#[command(about = "Generates config files by pulling secrets from Vault, authenticating with a Kubernetes service account")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Vault server address
    #[arg(long)]
    pub vault_address: Option<String>,

    /// Disable TLS certificate verification
    #[arg(long)]
    pub no_tls_verify: bool,

    /// Role to authenticate as against the Kubernetes auth backend
    #[arg(long)]
    pub role: Option<String>,

    /// Mount point of the Kubernetes auth backend
    #[arg(long)]
    pub auth_mount: Option<String>,

    /// Path to the service account token file
    #[arg(long)]
    pub jwt_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull secrets from a KV backend and write them to a file
    Kv {
        /// Secret path in the KV backend to pull secrets from
        path: String,

        /// Backend KV mount point
        #[arg(short, long)]
        mount: Option<String>,

        /// Output format (env, export, toml)
        #[arg(short, long, default_value = "env")]
        format: String,

        /// Maximum nesting depth below the secret path (toml format only)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Directory where the generated file is written
        #[arg(short = 'g', long)]
        output_dir: Option<PathBuf>,

        /// Name of the generated file
        #[arg(short = 'n', long)]
        output_file: Option<String>,
    },
}
