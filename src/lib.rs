//! Vaultgen: Secret File Generation from Vault
//!
//! Pulls secrets from a HashiCorp Vault KV v2 engine, authenticating with a
//! Kubernetes service account, and renders them to a local config file in
//! env, export, or nested TOML form.

pub mod auth;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod render;
pub mod tree;
pub mod writer;
