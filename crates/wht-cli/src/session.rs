//! # Session
//!
//! Everything a subcommand needs before it can touch the engine: the YAML
//! configuration, the JSON store snapshot, and the HTTP collaborators built
//! from the environment. The snapshot is written back when the session
//! closes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use wht_audit::AuditEngine;
use wht_client::{BenchmarkRateSource, ClientConfig, FiscalRegistry, WhtClient};
use wht_core::{AuditConfig, SystemClock};
use wht_store::MemoryStore;

/// Default snapshot location when `--store` is not given.
pub const DEFAULT_STORE_PATH: &str = "wht-store.json";

/// Global options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub store_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub json: bool,
}

impl CliContext {
    pub fn config(&self) -> Result<AuditConfig> {
        load_config(self.config_path.as_deref())
    }
}

/// Read and validate an [`AuditConfig`] from YAML. No path means defaults.
pub fn load_config(path: Option<&Path>) -> Result<AuditConfig> {
    let Some(path) = path else {
        return Ok(AuditConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: AuditConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// An open store plus the engine wired over it.
pub struct Session {
    pub store: MemoryStore,
    pub engine: AuditEngine,
    store_path: PathBuf,
}

impl Session {
    pub fn open(ctx: &CliContext) -> Result<Self> {
        let config = ctx.config()?;
        let store = MemoryStore::open(&ctx.store_path)
            .with_context(|| format!("failed to open store {}", ctx.store_path.display()))?;

        let client_config = ClientConfig::from_env().context("invalid client environment")?;
        tracing::debug!(config = ?client_config, "client configuration");
        let client = WhtClient::new(client_config).context("failed to build HTTP clients")?;
        let registry: Arc<dyn FiscalRegistry> = Arc::new(client.registry().clone());
        let rates: Arc<dyn BenchmarkRateSource> = Arc::new(client.rates().clone());

        let engine = AuditEngine::new(
            Arc::new(store.clone()),
            registry,
            rates,
            Arc::new(SystemClock),
            config,
        )?;

        Ok(Self {
            store,
            engine,
            store_path: ctx.store_path.clone(),
        })
    }

    /// Persist the snapshot.
    pub fn close(self) -> Result<()> {
        self.store
            .save(&self.store_path)
            .with_context(|| format!("failed to save store {}", self.store_path.display()))?;
        tracing::debug!(path = %self.store_path.display(), "store saved");
        Ok(())
    }
}

/// Print `value` as pretty JSON, or the human rendering.
pub fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", human());
    }
    Ok(())
}
