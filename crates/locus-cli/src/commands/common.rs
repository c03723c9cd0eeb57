//! Shared setup for command handlers

use anyhow::{Context, Result};
use locus_core::effects::StorageEffects;
use locus_core::LocusConfig;
use locus_effects::{open_encrypted_store, CredentialStoreHandler};
use locus_provisioning::CredentialRepository;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load `path` (defaults when absent) and apply `LOCUS_*` overrides.
pub fn load_config(path: &Path) -> Result<LocusConfig> {
    let mut config = LocusConfig::load(path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    config
        .merge_with_env(std::env::vars())
        .context("applying LOCUS_* environment overrides")?;
    Ok(config)
}

/// Configured data directory, or `<platform data dir>/locus`.
pub fn data_dir(config: &LocusConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.storage.data_dir {
        return Ok(dir.clone());
    }
    dirs::data_dir()
        .map(|dir| dir.join("locus"))
        .context("no platform data directory; set storage.data_dir")
}

/// Encrypted store plus a repository initialized from it.
pub struct Installation {
    pub storage: Arc<dyn StorageEffects>,
    pub repository: CredentialRepository,
}

pub async fn open_installation(config: &LocusConfig) -> Result<Installation> {
    let dir = data_dir(config)?;
    tracing::debug!(data_dir = %dir.display(), "opening encrypted store");

    let storage = open_encrypted_store(&dir)
        .with_context(|| format!("opening encrypted store at {}", dir.display()))?;
    let repository = CredentialRepository::new(Arc::new(CredentialStoreHandler::new(storage.clone())));
    repository
        .initialize()
        .await
        .context("reading stored credentials")?;

    Ok(Installation {
        storage,
        repository,
    })
}
