//! `locus import-credentials`

use super::common::open_installation;
use anyhow::{Context, Result};
use locus_core::{BootstrapCredentials, LocusConfig};
use locus_provisioning::CredentialRepository;
use std::io::Read;
use std::path::Path;

pub async fn run(config: &LocusConfig, file: Option<&Path>, region: Option<&str>) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading credentials from stdin")?;
            text
        }
    };

    let region = region.unwrap_or(&config.provisioning.default_region);
    let installation = open_installation(config).await?;
    let creds = import(&installation.repository, &text, region).await?;

    println!(
        "Stored bootstrap credentials {} for {}",
        creds.access_key_id, creds.region
    );
    println!("Auth state: {:?}", installation.repository.current_auth_state());
    Ok(())
}

/// Parse pasted JSON and persist it as the bootstrap record.
pub async fn import(
    repository: &CredentialRepository,
    text: &str,
    default_region: &str,
) -> Result<BootstrapCredentials> {
    let creds = BootstrapCredentials::from_json(text, default_region)
        .context("credentials JSON must contain AccessKeyId, SecretAccessKey and SessionToken")?;
    repository
        .save_bootstrap_credentials(&creds)
        .await
        .context("saving bootstrap credentials")?;
    tracing::info!(access_key_id = %creds.access_key_id, "bootstrap credentials imported");
    Ok(creds)
}
