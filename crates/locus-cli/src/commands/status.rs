//! `locus status`

use super::common::open_installation;
use anyhow::{Context, Result};
use locus_core::{AuthState, LocusConfig};
use locus_provisioning::{read_job, JobMode, JobStatus};

pub async fn show_status(config: &LocusConfig) -> Result<()> {
    let installation = open_installation(config).await?;
    let repository = &installation.repository;

    let auth = repository.current_auth_state();
    println!("Auth state:       {auth:?}");
    println!("Onboarding stage: {:?}", repository.onboarding_stage().await);

    if auth == AuthState::Authenticated {
        let runtime = repository
            .get_runtime_credentials()
            .await
            .context("reading runtime credentials")?;
        println!("Bucket:           {} ({})", runtime.bucket_name, runtime.region);
        println!("Account:          {}", runtime.account_id);
    }

    match read_job(installation.storage.as_ref())
        .await
        .context("reading provisioning job")?
    {
        Some(job) => {
            let target = match &job.mode {
                JobMode::NewDevice { device_name } => format!("new device '{device_name}'"),
                JobMode::Recovery { bucket_name } => format!("recovery of '{bucket_name}'"),
            };
            let status = match &job.status {
                JobStatus::Failed { error } => format!("failed: {error}"),
                other => format!("{other:?}").to_lowercase(),
            };
            println!("Provisioning job: {target}, attempt {}, {status}", job.attempt);
        }
        None => println!("Provisioning job: none"),
    }

    Ok(())
}
