//! Stack template loaders

use async_trait::async_trait;
use locus_core::effects::ResourceLoaderEffects;
use locus_core::{DomainError, LocusResult};
use std::path::PathBuf;

const BUNDLED_TEMPLATE: &str = include_str!("../templates/locus-stack.yaml");

/// Serves the template compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledTemplateLoader;

impl BundledTemplateLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceLoaderEffects for BundledTemplateLoader {
    async fn stack_template(&self) -> LocusResult<String> {
        Ok(BUNDLED_TEMPLATE.to_string())
    }
}

/// Reads the template from disk on every call.
#[derive(Debug, Clone)]
pub struct FileTemplateLoader {
    path: PathBuf,
}

impl FileTemplateLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ResourceLoaderEffects for FileTemplateLoader {
    async fn stack_template(&self) -> LocusResult<String> {
        let body = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DomainError::invalid_configuration(format!(
                "Failed to read stack template {}: {e}",
                self.path.display()
            ))
        })?;
        if body.trim().is_empty() {
            return Err(DomainError::invalid_configuration(format!(
                "Stack template {} is empty",
                self.path.display()
            )));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use locus_core::ProvisioningError;

    #[tokio::test]
    async fn test_bundled_template_declares_outputs() {
        let body = BundledTemplateLoader::new().stack_template().await.unwrap();
        for output in ["RuntimeAccessKeyId", "RuntimeSecretAccessKey", "BucketName"] {
            assert!(body.contains(output), "missing {output}");
        }
        assert!(body.contains("DeviceBucket"));
    }

    #[tokio::test]
    async fn test_file_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.yaml");
        std::fs::write(&path, "Resources: {}\n").unwrap();
        assert_eq!(
            FileTemplateLoader::new(&path).stack_template().await.unwrap(),
            "Resources: {}\n"
        );

        assert_matches!(
            FileTemplateLoader::new(dir.path().join("missing.yaml"))
                .stack_template()
                .await,
            Err(DomainError::Provisioning(ProvisioningError::InvalidConfiguration { .. }))
        );
    }
}
