//! Template loader fake

use async_trait::async_trait;
use locus_core::effects::ResourceLoaderEffects;
use locus_core::{DomainError, LocusResult};

#[derive(Debug, Clone)]
pub struct StaticTemplateLoader {
    body: Option<String>,
}

impl StaticTemplateLoader {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }

    /// Loader whose every call fails.
    pub fn failing() -> Self {
        Self { body: None }
    }
}

impl Default for StaticTemplateLoader {
    fn default() -> Self {
        Self::new("AWSTemplateFormatVersion: \"2010-09-09\"\nResources: {}\n")
    }
}

#[async_trait]
impl ResourceLoaderEffects for StaticTemplateLoader {
    async fn stack_template(&self) -> LocusResult<String> {
        self.body
            .clone()
            .ok_or_else(|| DomainError::invalid_configuration("Template not found"))
    }
}
