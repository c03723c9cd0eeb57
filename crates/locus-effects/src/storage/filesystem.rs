//! Filesystem storage handler
//!
//! One file per key under a base directory. File names are the SHA-256 of the
//! key so callers cannot escape the directory. Writes go to a temp file that
//! is synced and renamed into place; on unix, files are created owner-only.
//!
//! This handler stores bytes as given. Wrap it in `EncryptedStorage` for
//! anything sensitive.

use async_trait::async_trait;
use locus_core::effects::{StorageEffects, StorageError};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const MAX_KEY_LEN: usize = 255;

#[cfg(unix)]
const FILE_MODE: u32 = 0o600;
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

#[derive(Debug, Clone)]
pub struct FilesystemStorageHandler {
    base_path: PathBuf,
}

impl FilesystemStorageHandler {
    /// Create the handler, creating `base_path` if needed.
    pub fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&base_path).map_err(|e| StorageError::ConfigurationError {
            reason: format!("Failed to create storage directory {}: {e}", base_path.display()),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&base_path, std::fs::Permissions::from_mode(DIR_MODE))
                .map_err(|e| StorageError::ConfigurationError {
                    reason: format!("Failed to set directory permissions: {e}"),
                })?;
        }

        info!(path = %base_path.display(), "initialized filesystem storage");
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn validate_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() || key.len() > MAX_KEY_LEN || key.contains('\0') {
            return Err(StorageError::ConfigurationError {
                reason: format!("Invalid storage key '{key}'"),
            });
        }
        Ok(())
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.base_path.join(format!("{}.dat", hex::encode(digest)))
    }

    async fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        let write_failed = |e: std::io::Error| StorageError::WriteFailed {
            reason: e.to_string(),
        };

        let mut file = fs::File::create(&temp_path).await.map_err(write_failed)?;
        file.write_all(data).await.map_err(write_failed)?;
        file.sync_all().await.map_err(write_failed)?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(FILE_MODE))
                .await
                .map_err(write_failed)?;
        }

        fs::rename(&temp_path, path).await.map_err(write_failed)
    }
}

#[async_trait]
impl StorageEffects for FilesystemStorageHandler {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        Self::validate_key(key)?;
        let path = self.key_to_path(key);
        self.write_atomic(&path, &value).await?;
        debug!(key, bytes = value.len(), "stored record");
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Self::validate_key(key)?;
        match fs::read(self.key_to_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                reason: e.to_string(),
            }),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Self::validate_key(key)?;
        match fs::remove_file(self.key_to_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed {
                reason: e.to_string(),
            }),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Self::validate_key(key)?;
        Ok(fs::try_exists(self.key_to_path(key)).await.unwrap_or(false))
    }
}
