//! Byte-level key/value storage port

use async_trait::async_trait;

/// Storage failures.
///
/// `DecryptionFailed` and `Corrupted` mean a record exists but cannot be
/// read; callers must treat them as fatal rather than as "absent".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("Read failed: {reason}")]
    ReadFailed { reason: String },

    #[error("Write failed: {reason}")]
    WriteFailed { reason: String },

    #[error("Delete failed: {reason}")]
    DeleteFailed { reason: String },

    #[error("Storage misconfigured: {reason}")]
    ConfigurationError { reason: String },

    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    #[error("Decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    #[error("Record corrupted: {reason}")]
    Corrupted { reason: String },
}

impl StorageError {
    pub fn corrupted(reason: impl Into<String>) -> Self {
        Self::Corrupted {
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait StorageEffects: Send + Sync {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns whether a value was present.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.retrieve(key).await?.is_some())
    }
}
