//! Layer 3: Encrypted Storage Handler
//!
//! Transparent encryption for any `StorageEffects` implementation by composing:
//! - `S: StorageEffects` for the encrypted blobs
//! - `K: StorageEffects` for the master key (kept apart from the blobs)
//! - `RandomEffects` for key and nonce generation
//!
//! Every record is sealed with ChaCha20-Poly1305 under a per-key subkey derived
//! with HKDF-SHA256 from the master key, binding each ciphertext to the key it
//! was stored under.
//!
//! Blob format: `version (1 byte) || nonce (12 bytes) || ciphertext`.
//!
//! A blob that cannot be opened is reported as `StorageError::DecryptionFailed`
//! and is never returned as plaintext. The unencrypted mode only exists in test
//! builds.

use async_trait::async_trait;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use locus_core::effects::{RandomEffects, StorageEffects, StorageError};
use sha2::Sha256;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};
use zeroize::Zeroizing;

/// Nonce size for ChaCha20-Poly1305 (96 bits = 12 bytes)
const NONCE_SIZE: usize = 12;

/// Version byte for encrypted blob format
const BLOB_VERSION: u8 = 0x01;

const MASTER_KEY_SIZE: usize = 32;
const DEFAULT_MASTER_KEY_ID: &str = "locus-master-key";
const SUBKEY_INFO: &[u8] = b"locus-storage-encryption-v1";

type MasterKeyMaterial = Arc<Zeroizing<[u8; MASTER_KEY_SIZE]>>;

/// Configuration for encrypted storage behavior
#[derive(Debug, Clone)]
pub struct EncryptedStorageConfig {
    /// Identifier of the master key inside the key store
    pub master_key_id: String,
    /// Store and read values unencrypted
    #[cfg(any(test, feature = "testing"))]
    pub plaintext: bool,
}

impl Default for EncryptedStorageConfig {
    fn default() -> Self {
        Self {
            master_key_id: DEFAULT_MASTER_KEY_ID.to_string(),
            #[cfg(any(test, feature = "testing"))]
            plaintext: false,
        }
    }
}

impl EncryptedStorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_master_key_id(mut self, id: impl Into<String>) -> Self {
        self.master_key_id = id.into();
        self
    }

    /// Disable encryption entirely. Test builds only.
    #[cfg(any(test, feature = "testing"))]
    pub fn plaintext() -> Self {
        Self {
            plaintext: true,
            ..Self::default()
        }
    }

    fn is_plaintext(&self) -> bool {
        #[cfg(any(test, feature = "testing"))]
        {
            self.plaintext
        }
        #[cfg(not(any(test, feature = "testing")))]
        {
            false
        }
    }
}

/// Encrypted storage wrapping an inner blob store and a key store.
pub struct EncryptedStorage<S, K>
where
    S: StorageEffects,
    K: StorageEffects,
{
    inner: S,
    keys: K,
    random: Arc<dyn RandomEffects>,
    /// Cached master key (lazily loaded/created on first use).
    master_key: RwLock<Option<MasterKeyMaterial>>,
    /// Single-flight guard for master-key initialization.
    master_key_init: Mutex<()>,
    config: EncryptedStorageConfig,
}

impl<S, K> EncryptedStorage<S, K>
where
    S: StorageEffects,
    K: StorageEffects,
{
    /// Create a new encrypted storage handler.
    ///
    /// The master key is loaded or created on the first operation, keeping
    /// construction synchronous.
    pub fn new(
        inner: S,
        keys: K,
        random: Arc<dyn RandomEffects>,
        config: EncryptedStorageConfig,
    ) -> Self {
        Self {
            inner,
            keys,
            random,
            master_key: RwLock::new(None),
            master_key_init: Mutex::new(()),
            config,
        }
    }

    async fn get_or_init_master_key(&self) -> Result<MasterKeyMaterial, StorageError> {
        if let Some(key) = self.master_key.read().await.clone() {
            return Ok(key);
        }

        let _guard = self.master_key_init.lock().await;
        if let Some(key) = self.master_key.read().await.clone() {
            return Ok(key);
        }

        let key_id = self.config.master_key_id.as_str();
        let key_bytes = match self.keys.retrieve(key_id).await? {
            Some(existing) => Zeroizing::new(existing),
            None => {
                let generated = Zeroizing::new(self.random.random_bytes(MASTER_KEY_SIZE).await);
                if generated.len() != MASTER_KEY_SIZE {
                    return Err(StorageError::ConfigurationError {
                        reason: "Failed to generate 32-byte master key".to_string(),
                    });
                }
                self.keys.store(key_id, generated.to_vec()).await?;
                info!("created storage master key");
                generated
            }
        };

        // A malformed key would make every record unreadable; refuse rather
        // than regenerate over it.
        let key: [u8; MASTER_KEY_SIZE] = key_bytes.as_slice().try_into().map_err(|_| {
            error!(len = key_bytes.len(), "stored master key has wrong length");
            StorageError::corrupted("master key has wrong length")
        })?;

        let key = Arc::new(Zeroizing::new(key));
        *self.master_key.write().await = Some(key.clone());
        Ok(key)
    }

    /// Derive the per-key encryption key.
    async fn derive_encryption_key(
        &self,
        storage_key: &str,
    ) -> Result<Zeroizing<[u8; 32]>, StorageError> {
        let master_key = self.get_or_init_master_key().await?;
        let hk = Hkdf::<Sha256>::new(Some(storage_key.as_bytes()), master_key.as_slice());
        let mut okm = Zeroizing::new([0u8; 32]);
        hk.expand(SUBKEY_INFO, okm.as_mut_slice())
            .map_err(|e| StorageError::EncryptionFailed {
                reason: format!("Key derivation failed: {e}"),
            })?;
        Ok(okm)
    }

    async fn encrypt(&self, key: &str, data: &[u8]) -> Result<Vec<u8>, StorageError> {
        let encryption_key = self.derive_encryption_key(key).await?;

        let nonce_bytes = self.random.random_bytes(NONCE_SIZE).await;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(StorageError::EncryptionFailed {
                reason: "Failed to generate nonce".to_string(),
            });
        }

        let cipher = ChaCha20Poly1305::new(Key::from_slice(encryption_key.as_slice()));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), data)
            .map_err(|e| StorageError::EncryptionFailed {
                reason: e.to_string(),
            })?;

        let mut blob = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
        blob.push(BLOB_VERSION);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    async fn decrypt(&self, key: &str, blob: &[u8]) -> Result<Vec<u8>, StorageError> {
        let Some((&version, rest)) = blob.split_first() else {
            return Err(StorageError::DecryptionFailed {
                reason: "Blob is empty".to_string(),
            });
        };
        if version != BLOB_VERSION {
            return Err(StorageError::DecryptionFailed {
                reason: format!("Unknown blob version: {version}"),
            });
        }
        if rest.len() < NONCE_SIZE {
            return Err(StorageError::DecryptionFailed {
                reason: "Blob too short".to_string(),
            });
        }

        let encryption_key = self.derive_encryption_key(key).await?;
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(encryption_key.as_slice()));
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                error!(key, "record failed authentication");
                StorageError::DecryptionFailed {
                    reason: format!("Record '{key}' failed authentication"),
                }
            })
    }

    /// Check if a blob carries the current version header.
    pub fn is_encrypted(blob: &[u8]) -> bool {
        blob.first() == Some(&BLOB_VERSION)
    }

    /// Inner blob store (for inspection in tests).
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S, K> StorageEffects for EncryptedStorage<S, K>
where
    S: StorageEffects,
    K: StorageEffects,
{
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        if self.config.is_plaintext() {
            return self.inner.store(key, value).await;
        }
        let value = Zeroizing::new(value);
        let encrypted = self.encrypt(key, &value).await?;
        self.inner.store(key, encrypted).await
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let Some(blob) = self.inner.retrieve(key).await? else {
            return Ok(None);
        };
        if self.config.is_plaintext() {
            return Ok(Some(blob));
        }
        self.decrypt(key, &blob).await.map(Some)
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.remove(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.exists(key).await
    }
}

// Debug impl that doesn't expose the master key
impl<S, K> std::fmt::Debug for EncryptedStorage<S, K>
where
    S: StorageEffects + std::fmt::Debug,
    K: StorageEffects,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedStorage")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}
