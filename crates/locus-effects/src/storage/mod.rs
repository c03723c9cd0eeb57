//! Byte-level storage handlers

mod filesystem;
mod memory;

pub use filesystem::FilesystemStorageHandler;
pub use memory::MemoryStorageHandler;

use crate::encrypted_storage::{EncryptedStorage, EncryptedStorageConfig};
use crate::random::RealRandomHandler;
use locus_core::effects::{StorageEffects, StorageError};
use std::path::Path;
use std::sync::Arc;

/// Subdirectory holding encrypted records.
pub const RECORDS_DIR: &str = "records";
/// Subdirectory holding the master key.
pub const KEYS_DIR: &str = "keys";

/// Encrypted on-disk store rooted at `data_dir`.
///
/// Records and the master key live in sibling directories so the key
/// directory can be placed on a more restricted mount.
pub fn open_encrypted_store(data_dir: &Path) -> Result<Arc<dyn StorageEffects>, StorageError> {
    let records = FilesystemStorageHandler::new(data_dir.join(RECORDS_DIR))?;
    let keys = FilesystemStorageHandler::new(data_dir.join(KEYS_DIR))?;
    Ok(Arc::new(EncryptedStorage::new(
        records,
        keys,
        Arc::new(RealRandomHandler::new()),
        EncryptedStorageConfig::default(),
    )))
}
