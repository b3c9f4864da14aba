//! Vault configuration

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use vault_blobstore::{BlobStore, FsBlobStore, MemoryBlobStore};
use vault_crypto::PBKDF2_ITERATIONS;

/// Where ciphertext blobs are kept
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum BlobStoreKind {
    /// In-memory store (for testing/development)
    #[default]
    Memory,
    /// One file per blob under the given directory
    Filesystem(PathBuf),
}

impl BlobStoreKind {
    /// Open the configured store
    pub async fn open(&self) -> Result<Arc<dyn BlobStore>> {
        Ok(match self {
            BlobStoreKind::Memory => Arc::new(MemoryBlobStore::new()),
            BlobStoreKind::Filesystem(root) => Arc::new(FsBlobStore::open(root).await?),
        })
    }
}

/// Vault configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// PBKDF2 iterations for sealing new private keys
    pub kdf_iterations: u32,
    /// Blob store backend
    pub blob_store: BlobStoreKind,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: PBKDF2_ITERATIONS,
            blob_store: BlobStoreKind::Memory,
        }
    }
}

impl VaultConfig {
    /// Reject settings the vault cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.kdf_iterations == 0 {
            return Err(CoreError::Configuration(
                "kdf_iterations must be at least 1".to_string(),
            ));
        }
        if let BlobStoreKind::Filesystem(root) = &self.blob_store {
            if root.as_os_str().is_empty() {
                return Err(CoreError::Configuration(
                    "filesystem blob store needs a path".to_string(),
                ));
            }
        }
        Ok(())
    }
}
