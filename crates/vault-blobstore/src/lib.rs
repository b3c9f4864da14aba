//! # Vault Blobstore
//!
//! Storage for encrypted file content. Blobs are opaque ciphertext; the
//! store never sees keys or plaintext.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Vault (core)               │
//! ├─────────────────────────────────────────┤
//! │            BlobStore Trait              │
//! ├────────────────────┬────────────────────┤
//! │  MemoryBlobStore   │   FsBlobStore      │
//! └────────────────────┴────────────────────┘
//! ```
//!
//! Blobs are content-addressed: the [`Locator`] is the BLAKE3 hash of the
//! ciphertext, so storing identical bytes twice yields one blob.

pub mod error;
pub mod fs;
pub mod memory;

pub use error::{BlobStoreError, Result};
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Length of a locator in hex characters
pub const LOCATOR_LEN: usize = 64;

/// Opaque reference to a stored blob
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    /// Content address of `data`
    pub fn for_content(data: &[u8]) -> Self {
        Self(blake3::hash(data).to_hex().to_string())
    }

    /// Parse and validate a locator string
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != LOCATOR_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(BlobStoreError::InvalidLocator(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// The locator string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for blob storage backends
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return their locator
    async fn put(&self, data: &[u8]) -> Result<Locator>;

    /// Retrieve bytes by locator
    async fn get(&self, locator: &Locator) -> Result<Bytes>;

    /// Check if a blob exists
    async fn has(&self, locator: &Locator) -> Result<bool>;

    /// Delete a blob; deleting a missing blob is not an error
    async fn delete(&self, locator: &Locator) -> Result<()>;

    /// Blob size without retrieving content
    async fn size(&self, locator: &Locator) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_is_content_address() {
        let a = Locator::for_content(b"ciphertext");
        let b = Locator::for_content(b"ciphertext");
        let c = Locator::for_content(b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), LOCATOR_LEN);
    }

    #[test]
    fn test_locator_parse() {
        let locator = Locator::for_content(b"x");
        assert_eq!(Locator::parse(locator.as_str()).unwrap(), locator);
        assert!(Locator::parse("../../etc/passwd").is_err());
        assert!(Locator::parse("abc").is_err());
    }
}
