//! In-memory blob store for testing and single-process deployments

use crate::{BlobStore, BlobStoreError, Locator, Result};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;

/// An in-memory blob store
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<DashMap<Locator, Bytes>>,
}

impl MemoryBlobStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of blobs stored
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Get total size of all blobs
    pub fn total_size(&self) -> u64 {
        self.blobs.iter().map(|entry| entry.value().len() as u64).sum()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: &[u8]) -> Result<Locator> {
        let locator = Locator::for_content(data);
        self.blobs
            .entry(locator.clone())
            .or_insert_with(|| Bytes::copy_from_slice(data));
        Ok(locator)
    }

    async fn get(&self, locator: &Locator) -> Result<Bytes> {
        self.blobs
            .get(locator)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BlobStoreError::NotFound(locator.clone()))
    }

    async fn has(&self, locator: &Locator) -> Result<bool> {
        Ok(self.blobs.contains_key(locator))
    }

    async fn delete(&self, locator: &Locator) -> Result<()> {
        self.blobs.remove(locator);
        Ok(())
    }

    async fn size(&self, locator: &Locator) -> Result<u64> {
        self.blobs
            .get(locator)
            .map(|entry| entry.value().len() as u64)
            .ok_or_else(|| BlobStoreError::NotFound(locator.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryBlobStore::new();
        let locator = store.put(b"encrypted bytes").await.unwrap();

        assert!(store.has(&locator).await.unwrap());
        assert_eq!(store.get(&locator).await.unwrap(), Bytes::from_static(b"encrypted bytes"));
        assert_eq!(store.size(&locator).await.unwrap(), 15);

        store.delete(&locator).await.unwrap();
        assert!(!store.has(&locator).await.unwrap());
        assert!(matches!(store.get(&locator).await, Err(BlobStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_identical_content_deduplicated() {
        let store = MemoryBlobStore::new();
        let a = store.put(b"same").await.unwrap();
        let b = store.put(b"same").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_size(), 4);
    }
}
