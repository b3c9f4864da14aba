//! Filesystem-backed blob store
//!
//! Blobs live at `<root>/<first two hex chars>/<locator>`. Writes go to a
//! uniquely named temporary file first and are renamed into place, so
//! concurrent writers of the same content never share a temp path.

use crate::{BlobStore, BlobStoreError, Locator, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// A blob store rooted at a local directory
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (and create if needed) a store rooted at `root`
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, locator: &Locator) -> Result<PathBuf> {
        // Re-validate: locators may arrive through deserialization
        let locator = Locator::parse(locator.as_str())?;
        let s = locator.as_str();
        Ok(self.root.join(&s[..2]).join(s))
    }
}

fn not_found(locator: &Locator) -> impl FnOnce(std::io::Error) -> BlobStoreError + '_ {
    move |err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            BlobStoreError::NotFound(locator.clone())
        } else {
            BlobStoreError::Io(err)
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    #[instrument(skip(self, data), fields(len = data.len()))]
    async fn put(&self, data: &[u8]) -> Result<Locator> {
        let locator = Locator::for_content(data);
        let path = self.path_for(&locator)?;
        if tokio::fs::try_exists(&path).await? {
            return Ok(locator);
        }

        let dir = path.parent().unwrap_or(&self.root);
        tokio::fs::create_dir_all(dir).await?;
        let tmp = dir.join(format!(".{}.{:016x}.tmp", locator, rand::random::<u64>()));
        tokio::fs::write(&tmp, data).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                warn!(path = %tmp.display(), error = %e, "failed to remove temp file");
            }
            // another writer may have landed the same content first
            if !tokio::fs::try_exists(&path).await? {
                return Err(err.into());
            }
        }

        debug!(%locator, "stored blob");
        Ok(locator)
    }

    async fn get(&self, locator: &Locator) -> Result<Bytes> {
        let path = self.path_for(locator)?;
        let data = tokio::fs::read(&path).await.map_err(not_found(locator))?;
        Ok(Bytes::from(data))
    }

    async fn has(&self, locator: &Locator) -> Result<bool> {
        let path = self.path_for(locator)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    #[instrument(skip(self))]
    async fn delete(&self, locator: &Locator) -> Result<()> {
        let path = self.path_for(locator)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn size(&self, locator: &Locator) -> Result<u64> {
        let path = self.path_for(locator)?;
        let meta = tokio::fs::metadata(&path).await.map_err(not_found(locator))?;
        Ok(meta.len())
    }
}
