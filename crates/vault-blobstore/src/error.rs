//! Error types for the vault-blobstore crate

use crate::Locator;
use thiserror::Error;

/// Result type alias using `BlobStoreError`
pub type Result<T> = std::result::Result<T, BlobStoreError>;

/// Errors that can occur during blob storage operations
#[derive(Error, Debug)]
pub enum BlobStoreError {
    /// Blob not found
    #[error("blob not found: {0}")]
    NotFound(Locator),

    /// Locator is not a well-formed content address
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
