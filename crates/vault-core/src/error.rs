//! Error types for the vault-core crate

use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in vault operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// No active grant, revoked grant, unknown resource, unknown share token
    /// or identity mismatch. Carries no detail.
    #[error("access denied")]
    AccessDenied,

    /// Request is malformed
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Crypto error
    #[error("crypto error: {0}")]
    Crypto(#[from] vault_crypto::CryptoError),

    /// Blob store error
    #[error("blob store error: {0}")]
    BlobStore(#[from] vault_blobstore::BlobStoreError),

    /// A blocking crypto task panicked or was cancelled
    #[error("background task failed: {0}")]
    Join(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        CoreError::Join(err.to_string())
    }
}

impl CoreError {
    /// Whether this error should be reported to the caller as "forbidden / not found"
    pub fn is_access_denied(&self) -> bool {
        matches!(self, CoreError::AccessDenied)
    }
}
