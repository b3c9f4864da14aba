//! Error types for the vault-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
///
/// Messages never carry key material, derived secrets or KDF parameters.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key, IV or salt has the wrong length or encoding; raised before any cipher call
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// AEAD tag verification failed while decrypting resource content
    #[error("authentication failed")]
    AuthenticationFailed,

    /// AEAD tag verification failed while unwrapping a data key
    #[error("unable to unwrap data key")]
    UnwrapFailed,

    /// The password-protected private key could not be opened
    #[error("wrong password or corrupted key blob")]
    WrongPassword,

    /// Key generation failed
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Encryption failed
    #[error("encryption failed")]
    Encryption,

    /// Base64 decode error
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

/// Coarse failure classes callers map onto their own responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before touching a cipher
    InputValidation,
    /// AEAD verification failed; always opaque
    AuthenticationFailure,
    /// Anything else (RNG, cipher setup)
    Internal,
}

impl CryptoError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKeyMaterial(_) | Self::Base64Decode(_) => ErrorKind::InputValidation,
            Self::AuthenticationFailed | Self::UnwrapFailed | Self::WrongPassword => {
                ErrorKind::AuthenticationFailure
            }
            Self::KeyGeneration(_) | Self::Encryption => ErrorKind::Internal,
        }
    }
}
