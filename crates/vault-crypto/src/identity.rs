//! Identity key management
//!
//! Each user owns one P-256 identity key pair, created at registration. The
//! private half is stored server-side only as an [`EncryptedPrivateKey`]:
//! AES-256-GCM under a key stretched from the user's password with
//! PBKDF2-HMAC-SHA256. The password never leaves the client, so the server
//! cannot open the blob.

use crate::{
    CryptoError, Result,
    keys::{IdentityKeyPair, PrivateKey, base64_serde},
    provider::{CryptoProvider, RustCryptoProvider},
    symmetric::Nonce,
};
use serde::{Deserialize, Serialize};

/// PBKDF2 iteration count for password-wrapped private keys
pub const PBKDF2_ITERATIONS: u32 = 150_000;

/// Salt size for PBKDF2 in bytes
pub const SALT_SIZE: usize = 16;

/// A private key encrypted under a password
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPrivateKey {
    #[serde(with = "base64_serde")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "base64_serde")]
    pub iv: Vec<u8>,
    #[serde(with = "base64_serde")]
    pub salt: Vec<u8>,
}

/// Creates identities and seals/opens their private keys
#[derive(Clone, Debug)]
pub struct IdentityManager<P: CryptoProvider = RustCryptoProvider> {
    provider: P,
    iterations: u32,
}

impl Default for IdentityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityManager {
    /// Manager using the default provider and iteration count
    pub fn new() -> Self {
        Self::with_provider(RustCryptoProvider)
    }
}

impl<P: CryptoProvider> IdentityManager<P> {
    /// Manager over a custom provider
    pub fn with_provider(provider: P) -> Self {
        Self {
            provider,
            iterations: PBKDF2_ITERATIONS,
        }
    }

    /// Override the PBKDF2 iteration count
    ///
    /// Blobs are only readable by a manager configured with the same count.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    /// Generate a fresh identity key pair
    pub fn generate_identity(&self) -> Result<IdentityKeyPair> {
        self.provider.generate_key_pair()
    }

    /// Encrypt a private key under a password. Salt and IV are fresh per call.
    pub fn wrap_private_key(&self, private: &PrivateKey, password: &str) -> Result<EncryptedPrivateKey> {
        let mut salt = vec![0u8; SALT_SIZE];
        self.provider.fill_random(&mut salt)?;
        let iv = self.provider.generate_nonce()?;

        let key = self.provider.pbkdf2(password.as_bytes(), &salt, self.iterations);
        let serialized = private.to_jwk_string();
        let ciphertext = self.provider.aead_encrypt(&key, &iv, serialized.as_bytes())?;

        Ok(EncryptedPrivateKey {
            ciphertext,
            iv: iv.as_bytes().to_vec(),
            salt,
        })
    }

    /// Decrypt a password-wrapped private key
    ///
    /// Every failure (bad password, malformed fields, tampered ciphertext)
    /// collapses into `WrongPassword`.
    pub fn unwrap_private_key(&self, blob: &EncryptedPrivateKey, password: &str) -> Result<PrivateKey> {
        if blob.salt.len() != SALT_SIZE {
            return Err(CryptoError::WrongPassword);
        }
        let iv = Nonce::from_bytes(&blob.iv).map_err(|_| CryptoError::WrongPassword)?;

        let key = self.provider.pbkdf2(password.as_bytes(), &blob.salt, self.iterations);
        let plaintext = zeroize::Zeroizing::new(
            self.provider
                .aead_decrypt(&key, &iv, &blob.ciphertext)
                .map_err(|_| CryptoError::WrongPassword)?,
        );

        let jwk = std::str::from_utf8(&plaintext).map_err(|_| CryptoError::WrongPassword)?;
        PrivateKey::from_jwk_str(jwk).map_err(|_| CryptoError::WrongPassword)
    }
}

/// Generate a fresh identity key pair with the default provider
pub fn generate_identity() -> Result<IdentityKeyPair> {
    IdentityManager::new().generate_identity()
}

/// Encrypt a private key under a password with the default settings
pub fn wrap_private_key(private: &PrivateKey, password: &str) -> Result<EncryptedPrivateKey> {
    IdentityManager::new().wrap_private_key(private, password)
}

/// Decrypt a private key with the default settings
pub fn unwrap_private_key(blob: &EncryptedPrivateKey, password: &str) -> Result<PrivateKey> {
    IdentityManager::new().unwrap_private_key(blob, password)
}
