//! Symmetric encryption using AES-256-GCM
//!
//! All content, wrapped data keys and password-protected private keys go
//! through this one AEAD.

use crate::{CryptoError, Result, keys::{KEY_SIZE, NONCE_SIZE}};
use aes_gcm::{
    Aes256Gcm, KeyInit,
    aead::Aead as AeadTrait,
};
use base64::Engine;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Algorithm identifier recorded alongside encrypted content
pub const CONTENT_ALGORITHM: &str = "AES-256-GCM";

/// Size of the GCM authentication tag appended to every ciphertext
pub const TAG_SIZE: usize = 16;

/// A nonce (IV) for AEAD encryption
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Nonce {
    bytes: [u8; NONCE_SIZE],
}

impl Nonce {
    /// Generate a random nonce
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::RngCore::fill_bytes(&mut OsRng, &mut bytes);
        Self { bytes }
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidKeyMaterial(format!(
                "IV must be {} bytes, got {}",
                NONCE_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; NONCE_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Get the nonce bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.bytes
    }

    /// Encode as base64
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.bytes)
    }

    /// Decode from base64
    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(s)?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nonce({})", self.to_base64())
    }
}

impl Serialize for Nonce {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

/// AES-256-GCM encryption/decryption under one key
pub struct Aead {
    cipher: Aes256Gcm,
}

impl Aead {
    /// Create a new AEAD instance for the given key
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Encrypt data with the given nonce; the tag is appended to the output
    pub fn encrypt(&self, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher
            .encrypt(aes_gcm::Nonce::from_slice(nonce.as_bytes()), plaintext)
            .map_err(|_| CryptoError::Encryption)
    }

    /// Decrypt data with the given nonce
    ///
    /// Any tag mismatch is reported as `AuthenticationFailed`; callers that
    /// need a more specific opaque error remap it.
    pub fn decrypt(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.cipher
            .decrypt(aes_gcm::Nonce::from_slice(nonce.as_bytes()), ciphertext)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::DataKey;
    use rstest::rstest;

    #[test]
    fn test_aes_gcm_roundtrip() {
        let key = DataKey::generate();
        let nonce = Nonce::generate();
        let aead = Aead::new(key.as_bytes());

        let ciphertext = aead.encrypt(&nonce, b"Hello, World!").unwrap();
        assert_eq!(ciphertext.len(), 13 + TAG_SIZE);

        let decrypted = aead.decrypt(&nonce, &ciphertext).unwrap();
        assert_eq!(decrypted, b"Hello, World!");
    }

    #[test]
    fn test_wrong_key_fails() {
        let nonce = Nonce::generate();
        let ciphertext = Aead::new(DataKey::generate().as_bytes())
            .encrypt(&nonce, b"secret data")
            .unwrap();

        let result = Aead::new(DataKey::generate().as_bytes()).decrypt(&nonce, &ciphertext);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
    }

    #[rstest]
    #[case(0)]
    #[case(8)]
    #[case(11)]
    #[case(13)]
    #[case(16)]
    fn test_nonce_length_enforced(#[case] len: usize) {
        assert!(matches!(
            Nonce::from_bytes(&vec![0u8; len]),
            Err(CryptoError::InvalidKeyMaterial(_))
        ));
    }

    #[test]
    fn test_nonce_base64_roundtrip() {
        let nonce = Nonce::generate();
        assert_eq!(Nonce::from_base64(&nonce.to_base64()).unwrap(), nonce);
    }
}
