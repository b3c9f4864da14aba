//! Key types for the vault
//!
//! Two families of keys:
//! - Data keys: random AES-256 keys encrypting one resource each
//! - Identity keys: long-lived P-256 key pairs that data keys are wrapped for

use crate::{CryptoError, Result};
use base64::Engine;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of a symmetric key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of a nonce in bytes (96 bits for AES-GCM)
pub const NONCE_SIZE: usize = 12;

/// Size of an uncompressed SEC1 P-256 point
pub const PUBLIC_KEY_SIZE: usize = 65;

/// A key derived from a shared secret or a password; wiped on drop
pub type DerivedKey = Zeroizing<[u8; KEY_SIZE]>;

/// A Data Encryption Key (DEK) protecting one resource
///
/// Only ever held transiently: right after generation for wrapping, or right
/// after unwrapping for decryption.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DataKey {
    key: [u8; KEY_SIZE],
}

impl DataKey {
    /// Generate a new random DEK
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::RngCore::fill_bytes(&mut OsRng, &mut key);
        Self { key }
    }

    /// Create a DEK from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyMaterial(format!(
                "DEK must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataKey(<redacted>)")
    }
}

/// A P-256 public key
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: p256::PublicKey,
}

impl PublicKey {
    /// Parse an SEC1-encoded point (compressed or uncompressed)
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = p256::PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| CryptoError::InvalidKeyMaterial("public key is not a P-256 point".into()))?;
        Ok(Self { inner })
    }

    /// Uncompressed SEC1 encoding (65 bytes)
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.inner.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Encode as base64
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.to_sec1_bytes())
    }

    /// Decode from base64
    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(s)?;
        Self::from_sec1_bytes(&bytes)
    }

    /// Export as a JSON Web Key (`{"kty":"EC","crv":"P-256",...}`)
    pub fn to_jwk_string(&self) -> String {
        self.inner.to_jwk_string()
    }

    /// Import from a JSON Web Key
    pub fn from_jwk_str(jwk: &str) -> Result<Self> {
        let inner = p256::PublicKey::from_jwk_str(jwk)
            .map_err(|_| CryptoError::InvalidKeyMaterial("public key JWK is not a P-256 key".into()))?;
        Ok(Self { inner })
    }

    pub(crate) fn as_p256(&self) -> &p256::PublicKey {
        &self.inner
    }

    pub(crate) fn from_p256(inner: p256::PublicKey) -> Self {
        Self { inner }
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

/// A P-256 private key
///
/// The underlying scalar is zeroized when dropped.
#[derive(Clone)]
pub struct PrivateKey {
    inner: p256::SecretKey,
}

impl PrivateKey {
    /// Generate a new random private key
    pub fn generate() -> Self {
        Self {
            inner: p256::SecretKey::random(&mut OsRng),
        }
    }

    /// Create from the raw 32-byte scalar
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyMaterial(format!(
                "private key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let inner = p256::SecretKey::from_slice(bytes)
            .map_err(|_| CryptoError::InvalidKeyMaterial("private key is out of range".into()))?;
        Ok(Self { inner })
    }

    /// Raw scalar bytes; wiped when the returned buffer drops
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.inner.to_bytes().to_vec())
    }

    /// Derive the public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_p256(self.inner.public_key())
    }

    /// Serialize as a JSON Web Key
    pub fn to_jwk_string(&self) -> Zeroizing<String> {
        self.inner.to_jwk_string()
    }

    /// Parse a JSON Web Key
    pub fn from_jwk_str(jwk: &str) -> Result<Self> {
        let inner = p256::SecretKey::from_jwk_str(jwk)
            .map_err(|_| CryptoError::InvalidKeyMaterial("private key JWK is not a P-256 key".into()))?;
        Ok(Self { inner })
    }

    pub(crate) fn as_p256(&self) -> &p256::SecretKey {
        &self.inner
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A user's identity key pair
#[derive(Clone, Debug)]
pub struct IdentityKeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl IdentityKeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_private_key(PrivateKey::generate())
    }

    /// Create from an existing private key
    pub fn from_private_key(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    /// Get the private key
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// Get the public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Split into parts
    pub fn into_parts(self) -> (PublicKey, PrivateKey) {
        (self.public, self.private)
    }
}

/// Serde adapter for byte fields stored as base64 strings
pub mod base64_serde {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(&s)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dek_generation() {
        let dek1 = DataKey::generate();
        let dek2 = DataKey::generate();
        assert_ne!(dek1.as_bytes(), dek2.as_bytes());
    }

    #[test]
    fn test_dek_length_enforced() {
        assert!(matches!(
            DataKey::from_bytes(&[0u8; 16]),
            Err(CryptoError::InvalidKeyMaterial(_))
        ));
        assert!(DataKey::from_bytes(&[7u8; KEY_SIZE]).is_ok());
    }

    #[test]
    fn test_keypair_generation() {
        let kp1 = IdentityKeyPair::generate();
        let kp2 = IdentityKeyPair::generate();
        assert_ne!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_public_key_derivation() {
        let kp = IdentityKeyPair::generate();
        assert_eq!(kp.public_key(), &kp.private_key().public_key());
    }

    #[test]
    fn test_public_key_encodings() {
        let kp = IdentityKeyPair::generate();
        let public = kp.public_key();

        assert_eq!(public.to_sec1_bytes().len(), PUBLIC_KEY_SIZE);
        assert_eq!(&PublicKey::from_base64(&public.to_base64()).unwrap(), public);

        let jwk = public.to_jwk_string();
        assert!(jwk.contains("\"crv\":\"P-256\""));
        assert_eq!(&PublicKey::from_jwk_str(&jwk).unwrap(), public);
    }

    #[test]
    fn test_private_key_jwk_roundtrip() {
        let kp = IdentityKeyPair::generate();
        let jwk = kp.private_key().to_jwk_string();
        let restored = PrivateKey::from_jwk_str(&jwk).unwrap();
        assert_eq!(restored.to_bytes(), kp.private_key().to_bytes());
    }

    #[test]
    fn test_invalid_public_key_rejected() {
        assert!(matches!(
            PublicKey::from_sec1_bytes(&[4u8; PUBLIC_KEY_SIZE]),
            Err(CryptoError::InvalidKeyMaterial(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let kp = IdentityKeyPair::generate();
        let rendered = format!("{:?}", kp);
        assert!(rendered.contains("<redacted>"));
        assert!(format!("{:?}", DataKey::generate()).contains("<redacted>"));
    }
}
