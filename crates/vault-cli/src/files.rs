//! On-disk formats written by the CLI

use anyhow::Context;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::Path;
use vault_crypto::{EncryptedPrivateKey, Nonce, PublicKey, WrappedKey, keys::base64_serde};

/// A registered identity: the public key and the password-sealed private key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFile {
    pub public_key: PublicKey,
    pub sealed_private_key: EncryptedPrivateKey,
    /// Iteration count the private key was sealed with
    pub kdf_iterations: u32,
}

/// One recipient's wrapped copy of the file key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedRecipient {
    pub recipient: PublicKey,
    #[serde(flatten)]
    pub wrapped: WrappedKey,
}

/// An encrypted file openable by any listed recipient
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedFile {
    pub content_algo: String,
    pub iv: Nonce,
    #[serde(with = "base64_serde")]
    pub ciphertext: Vec<u8>,
    pub recipients: Vec<SealedRecipient>,
}

impl SealedFile {
    /// The wrapped key addressed to `public_key`, if any
    pub fn entry_for(&self, public_key: &PublicKey) -> Option<&WrappedKey> {
        self.recipients
            .iter()
            .find(|r| &r.recipient == public_key)
            .map(|r| &r.wrapped)
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let raw = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, raw).with_context(|| format!("writing {}", path.display()))
}

/// Read a public key from a JWK file
pub fn read_public_jwk(path: &Path) -> anyhow::Result<PublicKey> {
    let jwk = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    PublicKey::from_jwk_str(jwk.trim()).with_context(|| format!("{} is not a P-256 public JWK", path.display()))
}
