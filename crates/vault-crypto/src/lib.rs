//! # Vault Crypto
//!
//! Client-side cryptography for the zero-knowledge vault.
//!
//! This crate provides:
//! - **Identity keys**: P-256 key pairs whose private half is stored only under a password (PBKDF2 + AES-256-GCM)
//! - **Resource encryption**: one random AES-256-GCM data key (DEK) per note or file
//! - **Envelope key wrapping**: ECDH-based hybrid encryption of a DEK for each recipient
//! - **CryptoProvider**: the seam where the primitive library is bound
//!
//! ## Security Model
//!
//! - All encryption happens client-side
//! - The server stores ciphertext, wrapped DEKs and password-sealed private keys only
//! - Raw DEKs and private keys are zeroized when dropped
//!
//! ## Example
//!
//! ```rust
//! use vault_crypto::{encrypt_resource, decrypt_resource, wrap_key_for, unwrap_key_for, IdentityKeyPair};
//!
//! let alice = IdentityKeyPair::generate();
//! let encrypted = encrypt_resource(b"hello").unwrap();
//! let wrapped = wrap_key_for(&encrypted.dek, alice.public_key()).unwrap();
//!
//! let dek = unwrap_key_for(&wrapped, alice.private_key()).unwrap();
//! let plaintext = decrypt_resource(&encrypted.ciphertext, encrypted.iv.as_bytes(), dek.as_bytes()).unwrap();
//! assert_eq!(plaintext, b"hello");
//! ```

pub mod envelope;
pub mod error;
pub mod identity;
pub mod keys;
pub mod provider;
pub mod resource;
pub mod symmetric;

pub use envelope::{KeyWrapper, WrappedKey, unwrap_key_for, wrap_key_for};
pub use error::{CryptoError, ErrorKind, Result};
pub use identity::{
    EncryptedPrivateKey, IdentityManager, PBKDF2_ITERATIONS, generate_identity,
    unwrap_private_key, wrap_private_key,
};
pub use keys::{DataKey, IdentityKeyPair, PrivateKey, PublicKey};
pub use provider::{CryptoProvider, RustCryptoProvider};
pub use resource::{EncryptedResource, ResourceCipher, decrypt_resource, encrypt_resource};
pub use symmetric::{CONTENT_ALGORITHM, Nonce};
