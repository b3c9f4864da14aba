//! Pluggable cryptographic backend
//!
//! Every higher layer (identity, resource, envelope) reaches the primitives
//! only through [`CryptoProvider`], so a platform crypto library can be bound
//! in without touching the protocol code. [`RustCryptoProvider`] is the
//! default binding to the RustCrypto crates.

use crate::{
    CryptoError, Result,
    keys::{DerivedKey, IdentityKeyPair, PrivateKey, PublicKey, KEY_SIZE},
    symmetric::{Aead, Nonce},
};
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::Zeroizing;

/// The primitive operations the vault protocol is built from
pub trait CryptoProvider: Send + Sync {
    /// Generate a fresh P-256 key pair. Fails only if the RNG fails.
    fn generate_key_pair(&self) -> Result<IdentityKeyPair>;

    /// ECDH over P-256; returns the 32-byte x-coordinate of the shared point
    fn derive_shared_secret(&self, private: &PrivateKey, public: &PublicKey) -> DerivedKey;

    /// AES-256-GCM encrypt
    fn aead_encrypt(&self, key: &[u8; KEY_SIZE], nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// AES-256-GCM decrypt; `AuthenticationFailed` on tag mismatch
    fn aead_decrypt(&self, key: &[u8; KEY_SIZE], nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// PBKDF2-HMAC-SHA256 producing a 256-bit key
    fn pbkdf2(&self, password: &[u8], salt: &[u8], iterations: u32) -> DerivedKey;

    /// Fill `buf` from a cryptographically secure RNG
    fn fill_random(&self, buf: &mut [u8]) -> Result<()>;

    /// Draw a fresh random nonce
    fn generate_nonce(&self) -> Result<Nonce> {
        let mut bytes = [0u8; crate::keys::NONCE_SIZE];
        self.fill_random(&mut bytes)?;
        Nonce::from_bytes(&bytes)
    }
}

/// Default provider backed by `p256`, `aes-gcm`, `pbkdf2` and the OS RNG
#[derive(Clone, Copy, Debug, Default)]
pub struct RustCryptoProvider;

impl CryptoProvider for RustCryptoProvider {
    fn generate_key_pair(&self) -> Result<IdentityKeyPair> {
        // Rejection-sample a scalar so RNG failures surface as errors
        let mut candidate = Zeroizing::new([0u8; KEY_SIZE]);
        loop {
            self.fill_random(candidate.as_mut())?;
            if let Ok(private) = PrivateKey::from_bytes(candidate.as_ref()) {
                return Ok(IdentityKeyPair::from_private_key(private));
            }
        }
    }

    fn derive_shared_secret(&self, private: &PrivateKey, public: &PublicKey) -> DerivedKey {
        let shared = p256::ecdh::diffie_hellman(
            private.as_p256().to_nonzero_scalar(),
            public.as_p256().as_affine(),
        );
        let mut out = Zeroizing::new([0u8; KEY_SIZE]);
        out.copy_from_slice(shared.raw_secret_bytes().as_slice());
        out
    }

    fn aead_encrypt(&self, key: &[u8; KEY_SIZE], nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
        Aead::new(key).encrypt(nonce, plaintext)
    }

    fn aead_decrypt(&self, key: &[u8; KEY_SIZE], nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Aead::new(key).decrypt(nonce, ciphertext)
    }

    fn pbkdf2(&self, password: &[u8], salt: &[u8], iterations: u32) -> DerivedKey {
        let mut out = Zeroizing::new([0u8; KEY_SIZE]);
        pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, out.as_mut());
        out
    }

    fn fill_random(&self, buf: &mut [u8]) -> Result<()> {
        rand::RngCore::try_fill_bytes(&mut OsRng, buf)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))
    }
}
