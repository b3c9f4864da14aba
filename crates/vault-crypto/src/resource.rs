//! Resource (note/file) content encryption
//!
//! Each resource is encrypted once under its own random DEK. The DEK is
//! handed back to the caller only so it can be wrapped immediately.

use crate::{
    CryptoError, Result,
    keys::{DataKey, KEY_SIZE, NONCE_SIZE},
    provider::{CryptoProvider, RustCryptoProvider},
    symmetric::Nonce,
};

/// Output of [`ResourceCipher::encrypt`]
#[derive(Debug)]
pub struct EncryptedResource {
    /// AES-256-GCM ciphertext with the tag appended
    pub ciphertext: Vec<u8>,
    /// The IV used
    pub iv: Nonce,
    /// The freshly generated DEK; wrap it, then drop it
    pub dek: DataKey,
}

/// Encrypts and decrypts resource content
#[derive(Clone, Debug, Default)]
pub struct ResourceCipher<P: CryptoProvider = RustCryptoProvider> {
    provider: P,
}

impl<P: CryptoProvider> ResourceCipher<P> {
    /// Cipher over a custom provider
    pub fn with_provider(provider: P) -> Self {
        Self { provider }
    }

    /// Encrypt `plaintext` under a fresh DEK and IV
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedResource> {
        let mut raw = zeroize::Zeroizing::new([0u8; KEY_SIZE]);
        self.provider.fill_random(raw.as_mut())?;
        let dek = DataKey::from_bytes(raw.as_ref())?;
        let iv = self.provider.generate_nonce()?;

        let ciphertext = self.provider.aead_encrypt(dek.as_bytes(), &iv, plaintext)?;
        Ok(EncryptedResource { ciphertext, iv, dek })
    }

    /// Decrypt resource content from raw IV and DEK bytes
    ///
    /// Lengths are checked before any cipher call.
    pub fn decrypt(&self, ciphertext: &[u8], iv: &[u8], dek: &[u8]) -> Result<Vec<u8>> {
        if iv.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidKeyMaterial(format!(
                "IV must be {} bytes, got {}",
                NONCE_SIZE,
                iv.len()
            )));
        }
        let dek = DataKey::from_bytes(dek)?;
        let iv = Nonce::from_bytes(iv)?;
        self.decrypt_with_key(ciphertext, &iv, &dek)
    }

    /// Decrypt resource content with typed key material
    pub fn decrypt_with_key(&self, ciphertext: &[u8], iv: &Nonce, dek: &DataKey) -> Result<Vec<u8>> {
        self.provider
            .aead_decrypt(dek.as_bytes(), iv, ciphertext)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }
}

/// Encrypt content under a fresh DEK (default provider)
pub fn encrypt_resource(plaintext: &[u8]) -> Result<EncryptedResource> {
    ResourceCipher::<RustCryptoProvider>::default().encrypt(plaintext)
}

/// Decrypt content from raw IV and DEK bytes (default provider)
pub fn decrypt_resource(ciphertext: &[u8], iv: &[u8], dek: &[u8]) -> Result<Vec<u8>> {
    ResourceCipher::<RustCryptoProvider>::default().decrypt(ciphertext, iv, dek)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetric::TAG_SIZE;
    use proptest::prelude::*;

    #[test]
    fn test_resource_roundtrip() {
        let encrypted = encrypt_resource(b"hello").unwrap();
        let plaintext = decrypt_resource(
            &encrypted.ciphertext,
            encrypted.iv.as_bytes(),
            encrypted.dek.as_bytes(),
        )
        .unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn test_empty_plaintext() {
        let encrypted = encrypt_resource(b"").unwrap();
        assert_eq!(encrypted.ciphertext.len(), TAG_SIZE);
        let plaintext = ResourceCipher::<RustCryptoProvider>::default()
            .decrypt_with_key(&encrypted.ciphertext, &encrypted.iv, &encrypted.dek)
            .unwrap();
        assert!(plaintext.is_empty());
    }

    #[test]
    fn test_fresh_dek_and_iv_per_call() {
        let a = encrypt_resource(b"same").unwrap();
        let b = encrypt_resource(b"same").unwrap();
        assert_ne!(a.dek.as_bytes(), b.dek.as_bytes());
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_bad_lengths_fail_fast() {
        let encrypted = encrypt_resource(b"data").unwrap();

        let short_iv = decrypt_resource(&encrypted.ciphertext, &[0u8; 8], encrypted.dek.as_bytes());
        assert!(matches!(short_iv, Err(CryptoError::InvalidKeyMaterial(_))));

        let short_key = decrypt_resource(&encrypted.ciphertext, encrypted.iv.as_bytes(), &[0u8; 16]);
        assert!(matches!(short_key, Err(CryptoError::InvalidKeyMaterial(_))));
    }

    #[test]
    fn test_wrong_dek_fails_authentication() {
        let encrypted = encrypt_resource(b"data").unwrap();
        let other = DataKey::generate();
        let result = decrypt_resource(&encrypted.ciphertext, encrypted.iv.as_bytes(), other.as_bytes());
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_any_bit_flip_is_detected(
            plaintext in proptest::collection::vec(any::<u8>(), 0..256),
            target in 0usize..3,
            position in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let encrypted = encrypt_resource(&plaintext).unwrap();
            let mut ciphertext = encrypted.ciphertext.clone();
            let mut iv = encrypted.iv.as_bytes().to_vec();

            match target {
                // ciphertext body or tag
                0 => { let i = position.index(ciphertext.len()); ciphertext[i] ^= 1 << bit; }
                // tag only
                1 => { let len = ciphertext.len(); let i = len - 1 - position.index(TAG_SIZE); ciphertext[i] ^= 1 << bit; }
                _ => { let i = position.index(iv.len()); iv[i] ^= 1 << bit; }
            }

            let result = decrypt_resource(&ciphertext, &iv, encrypted.dek.as_bytes());
            prop_assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
        }
    }
}
