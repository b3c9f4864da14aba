//! Envelope encryption: wrapping data keys for recipients
//!
//! A data key is wrapped for one recipient at a time with a non-interactive
//! ECDH hybrid scheme:
//!
//! 1. Generate an ephemeral P-256 key pair (never reused)
//! 2. `shared = ECDH(ephemeral_private, recipient_public)`; the 32-byte
//!    x-coordinate is used directly as the AES-256-GCM key
//! 3. Encrypt the raw DEK under that key with a fresh IV
//! 4. Keep `{wrapped_dek, wrap_iv, ephemeral_public_key}`, drop the
//!    ephemeral private key
//!
//! There is no KDF/context binding between the shared secret and the AES key.
//! Sharing with another user is [`KeyWrapper::rewrap_for`]: the sharer opens
//! their own copy and wraps a fresh one for the recipient, because nobody
//! keeps raw DEKs around.

use crate::{
    CryptoError, Result,
    keys::{DataKey, PrivateKey, PublicKey, base64_serde},
    provider::{CryptoProvider, RustCryptoProvider},
    symmetric::Nonce,
};
use serde::{Deserialize, Serialize};

/// A data key wrapped for one recipient
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// AES-256-GCM ciphertext of the raw DEK
    #[serde(with = "base64_serde")]
    pub wrapped_dek: Vec<u8>,
    /// IV used to wrap
    pub wrap_iv: Nonce,
    /// Public half of the ephemeral key pair
    pub ephemeral_public_key: PublicKey,
}

/// Wraps and unwraps data keys
#[derive(Clone, Debug, Default)]
pub struct KeyWrapper<P: CryptoProvider = RustCryptoProvider> {
    provider: P,
}

impl<P: CryptoProvider> KeyWrapper<P> {
    /// Wrapper over a custom provider
    pub fn with_provider(provider: P) -> Self {
        Self { provider }
    }

    /// Wrap `dek` for the holder of `recipient`'s private key
    pub fn wrap_key_for(&self, dek: &DataKey, recipient: &PublicKey) -> Result<WrappedKey> {
        let ephemeral = self.provider.generate_key_pair()?;
        let kek = self
            .provider
            .derive_shared_secret(ephemeral.private_key(), recipient);
        let wrap_iv = self.provider.generate_nonce()?;
        let wrapped_dek = self.provider.aead_encrypt(&kek, &wrap_iv, dek.as_bytes())?;

        let (ephemeral_public_key, _ephemeral_private) = ephemeral.into_parts();
        Ok(WrappedKey {
            wrapped_dek,
            wrap_iv,
            ephemeral_public_key,
        })
    }

    /// Recover the raw DEK with the recipient's private key
    pub fn unwrap_key_for(&self, wrapped: &WrappedKey, recipient: &PrivateKey) -> Result<DataKey> {
        let kek = self
            .provider
            .derive_shared_secret(recipient, &wrapped.ephemeral_public_key);
        let raw = zeroize::Zeroizing::new(
            self.provider
                .aead_decrypt(&kek, &wrapped.wrap_iv, &wrapped.wrapped_dek)
                .map_err(|_| CryptoError::UnwrapFailed)?,
        );
        DataKey::from_bytes(&raw).map_err(|_| CryptoError::UnwrapFailed)
    }

    /// Open `own_copy` and wrap the same DEK for `new_recipient`
    pub fn rewrap_for(
        &self,
        own_copy: &WrappedKey,
        own_private: &PrivateKey,
        new_recipient: &PublicKey,
    ) -> Result<WrappedKey> {
        let dek = self.unwrap_key_for(own_copy, own_private)?;
        self.wrap_key_for(&dek, new_recipient)
    }

    /// Wrap the same DEK once per recipient
    pub fn wrap_for_many(&self, dek: &DataKey, recipients: &[PublicKey]) -> Result<Vec<WrappedKey>> {
        recipients
            .iter()
            .map(|recipient| self.wrap_key_for(dek, recipient))
            .collect()
    }
}

/// Wrap a DEK for one recipient (default provider)
pub fn wrap_key_for(dek: &DataKey, recipient: &PublicKey) -> Result<WrappedKey> {
    KeyWrapper::<RustCryptoProvider>::default().wrap_key_for(dek, recipient)
}

/// Unwrap a DEK (default provider)
pub fn unwrap_key_for(wrapped: &WrappedKey, recipient: &PrivateKey) -> Result<DataKey> {
    KeyWrapper::<RustCryptoProvider>::default().unwrap_key_for(wrapped, recipient)
}
