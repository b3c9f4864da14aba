//! Subcommand implementations

use crate::files::{
    IdentityFile, SealedFile, SealedRecipient, read_json, read_public_jwk, write_json,
};
use anyhow::{Context, bail};
use std::path::{Path, PathBuf};
use tracing::info;
use vault_core::{Caller, CoreError, Vault, VaultConfig};
use vault_crypto::{
    CONTENT_ALGORITHM, CryptoError, IdentityManager, KeyWrapper, PublicKey, ResourceCipher,
    RustCryptoProvider,
};
use zeroize::Zeroizing;

/// Create an identity file at `out` and its public JWK next to it
///
/// Returns the path of the public key file.
pub async fn identity_new(config: &VaultConfig, password: &str, out: &Path) -> anyhow::Result<PathBuf> {
    if password.is_empty() {
        bail!("password is empty");
    }
    let identities = IdentityManager::new().with_iterations(config.kdf_iterations);
    let password = Zeroizing::new(password.to_owned());
    let (pair, sealed) = tokio::task::spawn_blocking(move || {
        let pair = identities.generate_identity()?;
        let sealed = identities.wrap_private_key(pair.private_key(), &password)?;
        Ok::<_, CryptoError>((pair, sealed))
    })
    .await??;

    let identity = IdentityFile {
        public_key: *pair.public_key(),
        sealed_private_key: sealed,
        kdf_iterations: config.kdf_iterations,
    };
    write_json(out, &identity)?;

    let public_path = out.with_extension("pub.jwk");
    std::fs::write(&public_path, pair.public_key().to_jwk_string())
        .with_context(|| format!("writing {}", public_path.display()))?;

    info!(identity = %out.display(), public = %public_path.display(), "identity created");
    Ok(public_path)
}

/// Encrypt `input` for every public key in `recipients`
pub fn seal(recipients: &[PathBuf], input: &Path, output: &Path) -> anyhow::Result<()> {
    if recipients.is_empty() {
        bail!("at least one --to recipient is required");
    }
    let public_keys = recipients
        .iter()
        .map(|path| read_public_jwk(path))
        .collect::<anyhow::Result<Vec<PublicKey>>>()?;

    let plaintext = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let encrypted = ResourceCipher::<RustCryptoProvider>::default().encrypt(&plaintext)?;
    let wrapped = KeyWrapper::<RustCryptoProvider>::default().wrap_for_many(&encrypted.dek, &public_keys)?;

    let sealed = SealedFile {
        content_algo: CONTENT_ALGORITHM.to_string(),
        iv: encrypted.iv,
        ciphertext: encrypted.ciphertext,
        recipients: public_keys
            .into_iter()
            .zip(wrapped)
            .map(|(recipient, wrapped)| SealedRecipient { recipient, wrapped })
            .collect(),
    };
    write_json(output, &sealed)?;

    info!(recipients = sealed.recipients.len(), bytes = plaintext.len(), "sealed");
    Ok(())
}

/// Decrypt a sealed file with the identity at `identity_path`
pub async fn open(identity_path: &Path, password: &str, input: &Path, output: &Path) -> anyhow::Result<()> {
    let identity: IdentityFile = read_json(identity_path)?;
    let sealed: SealedFile = read_json(input)?;
    if sealed.content_algo != CONTENT_ALGORITHM {
        bail!("unsupported content algorithm {}", sealed.content_algo);
    }

    let config = VaultConfig {
        kdf_iterations: identity.kdf_iterations,
        ..Default::default()
    };
    let vault = Vault::from_config(&config).await?;
    let pair = match vault.unlock_sealed(&identity.sealed_private_key, password).await {
        Ok(pair) => pair,
        Err(CoreError::Crypto(e)) => bail!("could not unlock identity: {e}"),
        Err(e) => return Err(e.into()),
    };

    let Some(wrapped) = sealed.entry_for(pair.public_key()) else {
        bail!("{} is not a recipient of {}", identity_path.display(), input.display());
    };
    let dek = KeyWrapper::<RustCryptoProvider>::default().unwrap_key_for(wrapped, pair.private_key())?;
    let plaintext = ResourceCipher::<RustCryptoProvider>::default()
        .decrypt_with_key(&sealed.ciphertext, &sealed.iv, &dek)?;

    std::fs::write(output, &plaintext).with_context(|| format!("writing {}", output.display()))?;
    info!(bytes = plaintext.len(), "opened");
    Ok(())
}

/// Run the two-user sharing scenario end to end
pub async fn demo(config: &VaultConfig) -> anyhow::Result<()> {
    let vault = Vault::from_config(config).await?;
    let alice = Caller::new("alice", "alice@example.com");
    let bob = Caller::new("bob", "bob@example.com");

    vault.register_identity(&alice, "alice-demo-password").await?;
    vault.register_identity(&bob, "bob-demo-password").await?;
    let alice_keys = vault.unlock_identity(&alice.user_id, "alice-demo-password").await?;
    let bob_keys = vault.unlock_identity(&bob.user_id, "bob-demo-password").await?;

    let note = vault
        .create_note(&alice, alice_keys.public_key(), b"meet at noon")
        .await?;
    info!(resource = %note.id, "alice created a note");

    vault
        .share(note.id, &alice, alice_keys.private_key(), &bob.user_id)
        .await?;
    let read = vault.open(note.id, &bob, bob_keys.private_key()).await?;
    info!(plaintext = %String::from_utf8_lossy(&read), "bob opened the shared note");

    vault.revoke(note.id, &alice, &bob.user_id).await?;
    match vault.open(note.id, &bob, bob_keys.private_key()).await {
        Err(CoreError::AccessDenied) => info!("bob is denied after revocation"),
        Ok(_) => bail!("revoked user could still open the note"),
        Err(e) => return Err(e.into()),
    }

    let still = vault.open(note.id, &alice, alice_keys.private_key()).await?;
    info!(bytes = still.len(), "alice keeps access");
    Ok(())
}
