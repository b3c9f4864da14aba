//! The vault service
//!
//! `Vault` runs every operation a client performs against the server-side
//! stores: it encrypts before anything is persisted and checks the caller's
//! grant before anything is decrypted. The stores only ever see ciphertext,
//! wrapped keys and password-sealed private keys.
//!
//! Sharing rules:
//! - any active grantee may give access to someone without a row yet
//! - only the owner may replace an existing row or reactivate a revoked one
//! - nobody, the owner included, may touch the owner's own row

use crate::{
    CoreError, Result,
    capability::{CapabilityStore, MemoryCapabilityStore, ShareCapabilities},
    config::VaultConfig,
    directory::{IdentityDirectory, IdentityRecord, MemoryIdentityDirectory},
    ledger::{GrantLedger, MemoryGrantLedger},
    model::{
        AccessGrant, Caller, FileMetadata, Resource, ResourceContent, ResourceId, ResourceKind,
        ShareToken, UserId, normalize_identity,
    },
    repository::{MemoryResourceRepository, ResourceRepository},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use vault_blobstore::BlobStore;
use vault_crypto::{
    EncryptedPrivateKey, IdentityKeyPair, IdentityManager, KeyWrapper, PrivateKey, PublicKey,
    ResourceCipher,
};
use zeroize::Zeroizing;

/// A resource the caller can open, with the grant that lets them
#[derive(Clone, Debug)]
pub struct AccessibleResource {
    pub resource: Resource,
    pub grant: AccessGrant,
}

/// Envelope-encrypted note and file vault
#[derive(Clone)]
pub struct Vault {
    identities: IdentityManager,
    directory: Arc<dyn IdentityDirectory>,
    cipher: ResourceCipher,
    wrapper: KeyWrapper,
    resources: Arc<dyn ResourceRepository>,
    ledger: Arc<dyn GrantLedger>,
    links: ShareCapabilities,
    blobs: Arc<dyn BlobStore>,
}

impl Vault {
    /// Create a vault with in-memory records over the given blob store
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            identities: IdentityManager::new(),
            directory: Arc::new(MemoryIdentityDirectory::new()),
            cipher: ResourceCipher::default(),
            wrapper: KeyWrapper::default(),
            resources: Arc::new(MemoryResourceRepository::new()),
            ledger: Arc::new(MemoryGrantLedger::new()),
            links: ShareCapabilities::new(Arc::new(MemoryCapabilityStore::new())),
            blobs,
        }
    }

    /// Build a vault from configuration
    pub async fn from_config(config: &VaultConfig) -> Result<Self> {
        config.validate()?;
        let blobs = config.blob_store.open().await?;
        Ok(Self::new(blobs).with_identity_manager(
            IdentityManager::new().with_iterations(config.kdf_iterations),
        ))
    }

    pub fn with_identity_manager(mut self, identities: IdentityManager) -> Self {
        self.identities = identities;
        self
    }

    pub fn with_identity_directory(mut self, directory: Arc<dyn IdentityDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_resource_repository(mut self, resources: Arc<dyn ResourceRepository>) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_grant_ledger(mut self, ledger: Arc<dyn GrantLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_capability_store(mut self, store: Arc<dyn CapabilityStore>) -> Self {
        self.links = ShareCapabilities::new(store);
        self
    }

    // ==================== Identities ====================

    /// Create an identity for `caller`, seal its private key under `password`
    /// and publish both to the identity directory
    ///
    /// Each user id and each identity registers once.
    #[instrument(skip_all, fields(user = %caller.user_id))]
    pub async fn register_identity(
        &self,
        caller: &Caller,
        password: &str,
    ) -> Result<(IdentityKeyPair, EncryptedPrivateKey)> {
        if password.is_empty() {
            return Err(CoreError::InvalidInput("password is empty".to_string()));
        }
        let identity = normalize_identity(&caller.identity);
        if identity.is_empty() {
            return Err(CoreError::InvalidInput("identity is empty".to_string()));
        }
        if self.directory.get(&caller.user_id).await?.is_some()
            || self.directory.find_by_identity(&identity).await?.is_some()
        {
            return Err(CoreError::InvalidInput("identity already registered".to_string()));
        }

        let identities = self.identities.clone();
        let password = Zeroizing::new(password.to_owned());
        let (pair, sealed) = tokio::task::spawn_blocking(move || {
            let pair = identities.generate_identity()?;
            let sealed = identities.wrap_private_key(pair.private_key(), &password)?;
            Ok::<_, vault_crypto::CryptoError>((pair, sealed))
        })
        .await??;

        let record = IdentityRecord {
            user_id: caller.user_id.clone(),
            identity,
            public_key: *pair.public_key(),
            sealed_private_key: sealed.clone(),
            created_at: Utc::now(),
        };
        if !self.directory.insert(record).await? {
            return Err(CoreError::InvalidInput("identity already registered".to_string()));
        }

        info!("identity registered");
        Ok((pair, sealed))
    }

    /// Fetch the caller's sealed private key from the directory and open it
    ///
    /// An unknown user fails exactly like a wrong password.
    #[instrument(skip_all, fields(user = %user_id))]
    pub async fn unlock_identity(&self, user_id: &UserId, password: &str) -> Result<IdentityKeyPair> {
        let Some(record) = self.directory.get(user_id).await? else {
            warn!("unlock for unknown user");
            return Err(vault_crypto::CryptoError::WrongPassword.into());
        };
        self.unlock_sealed(&record.sealed_private_key, password).await
    }

    /// Open a sealed private key held outside the directory
    pub async fn unlock_sealed(
        &self,
        sealed: &EncryptedPrivateKey,
        password: &str,
    ) -> Result<IdentityKeyPair> {
        let identities = self.identities.clone();
        let sealed = sealed.clone();
        let password = Zeroizing::new(password.to_owned());

        let private = tokio::task::spawn_blocking(move || {
            identities.unwrap_private_key(&sealed, &password)
        })
        .await??;

        debug!("identity unlocked");
        Ok(IdentityKeyPair::from_private_key(private))
    }

    /// Public key registered for a login identity
    pub async fn public_key_for(&self, identity: &str) -> Result<PublicKey> {
        self.directory
            .find_by_identity(identity)
            .await?
            .map(|record| record.public_key)
            .ok_or(CoreError::AccessDenied)
    }

    // ==================== Resources ====================

    /// Encrypt a note and give its owner the first grant
    #[instrument(skip_all, fields(owner = %caller.user_id))]
    pub async fn create_note(
        &self,
        caller: &Caller,
        owner_public: &PublicKey,
        plaintext: &[u8],
    ) -> Result<Resource> {
        let encrypted = self.cipher.encrypt(plaintext)?;
        let wrapped = self.wrapper.wrap_key_for(&encrypted.dek, owner_public)?;

        let resource = Resource::new(
            caller.user_id.clone(),
            ResourceKind::Note,
            ResourceContent::Inline {
                ciphertext: encrypted.ciphertext,
            },
            encrypted.iv,
            None,
        );

        self.persist_with_owner_grant(resource, wrapped, None).await
    }

    /// Encrypt a file, store its ciphertext as a blob and give its owner the first grant
    #[instrument(skip_all, fields(owner = %caller.user_id, size = bytes.len()))]
    pub async fn upload_file(
        &self,
        caller: &Caller,
        owner_public: &PublicKey,
        bytes: &[u8],
        metadata: FileMetadata,
    ) -> Result<Resource> {
        if metadata.original_file_name.trim().is_empty() {
            return Err(CoreError::InvalidInput("file name is empty".to_string()));
        }
        let encrypted = self.cipher.encrypt(bytes)?;
        let wrapped = self.wrapper.wrap_key_for(&encrypted.dek, owner_public)?;

        let locator = self.blobs.put(&encrypted.ciphertext).await?;
        let resource = Resource::new(
            caller.user_id.clone(),
            ResourceKind::File,
            ResourceContent::Stored {
                locator: locator.clone(),
            },
            encrypted.iv,
            Some(FileMetadata {
                file_size: bytes.len() as u64,
                ..metadata
            }),
        );

        self.persist_with_owner_grant(resource, wrapped, Some(locator))
            .await
    }

    /// Insert the record then the owner's grant, undoing both on failure
    async fn persist_with_owner_grant(
        &self,
        resource: Resource,
        wrapped: vault_crypto::WrappedKey,
        blob: Option<vault_blobstore::Locator>,
    ) -> Result<Resource> {
        let id = resource.id;
        let owner = resource.owner_id.clone();

        if let Err(e) = self.resources.insert(resource.clone()).await {
            self.discard_blob(blob.as_ref()).await;
            return Err(e);
        }

        if let Err(e) = self.ledger.grant(id, &owner, wrapped, &owner).await {
            warn!(resource = %id, error = %e, "owner grant failed, rolling back");
            // the record is unreachable without a grant
            if let Err(remove_err) = self.resources.remove(id).await {
                warn!(resource = %id, error = %remove_err, "failed to remove orphaned resource");
            }
            self.discard_blob(blob.as_ref()).await;
            return Err(e);
        }

        info!(resource = %id, kind = ?resource.kind, "resource created");
        Ok(resource)
    }

    async fn discard_blob(&self, blob: Option<&vault_blobstore::Locator>) {
        if let Some(locator) = blob {
            if let Err(e) = self.blobs.delete(locator).await {
                warn!(%locator, error = %e, "failed to delete orphaned blob");
            }
        }
    }

    /// Decrypt a resource the caller holds an active grant on
    #[instrument(skip_all, fields(resource = %resource_id, user = %caller.user_id))]
    pub async fn open(
        &self,
        resource_id: ResourceId,
        caller: &Caller,
        caller_private: &PrivateKey,
    ) -> Result<Vec<u8>> {
        let grant = self.resolve(resource_id, caller).await?;
        let resource = self
            .resources
            .get(resource_id)
            .await?
            .ok_or(CoreError::AccessDenied)?;

        let dek = self.wrapper.unwrap_key_for(&grant.wrapped, caller_private)?;

        let plaintext = match &resource.content {
            ResourceContent::Inline { ciphertext } => {
                self.cipher.decrypt_with_key(ciphertext, &resource.iv, &dek)?
            }
            ResourceContent::Stored { locator } => {
                let ciphertext = self.blobs.get(locator).await?;
                self.cipher.decrypt_with_key(&ciphertext, &resource.iv, &dek)?
            }
        };

        Ok(plaintext)
    }

    /// Resources the caller currently holds an active grant on
    #[instrument(skip_all, fields(user = %caller.user_id))]
    pub async fn list_accessible(&self, caller: &Caller) -> Result<Vec<AccessibleResource>> {
        let grants = self.ledger.list_active_grants(&caller.user_id).await?;

        let mut accessible = Vec::with_capacity(grants.len());
        for grant in grants {
            if let Some(resource) = self.resources.get(grant.resource_id).await? {
                accessible.push(AccessibleResource { resource, grant });
            }
        }
        accessible.sort_by(|a, b| a.resource.created_at.cmp(&b.resource.created_at));
        Ok(accessible)
    }

    /// Soft-delete a resource and drop everything that points at it. Owner only.
    #[instrument(skip_all, fields(resource = %resource_id, user = %caller.user_id))]
    pub async fn delete_resource(&self, resource_id: ResourceId, caller: &Caller) -> Result<()> {
        let resource = self.owned(resource_id, caller).await?;

        if self.resources.soft_delete(resource_id).await?.is_none() {
            return Err(CoreError::AccessDenied);
        }
        let grants = self.ledger.purge_resource(resource_id).await?;
        let links = self.links.remove_for_resource(resource_id).await?;

        if let ResourceContent::Stored { locator } = &resource.content {
            self.blobs.delete(locator).await?;
        }

        info!(grants, links, "resource deleted");
        Ok(())
    }

    // ==================== Grants ====================

    /// Give `recipient` access by re-wrapping the caller's own copy of the DEK
    /// for the public key the directory holds for them
    ///
    /// Any current grantee may add a user who has no row on the resource. Only
    /// the owner may replace an existing grant or reactivate a revoked one,
    /// and the owner's own row is never replaced.
    #[instrument(skip_all, fields(resource = %resource_id, from = %caller.user_id, to = %recipient))]
    pub async fn share(
        &self,
        resource_id: ResourceId,
        caller: &Caller,
        caller_private: &PrivateKey,
        recipient: &UserId,
    ) -> Result<AccessGrant> {
        let own = self.resolve(resource_id, caller).await?;
        let resource = self
            .resources
            .get(resource_id)
            .await?
            .ok_or(CoreError::AccessDenied)?;
        if recipient == &resource.owner_id {
            warn!("attempt to replace the owner's grant");
            return Err(CoreError::AccessDenied);
        }

        let recipient_public = self
            .directory
            .get(recipient)
            .await?
            .map(|record| record.public_key)
            .ok_or_else(|| CoreError::InvalidInput("recipient has no registered identity".to_string()))?;

        let wrapped = self
            .wrapper
            .rewrap_for(&own.wrapped, caller_private, &recipient_public)?;

        let grant = if caller.user_id == resource.owner_id {
            self.ledger
                .grant(resource_id, recipient, wrapped, &caller.user_id)
                .await?
        } else {
            match self
                .ledger
                .grant_if_absent(resource_id, recipient, wrapped, &caller.user_id)
                .await?
            {
                Some(grant) => grant,
                None => {
                    warn!("only the owner may replace or reactivate a grant");
                    return Err(CoreError::AccessDenied);
                }
            }
        };

        info!("access granted");
        Ok(grant)
    }

    /// Revoke a user's grant. Owner only; the owner's own grant cannot be revoked.
    ///
    /// Revocation does not re-encrypt the content.
    #[instrument(skip_all, fields(resource = %resource_id, by = %caller.user_id, user = %user))]
    pub async fn revoke(
        &self,
        resource_id: ResourceId,
        caller: &Caller,
        user: &UserId,
    ) -> Result<()> {
        let resource = self.owned(resource_id, caller).await?;
        if &resource.owner_id == user {
            return Err(CoreError::InvalidInput(
                "the owner's grant cannot be revoked".to_string(),
            ));
        }

        self.ledger.revoke(resource_id, user).await?;
        info!("access revoked");
        Ok(())
    }

    /// Every grant on a resource, revoked ones included. Owner only.
    pub async fn list_grants(
        &self,
        resource_id: ResourceId,
        caller: &Caller,
    ) -> Result<Vec<AccessGrant>> {
        self.owned(resource_id, caller).await?;
        self.ledger.list_grants_for_resource(resource_id).await
    }

    // ==================== Share links ====================

    /// Issue a link naming `resource_id` for `receiver_identity`
    ///
    /// The link does not carry key material: the receiver still needs a grant.
    #[instrument(skip_all, fields(resource = %resource_id, issuer = %caller.user_id))]
    pub async fn issue_share_link(
        &self,
        resource_id: ResourceId,
        caller: &Caller,
        receiver_identity: &str,
    ) -> Result<ShareToken> {
        self.resolve(resource_id, caller).await?;
        if self.resources.get(resource_id).await?.is_none() {
            return Err(CoreError::AccessDenied);
        }
        self.links
            .issue(resource_id, receiver_identity, &caller.user_id)
            .await
    }

    /// Resolve a share link for the caller
    #[instrument(skip_all, fields(user = %caller.user_id))]
    pub async fn redeem_share_link(&self, token: &ShareToken, caller: &Caller) -> Result<Resource> {
        let resource_id = self.links.redeem(token, &caller.identity).await?;
        self.resources
            .get(resource_id)
            .await?
            .ok_or(CoreError::AccessDenied)
    }

    // ==================== Helpers ====================

    async fn resolve(&self, resource_id: ResourceId, caller: &Caller) -> Result<AccessGrant> {
        self.ledger
            .resolve_grant(resource_id, &caller.user_id)
            .await
            .inspect_err(|_| warn!(resource = %resource_id, user = %caller.user_id, "access denied"))
    }

    async fn owned(&self, resource_id: ResourceId, caller: &Caller) -> Result<Resource> {
        match self.resources.get(resource_id).await? {
            Some(resource) if resource.owner_id == caller.user_id => Ok(resource),
            _ => {
                warn!(resource = %resource_id, user = %caller.user_id, "owner check failed");
                Err(CoreError::AccessDenied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vault_blobstore::MemoryBlobStore;
    use vault_crypto::{CryptoError, WrappedKey};

    struct User {
        caller: Caller,
        keys: IdentityKeyPair,
    }

    async fn user(vault: &Vault, name: &str) -> User {
        let caller = Caller::new(name, format!("{name}@example.com"));
        let (keys, _) = vault
            .register_identity(&caller, &format!("{name}-pw"))
            .await
            .unwrap();
        User { caller, keys }
    }

    fn vault() -> (Vault, MemoryBlobStore) {
        let blobs = MemoryBlobStore::new();
        let vault = Vault::new(Arc::new(blobs.clone()))
            .with_identity_manager(IdentityManager::new().with_iterations(1_000));
        (vault, blobs)
    }

    fn metadata(name: &str) -> FileMetadata {
        FileMetadata {
            original_file_name: name.into(),
            mime_type: None,
            file_size: 0,
        }
    }

    /// Ledger whose inserts always fail
    struct BrokenLedger;

    #[async_trait]
    impl GrantLedger for BrokenLedger {
        async fn grant(
            &self,
            _resource_id: ResourceId,
            _user_id: &UserId,
            _wrapped: WrappedKey,
            _granted_by: &UserId,
        ) -> Result<AccessGrant> {
            Err(CoreError::InvalidInput("ledger unavailable".to_string()))
        }

        async fn grant_if_absent(
            &self,
            _resource_id: ResourceId,
            _user_id: &UserId,
            _wrapped: WrappedKey,
            _granted_by: &UserId,
        ) -> Result<Option<AccessGrant>> {
            Err(CoreError::InvalidInput("ledger unavailable".to_string()))
        }

        async fn revoke(&self, _resource_id: ResourceId, _user_id: &UserId) -> Result<()> {
            Ok(())
        }

        async fn list_active_grants(&self, _user_id: &UserId) -> Result<Vec<AccessGrant>> {
            Ok(Vec::new())
        }

        async fn resolve_grant(&self, _resource_id: ResourceId, _user_id: &UserId) -> Result<AccessGrant> {
            Err(CoreError::AccessDenied)
        }

        async fn list_grants_for_resource(&self, _resource_id: ResourceId) -> Result<Vec<AccessGrant>> {
            Ok(Vec::new())
        }

        async fn purge_resource(&self, _resource_id: ResourceId) -> Result<usize> {
            Ok(0)
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_register_persists_and_unlocks_by_user() {
        let directory = MemoryIdentityDirectory::new();
        let (vault, _) = vault();
        let vault = vault.with_identity_directory(Arc::new(directory.clone()));
        let alice = Caller::new("alice", "Alice@Example.com");

        let (pair, sealed) = vault.register_identity(&alice, "hunter2").await.unwrap();

        let record = directory.get(&alice.user_id).await.unwrap().unwrap();
        assert_eq!(record.public_key, *pair.public_key());
        assert_eq!(record.sealed_private_key, sealed);
        assert_eq!(record.identity, "alice@example.com");

        let unlocked = vault.unlock_identity(&alice.user_id, "hunter2").await.unwrap();
        assert_eq!(unlocked.public_key(), pair.public_key());
        assert_eq!(
            vault.public_key_for("ALICE@example.com").await.unwrap(),
            *pair.public_key()
        );

        assert!(matches!(
            vault.unlock_identity(&alice.user_id, "hunter3").await,
            Err(CoreError::Crypto(CryptoError::WrongPassword))
        ));
        assert!(matches!(
            vault.unlock_identity(&UserId::from("nobody"), "hunter2").await,
            Err(CoreError::Crypto(CryptoError::WrongPassword))
        ));
        assert!(matches!(
            vault.public_key_for("nobody@example.com").await,
            Err(CoreError::AccessDenied)
        ));
    }

    #[test_log::test(tokio::test)]
    async fn test_register_rejects_bad_input_and_duplicates() {
        let (vault, _) = vault();
        let alice = Caller::new("alice", "alice@example.com");

        assert!(matches!(
            vault.register_identity(&alice, "").await,
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            vault.register_identity(&Caller::new("x", "  "), "pw").await,
            Err(CoreError::InvalidInput(_))
        ));

        let (first, _) = vault.register_identity(&alice, "pw").await.unwrap();
        assert!(matches!(
            vault.register_identity(&alice, "pw").await,
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            vault
                .register_identity(&Caller::new("mallory", "ALICE@example.com"), "pw")
                .await,
            Err(CoreError::InvalidInput(_))
        ));

        // the original keys are still the ones on file
        assert_eq!(vault.public_key_for("alice@example.com").await.unwrap(), *first.public_key());
    }

    #[test_log::test(tokio::test)]
    async fn test_note_roundtrip() {
        let (vault, blobs) = vault();
        let alice = user(&vault, "alice").await;

        let note = vault
            .create_note(&alice.caller, alice.keys.public_key(), b"hello")
            .await
            .unwrap();
        assert_eq!(note.kind, ResourceKind::Note);
        assert!(blobs.is_empty());

        let plaintext = vault
            .open(note.id, &alice.caller, alice.keys.private_key())
            .await
            .unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test_log::test(tokio::test)]
    async fn test_file_roundtrip() {
        let (vault, blobs) = vault();
        let alice = user(&vault, "alice").await;
        let data = vec![0xAB; 4096];

        let file = vault
            .upload_file(&alice.caller, alice.keys.public_key(), &data, metadata("report.bin"))
            .await
            .unwrap();

        assert_eq!(blobs.len(), 1);
        assert_eq!(file.file.as_ref().unwrap().file_size, 4096);
        assert_eq!(
            vault.open(file.id, &alice.caller, alice.keys.private_key()).await.unwrap(),
            data
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_owner_grant_rolls_back() {
        let blobs = MemoryBlobStore::new();
        let resources = MemoryResourceRepository::new();
        let vault = Vault::new(Arc::new(blobs.clone()))
            .with_resource_repository(Arc::new(resources.clone()))
            .with_grant_ledger(Arc::new(BrokenLedger));
        let alice = Caller::new("alice", "alice@example.com");
        let keys = IdentityKeyPair::generate();

        assert!(vault
            .upload_file(&alice, keys.public_key(), b"orphan", metadata("o.bin"))
            .await
            .is_err());
        assert!(vault.create_note(&alice, keys.public_key(), b"orphan").await.is_err());

        assert!(blobs.is_empty());
        assert!(resources.list(&alice.user_id).await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_stranger_cannot_open() {
        let (vault, _) = vault();
        let alice = user(&vault, "alice").await;
        let eve = user(&vault, "eve").await;

        let note = vault
            .create_note(&alice.caller, alice.keys.public_key(), b"secret")
            .await
            .unwrap();

        assert!(matches!(
            vault.open(note.id, &eve.caller, eve.keys.private_key()).await,
            Err(CoreError::AccessDenied)
        ));
        assert!(matches!(
            vault.open(ResourceId::new(), &eve.caller, eve.keys.private_key()).await,
            Err(CoreError::AccessDenied)
        ));
    }

    #[test_log::test(tokio::test)]
    async fn test_share_and_revoke() {
        let (vault, _) = vault();
        let alice = user(&vault, "alice").await;
        let bob = user(&vault, "bob").await;

        let note = vault
            .create_note(&alice.caller, alice.keys.public_key(), b"hi bob")
            .await
            .unwrap();

        vault
            .share(note.id, &alice.caller, alice.keys.private_key(), &bob.caller.user_id)
            .await
            .unwrap();
        assert_eq!(
            vault.open(note.id, &bob.caller, bob.keys.private_key()).await.unwrap(),
            b"hi bob"
        );

        // only the owner revokes
        assert!(matches!(
            vault.revoke(note.id, &bob.caller, &alice.caller.user_id).await,
            Err(CoreError::AccessDenied)
        ));

        vault.revoke(note.id, &alice.caller, &bob.caller.user_id).await.unwrap();
        assert!(matches!(
            vault.open(note.id, &bob.caller, bob.keys.private_key()).await,
            Err(CoreError::AccessDenied)
        ));
        assert!(vault.list_accessible(&bob.caller).await.unwrap().is_empty());

        let grants = vault.list_grants(note.id, &alice.caller).await.unwrap();
        assert_eq!(grants.len(), 2);
        assert_eq!(grants.iter().filter(|g| g.is_revoked).count(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_share_uses_directory_key() {
        let (vault, _) = vault();
        let alice = user(&vault, "alice").await;
        let bob = user(&vault, "bob").await;
        let note = vault
            .create_note(&alice.caller, alice.keys.public_key(), b"for bob")
            .await
            .unwrap();

        let grant = vault
            .share(note.id, &alice.caller, alice.keys.private_key(), &bob.caller.user_id)
            .await
            .unwrap();
        assert!(vault
            .wrapper
            .unwrap_key_for(&grant.wrapped, bob.keys.private_key())
            .is_ok());

        assert!(matches!(
            vault
                .share(note.id, &alice.caller, alice.keys.private_key(), &UserId::from("ghost"))
                .await,
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test_log::test(tokio::test)]
    async fn test_grantee_cannot_replace_owner_grant() {
        let (vault, _) = vault();
        let alice = user(&vault, "alice").await;
        let bob = user(&vault, "bob").await;
        let note = vault
            .create_note(&alice.caller, alice.keys.public_key(), b"still mine")
            .await
            .unwrap();
        vault
            .share(note.id, &alice.caller, alice.keys.private_key(), &bob.caller.user_id)
            .await
            .unwrap();

        assert!(matches!(
            vault
                .share(note.id, &bob.caller, bob.keys.private_key(), &alice.caller.user_id)
                .await,
            Err(CoreError::AccessDenied)
        ));
        // the owner cannot overwrite their own row either
        assert!(matches!(
            vault
                .share(note.id, &alice.caller, alice.keys.private_key(), &alice.caller.user_id)
                .await,
            Err(CoreError::AccessDenied)
        ));

        assert_eq!(
            vault.open(note.id, &alice.caller, alice.keys.private_key()).await.unwrap(),
            b"still mine"
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_only_owner_reactivates_revoked_user() {
        let (vault, _) = vault();
        let alice = user(&vault, "alice").await;
        let bob = user(&vault, "bob").await;
        let carol = user(&vault, "carol").await;
        let note = vault
            .create_note(&alice.caller, alice.keys.public_key(), b"team")
            .await
            .unwrap();

        for member in [&bob, &carol] {
            vault
                .share(note.id, &alice.caller, alice.keys.private_key(), &member.caller.user_id)
                .await
                .unwrap();
        }
        vault.revoke(note.id, &alice.caller, &carol.caller.user_id).await.unwrap();

        assert!(matches!(
            vault
                .share(note.id, &bob.caller, bob.keys.private_key(), &carol.caller.user_id)
                .await,
            Err(CoreError::AccessDenied)
        ));
        assert!(vault.open(note.id, &carol.caller, carol.keys.private_key()).await.is_err());

        vault
            .share(note.id, &alice.caller, alice.keys.private_key(), &carol.caller.user_id)
            .await
            .unwrap();

        // an active grant is not replaceable by another grantee either
        assert!(matches!(
            vault
                .share(note.id, &bob.caller, bob.keys.private_key(), &carol.caller.user_id)
                .await,
            Err(CoreError::AccessDenied)
        ));
        let carol_grant = vault
            .list_grants(note.id, &alice.caller)
            .await
            .unwrap()
            .into_iter()
            .find(|g| g.user_id == carol.caller.user_id)
            .unwrap();
        assert_eq!(carol_grant.granted_by, alice.caller.user_id);

        assert_eq!(
            vault.open(note.id, &carol.caller, carol.keys.private_key()).await.unwrap(),
            b"team"
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_owner_grant_not_revocable() {
        let (vault, _) = vault();
        let alice = user(&vault, "alice").await;
        let note = vault
            .create_note(&alice.caller, alice.keys.public_key(), b"mine")
            .await
            .unwrap();

        assert!(matches!(
            vault.revoke(note.id, &alice.caller, &alice.caller.user_id).await,
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_removes_everything() {
        let (vault, blobs) = vault();
        let alice = user(&vault, "alice").await;
        let bob = user(&vault, "bob").await;

        let file = vault
            .upload_file(
                &alice.caller,
                alice.keys.public_key(),
                b"bytes",
                FileMetadata {
                    original_file_name: "a.txt".into(),
                    mime_type: Some("text/plain".into()),
                    file_size: 5,
                },
            )
            .await
            .unwrap();
        vault
            .share(file.id, &alice.caller, alice.keys.private_key(), &bob.caller.user_id)
            .await
            .unwrap();
        let token = vault
            .issue_share_link(file.id, &alice.caller, &bob.caller.identity)
            .await
            .unwrap();

        assert!(matches!(
            vault.delete_resource(file.id, &bob.caller).await,
            Err(CoreError::AccessDenied)
        ));
        vault.delete_resource(file.id, &alice.caller).await.unwrap();

        assert!(blobs.is_empty());
        assert!(vault.list_accessible(&alice.caller).await.unwrap().is_empty());
        assert!(vault.list_accessible(&bob.caller).await.unwrap().is_empty());
        assert!(vault.redeem_share_link(&token, &bob.caller).await.is_err());
        assert!(vault
            .open(file.id, &alice.caller, alice.keys.private_key())
            .await
            .is_err());
    }

    #[test_log::test(tokio::test)]
    async fn test_share_link_requires_grant() {
        let (vault, _) = vault();
        let alice = user(&vault, "alice").await;
        let eve = user(&vault, "eve").await;
        let note = vault
            .create_note(&alice.caller, alice.keys.public_key(), b"x")
            .await
            .unwrap();

        assert!(matches!(
            vault.issue_share_link(note.id, &eve.caller, "eve@example.com").await,
            Err(CoreError::AccessDenied)
        ));

        let token = vault
            .issue_share_link(note.id, &alice.caller, "Eve@Example.com")
            .await
            .unwrap();
        let resource = vault.redeem_share_link(&token, &eve.caller).await.unwrap();
        assert_eq!(resource.id, note.id);

        // naming the resource is not access to it
        assert!(vault.open(note.id, &eve.caller, eve.keys.private_key()).await.is_err());
    }

    #[test_log::test(tokio::test)]
    async fn test_from_config() {
        let config = VaultConfig {
            kdf_iterations: 1_000,
            ..Default::default()
        };
        let vault = Vault::from_config(&config).await.unwrap();
        let alice = Caller::new("alice", "alice@example.com");
        let (_, sealed) = vault.register_identity(&alice, "pw").await.unwrap();
        assert!(vault.unlock_identity(&alice.user_id, "pw").await.is_ok());
        assert!(vault.unlock_sealed(&sealed, "pw").await.is_ok());
    }
}
