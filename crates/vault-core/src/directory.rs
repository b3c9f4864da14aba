//! Identity directory
//!
//! One record per user: the public key others wrap keys for, and the
//! password-sealed private key the user downloads to unlock. Nothing stored
//! here decrypts without the user's password.

use crate::{
    Result,
    model::{UserId, normalize_identity},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use vault_crypto::{EncryptedPrivateKey, PublicKey};

/// A registered user's key material
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub user_id: UserId,
    /// Normalized e-mail (or other login identity)
    pub identity: String,
    pub public_key: PublicKey,
    pub sealed_private_key: EncryptedPrivateKey,
    pub created_at: DateTime<Utc>,
}

/// Persistence for identity records
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Store a new record. Returns `false` if the user id or the identity is taken.
    async fn insert(&self, record: IdentityRecord) -> Result<bool>;

    /// Record for a user id
    async fn get(&self, user_id: &UserId) -> Result<Option<IdentityRecord>>;

    /// Record for a login identity, compared after normalization
    async fn find_by_identity(&self, identity: &str) -> Result<Option<IdentityRecord>>;
}

/// In-memory identity directory
#[derive(Clone, Default)]
pub struct MemoryIdentityDirectory {
    records: Arc<DashMap<UserId, IdentityRecord>>,
    by_identity: Arc<DashMap<String, UserId>>,
}

impl MemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl IdentityDirectory for MemoryIdentityDirectory {
    #[instrument(skip_all, fields(user = %record.user_id))]
    async fn insert(&self, record: IdentityRecord) -> Result<bool> {
        let identity = normalize_identity(&record.identity);

        // claim the identity first so two users cannot race for it
        match self.by_identity.entry(identity.clone()) {
            Entry::Occupied(_) => return Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record.user_id.clone());
            }
        }

        match self.records.entry(record.user_id.clone()) {
            Entry::Occupied(_) => {
                self.by_identity.remove(&identity);
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(IdentityRecord { identity, ..record });
                debug!("identity stored");
                Ok(true)
            }
        }
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<IdentityRecord>> {
        Ok(self.records.get(user_id).map(|r| r.clone()))
    }

    async fn find_by_identity(&self, identity: &str) -> Result<Option<IdentityRecord>> {
        let Some(user_id) = self
            .by_identity
            .get(&normalize_identity(identity))
            .map(|u| u.clone())
        else {
            return Ok(None);
        };
        self.get(&user_id).await
    }
}
