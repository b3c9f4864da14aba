//! Share links
//!
//! A share link is a random bearer token bound to one resource and one
//! receiver identity. Redeeming it only tells the receiver *which* resource
//! was shared with them; decryption still requires their own grant.

use crate::{
    CoreError, Result,
    model::{ResourceId, ShareCapability, ShareToken, UserId, normalize_identity},
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, mapref::entry::Entry};
use rand::{RngCore, rngs::OsRng};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Token entropy in bytes (128 bits)
pub const TOKEN_BYTES: usize = 16;

const MAX_ISSUE_ATTEMPTS: usize = 4;

/// Persistence for share capabilities
#[async_trait]
pub trait CapabilityStore: Send + Sync {
    /// Store a capability. Returns `false` if the token is already taken.
    async fn insert(&self, capability: ShareCapability) -> Result<bool>;

    /// Look up a capability by token
    async fn get(&self, token: &ShareToken) -> Result<Option<ShareCapability>>;

    /// Remove every capability for a resource
    async fn remove_for_resource(&self, resource_id: ResourceId) -> Result<usize>;
}

/// In-memory capability store
#[derive(Clone, Default)]
pub struct MemoryCapabilityStore {
    capabilities: Arc<DashMap<ShareToken, ShareCapability>>,
}

impl MemoryCapabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[async_trait]
impl CapabilityStore for MemoryCapabilityStore {
    async fn insert(&self, capability: ShareCapability) -> Result<bool> {
        match self.capabilities.entry(capability.share_token.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(capability);
                Ok(true)
            }
        }
    }

    async fn get(&self, token: &ShareToken) -> Result<Option<ShareCapability>> {
        Ok(self.capabilities.get(token).map(|c| c.clone()))
    }

    async fn remove_for_resource(&self, resource_id: ResourceId) -> Result<usize> {
        let before = self.capabilities.len();
        self.capabilities.retain(|_, c| c.resource_id != resource_id);
        Ok(before.saturating_sub(self.capabilities.len()))
    }
}

/// Issues and redeems share links over a [`CapabilityStore`]
#[derive(Clone)]
pub struct ShareCapabilities {
    store: Arc<dyn CapabilityStore>,
}

impl ShareCapabilities {
    pub fn new(store: Arc<dyn CapabilityStore>) -> Self {
        Self { store }
    }

    /// Create a token binding `resource_id` to `receiver_identity`
    #[instrument(skip_all, fields(resource = %resource_id, issuer = %issuer))]
    pub async fn issue(
        &self,
        resource_id: ResourceId,
        receiver_identity: &str,
        issuer: &UserId,
    ) -> Result<ShareToken> {
        let bound_receiver = normalize_identity(receiver_identity);
        if bound_receiver.is_empty() {
            return Err(CoreError::InvalidInput("receiver identity is empty".to_string()));
        }

        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let token = random_token()?;
            let capability = ShareCapability {
                share_token: token.clone(),
                resource_id,
                bound_receiver: bound_receiver.clone(),
                created_by: issuer.clone(),
                created_at: Utc::now(),
            };
            if self.store.insert(capability).await? {
                return Ok(token);
            }
        }

        Err(CoreError::InvalidInput("could not allocate a unique share token".to_string()))
    }

    /// Resolve a token for the caller's authenticated identity
    ///
    /// Unknown tokens and identity mismatches both yield `AccessDenied`.
    #[instrument(skip_all)]
    pub async fn redeem(&self, token: &ShareToken, caller_identity: &str) -> Result<ResourceId> {
        match self.store.get(token).await? {
            Some(capability) if capability.bound_receiver == normalize_identity(caller_identity) => {
                Ok(capability.resource_id)
            }
            _ => {
                warn!("share link redemption denied");
                Err(CoreError::AccessDenied)
            }
        }
    }

    /// Forget every link to a deleted resource
    pub async fn remove_for_resource(&self, resource_id: ResourceId) -> Result<usize> {
        self.store.remove_for_resource(resource_id).await
    }
}

fn random_token() -> Result<ShareToken> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| vault_crypto::CryptoError::KeyGeneration(e.to_string()))?;
    Ok(ShareToken::from_hex(hex::encode(bytes)))
}
