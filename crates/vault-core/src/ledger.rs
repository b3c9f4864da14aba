//! Access grant ledger
//!
//! One row per `(resource, user)`. A row is either active or revoked; a
//! revoked row only becomes active again through a fresh [`GrantLedger::grant`],
//! which replaces the wrapped key material.

use crate::{
    CoreError, Result,
    model::{AccessGrant, ResourceId, UserId},
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::Arc;
use tracing::{debug, instrument};
use vault_crypto::WrappedKey;

/// Persistence for access grants
#[async_trait]
pub trait GrantLedger: Send + Sync {
    /// Insert or replace the grant for `(resource, user)`
    ///
    /// The stored row always ends up active with the given wrap material and
    /// a new `granted_at`.
    async fn grant(
        &self,
        resource_id: ResourceId,
        user_id: &UserId,
        wrapped: WrappedKey,
        granted_by: &UserId,
    ) -> Result<AccessGrant>;

    /// Insert the grant only if no row exists for `(resource, user)`, active
    /// or revoked. Returns `None` and leaves the ledger untouched otherwise.
    async fn grant_if_absent(
        &self,
        resource_id: ResourceId,
        user_id: &UserId,
        wrapped: WrappedKey,
        granted_by: &UserId,
    ) -> Result<Option<AccessGrant>>;

    /// Mark the grant revoked. Missing rows and already revoked rows are left as they are.
    async fn revoke(&self, resource_id: ResourceId, user_id: &UserId) -> Result<()>;

    /// All active grants held by a user
    async fn list_active_grants(&self, user_id: &UserId) -> Result<Vec<AccessGrant>>;

    /// The active grant for `(resource, user)`, or `AccessDenied`
    async fn resolve_grant(&self, resource_id: ResourceId, user_id: &UserId) -> Result<AccessGrant>;

    /// Every grant on a resource, revoked ones included
    async fn list_grants_for_resource(&self, resource_id: ResourceId) -> Result<Vec<AccessGrant>>;

    /// Drop every grant on a resource. Returns how many rows were removed.
    async fn purge_resource(&self, resource_id: ResourceId) -> Result<usize>;
}

/// In-memory grant ledger
#[derive(Clone, Default)]
pub struct MemoryGrantLedger {
    grants: Arc<DashMap<(ResourceId, UserId), AccessGrant>>,
}

impl MemoryGrantLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, revoked included
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[async_trait]
impl GrantLedger for MemoryGrantLedger {
    #[instrument(skip_all, fields(resource = %resource_id, user = %user_id))]
    async fn grant(
        &self,
        resource_id: ResourceId,
        user_id: &UserId,
        wrapped: WrappedKey,
        granted_by: &UserId,
    ) -> Result<AccessGrant> {
        let grant = fresh_grant(resource_id, user_id, wrapped, granted_by);

        match self.grants.entry((resource_id, user_id.clone())) {
            Entry::Occupied(mut existing) => {
                debug!(was_revoked = existing.get().is_revoked, "replacing grant");
                existing.insert(grant.clone());
            }
            Entry::Vacant(slot) => {
                slot.insert(grant.clone());
            }
        }

        Ok(grant)
    }

    #[instrument(skip_all, fields(resource = %resource_id, user = %user_id))]
    async fn grant_if_absent(
        &self,
        resource_id: ResourceId,
        user_id: &UserId,
        wrapped: WrappedKey,
        granted_by: &UserId,
    ) -> Result<Option<AccessGrant>> {
        match self.grants.entry((resource_id, user_id.clone())) {
            Entry::Occupied(existing) => {
                debug!(was_revoked = existing.get().is_revoked, "row exists, not replacing");
                Ok(None)
            }
            Entry::Vacant(slot) => {
                let grant = fresh_grant(resource_id, user_id, wrapped, granted_by);
                slot.insert(grant.clone());
                Ok(Some(grant))
            }
        }
    }

    #[instrument(skip_all, fields(resource = %resource_id, user = %user_id))]
    async fn revoke(&self, resource_id: ResourceId, user_id: &UserId) -> Result<()> {
        if let Some(mut grant) = self.grants.get_mut(&(resource_id, user_id.clone())) {
            if !grant.is_revoked {
                grant.is_revoked = true;
                grant.revoked_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn list_active_grants(&self, user_id: &UserId) -> Result<Vec<AccessGrant>> {
        Ok(self
            .grants
            .iter()
            .filter(|entry| &entry.key().1 == user_id && entry.value().is_active())
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn resolve_grant(&self, resource_id: ResourceId, user_id: &UserId) -> Result<AccessGrant> {
        match self.grants.get(&(resource_id, user_id.clone())) {
            Some(grant) if grant.is_active() => Ok(grant.clone()),
            _ => Err(CoreError::AccessDenied),
        }
    }

    async fn list_grants_for_resource(&self, resource_id: ResourceId) -> Result<Vec<AccessGrant>> {
        let mut grants: Vec<AccessGrant> = self
            .grants
            .iter()
            .filter(|entry| entry.key().0 == resource_id)
            .map(|entry| entry.value().clone())
            .collect();
        grants.sort_by(|a, b| a.granted_at.cmp(&b.granted_at));
        Ok(grants)
    }

    #[instrument(skip_all, fields(resource = %resource_id))]
    async fn purge_resource(&self, resource_id: ResourceId) -> Result<usize> {
        let before = self.grants.len();
        self.grants.retain(|(resource, _), _| *resource != resource_id);
        Ok(before.saturating_sub(self.grants.len()))
    }
}

fn fresh_grant(
    resource_id: ResourceId,
    user_id: &UserId,
    wrapped: WrappedKey,
    granted_by: &UserId,
) -> AccessGrant {
    AccessGrant {
        resource_id,
        user_id: user_id.clone(),
        wrapped,
        granted_by: granted_by.clone(),
        granted_at: Utc::now(),
        is_revoked: false,
        revoked_at: None,
    }
}
