//! Resource records

use crate::{
    CoreError, Result,
    model::{Resource, ResourceId, UserId},
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

/// Persistence for resource records
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Store a new resource; rejects records whose kind and content disagree
    async fn insert(&self, resource: Resource) -> Result<()>;

    /// Fetch a live resource. Deleted and unknown ids are both `None`.
    async fn get(&self, id: ResourceId) -> Result<Option<Resource>>;

    /// Hard-remove a record (used to undo a failed creation)
    async fn remove(&self, id: ResourceId) -> Result<()>;

    /// Mark a resource deleted; returns the record as it was before
    async fn soft_delete(&self, id: ResourceId) -> Result<Option<Resource>>;

    /// Live resources owned by a user
    async fn list(&self, owner_id: &UserId) -> Result<Vec<Resource>>;
}

/// In-memory resource repository
#[derive(Clone, Default)]
pub struct MemoryResourceRepository {
    resources: Arc<DashMap<ResourceId, Resource>>,
}

impl MemoryResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceRepository for MemoryResourceRepository {
    async fn insert(&self, resource: Resource) -> Result<()> {
        resource.validate()?;
        if self.resources.contains_key(&resource.id) {
            return Err(CoreError::InvalidInput(format!("resource {} already exists", resource.id)));
        }
        self.resources.insert(resource.id, resource);
        Ok(())
    }

    async fn get(&self, id: ResourceId) -> Result<Option<Resource>> {
        Ok(self
            .resources
            .get(&id)
            .filter(|r| r.is_live())
            .map(|r| r.clone()))
    }

    async fn remove(&self, id: ResourceId) -> Result<()> {
        self.resources.remove(&id);
        Ok(())
    }

    async fn soft_delete(&self, id: ResourceId) -> Result<Option<Resource>> {
        let Some(mut resource) = self.resources.get_mut(&id) else {
            return Ok(None);
        };
        if resource.is_deleted {
            return Ok(None);
        }
        let before = resource.clone();
        resource.is_deleted = true;
        resource.deleted_at = Some(Utc::now());
        Ok(Some(before))
    }

    async fn list(&self, owner_id: &UserId) -> Result<Vec<Resource>> {
        let mut resources: Vec<Resource> = self
            .resources
            .iter()
            .filter(|r| r.is_live() && &r.owner_id == owner_id)
            .map(|r| r.clone())
            .collect();
        resources.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResourceContent, ResourceKind};
    use vault_crypto::Nonce;

    fn note(owner: &str) -> Resource {
        Resource::new(
            UserId::from(owner),
            ResourceKind::Note,
            ResourceContent::Inline { ciphertext: vec![0u8; 20] },
            Nonce::generate(),
            None,
        )
    }

    #[tokio::test]
    async fn test_insert_get_list() {
        let repo = MemoryResourceRepository::new();
        let a = note("alice");
        let id = a.id;
        repo.insert(a).await.unwrap();
        repo.insert(note("bob")).await.unwrap();

        assert!(repo.get(id).await.unwrap().is_some());
        assert_eq!(repo.list(&UserId::from("alice")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_resource_rejected() {
        let repo = MemoryResourceRepository::new();
        let mut bad = note("alice");
        bad.kind = ResourceKind::File;
        assert!(matches!(repo.insert(bad).await, Err(CoreError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_resource() {
        let repo = MemoryResourceRepository::new();
        let a = note("alice");
        let id = a.id;
        repo.insert(a).await.unwrap();

        assert!(repo.soft_delete(id).await.unwrap().is_some());
        assert!(repo.get(id).await.unwrap().is_none());
        assert!(repo.list(&UserId::from("alice")).await.unwrap().is_empty());
        // second delete sees nothing
        assert!(repo.soft_delete(id).await.unwrap().is_none());
    }
}
