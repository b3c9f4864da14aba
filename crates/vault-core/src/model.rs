//! Vault records: resources, access grants and share capabilities

use crate::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vault_blobstore::Locator;
use vault_crypto::{CONTENT_ALGORITHM, Nonce, WrappedKey, keys::base64_serde};

/// Identifier of a resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(Uuid);

impl ResourceId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the string form
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| CoreError::InvalidInput("malformed resource id".to_string()))
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a user, as issued by the session provider
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authenticated caller of an operation
///
/// Produced by the external session provider; the vault trusts it as given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    /// Stable user id
    pub user_id: UserId,
    /// Externally verified identity (e-mail address) used to match share links
    pub identity: String,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            identity: identity.into(),
        }
    }
}

/// What a resource holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Short text, ciphertext stored inline
    Note,
    /// Binary file, ciphertext in the blob store
    File,
}

/// Where a resource's ciphertext lives
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "storage", rename_all = "lowercase")]
pub enum ResourceContent {
    /// Ciphertext kept in the resource record
    Inline {
        #[serde(with = "base64_serde")]
        ciphertext: Vec<u8>,
    },
    /// Ciphertext kept in the blob store
    Stored { locator: Locator },
}

/// Plaintext-side metadata for file resources
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub original_file_name: String,
    pub mime_type: Option<String>,
    pub file_size: u64,
}

/// An encrypted note or file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub owner_id: UserId,
    pub kind: ResourceKind,
    pub content: ResourceContent,
    /// IV the content was encrypted with
    pub iv: Nonce,
    pub content_algo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileMetadata>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Resource {
    /// Check that the kind matches where the content lives
    pub fn validate(&self) -> Result<()> {
        match (&self.kind, &self.content, &self.file) {
            (ResourceKind::Note, ResourceContent::Inline { .. }, None) => Ok(()),
            (ResourceKind::File, ResourceContent::Stored { .. }, Some(_)) => Ok(()),
            (ResourceKind::Note, _, _) => Err(CoreError::InvalidInput(
                "notes keep their ciphertext inline and carry no file metadata".to_string(),
            )),
            (ResourceKind::File, _, _) => Err(CoreError::InvalidInput(
                "files need a blob locator and file metadata".to_string(),
            )),
        }
    }

    /// Whether the resource is visible
    pub fn is_live(&self) -> bool {
        !self.is_deleted
    }

    pub(crate) fn new(
        owner_id: UserId,
        kind: ResourceKind,
        content: ResourceContent,
        iv: Nonce,
        file: Option<FileMetadata>,
    ) -> Self {
        Self {
            id: ResourceId::new(),
            owner_id,
            kind,
            content,
            iv,
            content_algo: CONTENT_ALGORITHM.to_string(),
            file,
            created_at: Utc::now(),
            is_deleted: false,
            deleted_at: None,
        }
    }
}

/// A user's wrapped copy of a resource's DEK
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub resource_id: ResourceId,
    pub user_id: UserId,
    #[serde(flatten)]
    pub wrapped: WrappedKey,
    pub granted_by: UserId,
    pub granted_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl AccessGrant {
    /// Whether this grant currently allows decryption
    pub fn is_active(&self) -> bool {
        !self.is_revoked
    }
}

/// Bearer token naming one (resource, receiver) binding
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareToken(String);

impl ShareToken {
    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    /// Parse a token received from a link
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() < 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidInput("malformed share token".to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ShareToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ShareToken(<redacted>)")
    }
}

impl std::fmt::Display for ShareToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A share link binding a token to one resource and one receiver
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareCapability {
    pub share_token: ShareToken,
    pub resource_id: ResourceId,
    /// Normalized receiver identity (see [`normalize_identity`])
    pub bound_receiver: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Canonical form for comparing e-mail style identities
pub fn normalize_identity(identity: &str) -> String {
    identity.trim().to_ascii_lowercase()
}
