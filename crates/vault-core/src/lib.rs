//! # Vault Core
//!
//! Access control for the zero-knowledge vault.
//!
//! This crate provides:
//! - **Identity Directory**: public keys and password-sealed private keys per user
//! - **Resources**: encrypted notes (inline ciphertext) and files (ciphertext in a blob store)
//! - **Access Grant Ledger**: one wrapped DEK per `(resource, user)`, soft-revocable
//! - **Share Links**: random tokens bound to a resource and a receiver identity
//! - **Vault**: the operations a client runs, composed over the stores above
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                 Vault                   │
//! ├─────────────────────────────────────────┤
//! │ Directory │ Resources │ Grants │ Links  │
//! ├─────────────────────────────────────────┤
//! │  vault-crypto     │     BlobStore       │
//! └─────────────────────────────────────────┘
//! ```

pub mod capability;
pub mod config;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod model;
pub mod repository;
pub mod vault;

pub use capability::{CapabilityStore, MemoryCapabilityStore, ShareCapabilities};
pub use config::{BlobStoreKind, VaultConfig};
pub use directory::{IdentityDirectory, IdentityRecord, MemoryIdentityDirectory};
pub use error::{CoreError, Result};
pub use ledger::{GrantLedger, MemoryGrantLedger};
pub use model::{
    AccessGrant, Caller, FileMetadata, Resource, ResourceContent, ResourceId, ResourceKind,
    ShareCapability, ShareToken, UserId, normalize_identity,
};
pub use repository::{MemoryResourceRepository, ResourceRepository};
pub use vault::{AccessibleResource, Vault};
