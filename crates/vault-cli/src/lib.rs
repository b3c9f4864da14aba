//! # Vault CLI
//!
//! Local front end for the vault's client-side cryptography.
//!
//! - `identity new`: create a P-256 identity sealed under a password
//! - `seal`: encrypt a file once and wrap its key for several recipients
//! - `open`: unlock an identity and decrypt a sealed file
//! - `demo`: run the share and revoke scenario against an in-process vault

pub mod commands;
pub mod files;

pub use files::{IdentityFile, SealedFile};
