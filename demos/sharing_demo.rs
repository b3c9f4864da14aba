//! Walkthrough of sharing in the vault
//!
//! This example demonstrates:
//! 1. Registering identities whose private keys are sealed under a password
//! 2. Uploading an encrypted file to a filesystem blob store
//! 3. Sharing it by re-wrapping the file key for another user
//! 4. Share links bound to the receiver's identity
//! 5. Revocation and deletion
//!
//! Run with: cargo run --example sharing_demo

use vault_core::{BlobStoreKind, Caller, CoreError, FileMetadata, Vault, VaultConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("===========================================");
    println!("   Vault Sharing Demo");
    println!("===========================================\n");

    let blob_dir = std::env::temp_dir().join(format!("vault-demo-{}", std::process::id()));
    let config = VaultConfig {
        blob_store: BlobStoreKind::Filesystem(blob_dir.clone()),
        ..Default::default()
    };
    let vault = Vault::from_config(&config).await?;
    println!("🗄️  Blobs stored under {}\n", blob_dir.display());

    // ==================== Identities ====================

    let alice = Caller::new("alice", "alice@example.com");
    let bob = Caller::new("bob", "bob@example.com");

    let (alice_keys, alice_sealed) = vault.register_identity(&alice, "alice-password").await?;
    let (bob_keys, _) = vault.register_identity(&bob, "bob-password").await?;
    println!("👤 Alice and Bob registered");
    println!(
        "   Alice's sealed key: {}",
        serde_json::to_string(&alice_sealed)?
    );

    // Alice logs in again later with just a user id and password
    let alice_keys = {
        let unlocked = vault.unlock_identity(&alice.user_id, "alice-password").await?;
        assert_eq!(unlocked.public_key(), alice_keys.public_key());
        unlocked
    };
    println!("🔓 Alice unlocked the private key from the directory\n");

    // ==================== Upload ====================

    let report = b"Quarterly numbers: up and to the right.";
    let file = vault
        .upload_file(
            &alice,
            alice_keys.public_key(),
            report,
            FileMetadata {
                original_file_name: "report.txt".into(),
                mime_type: Some("text/plain".into()),
                file_size: report.len() as u64,
            },
        )
        .await?;
    println!("📤 Alice uploaded report.txt as {}", file.id);

    // ==================== Share ====================

    vault
        .share(file.id, &alice, alice_keys.private_key(), &bob.user_id)
        .await?;
    let token = vault
        .issue_share_link(file.id, &alice, &bob.identity)
        .await?;
    println!("🔗 Alice shared it with Bob (link token {}...)", &token.as_str()[..8]);

    let linked = vault.redeem_share_link(&token, &bob).await?;
    let plaintext = vault.open(linked.id, &bob, bob_keys.private_key()).await?;
    println!("📥 Bob opened: \"{}\"\n", String::from_utf8_lossy(&plaintext));

    // ==================== Revoke ====================

    vault.revoke(file.id, &alice, &bob.user_id).await?;
    match vault.open(file.id, &bob, bob_keys.private_key()).await {
        Err(CoreError::AccessDenied) => println!("🚫 After revocation Bob is denied"),
        other => anyhow::bail!("unexpected result after revocation: {:?}", other.map(|p| p.len())),
    }

    // ==================== Delete ====================

    vault.delete_resource(file.id, &alice).await?;
    println!("🗑️  Alice deleted the file; its blob and grants are gone");

    std::fs::remove_dir_all(&blob_dir).ok();
    println!("\n✅ Demo completed successfully!");
    Ok(())
}
