//! Vault - zero-knowledge envelope encryption from the command line

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vault_cli::commands;
use vault_core::{BlobStoreKind, VaultConfig};
use vault_crypto::PBKDF2_ITERATIONS;

#[derive(Parser, Debug)]
#[command(name = "vault")]
#[command(about = "Envelope encryption with password-sealed P-256 identities")]
#[command(version)]
struct Args {
    /// Password sealing the identity's private key
    #[arg(long, global = true, env = "VAULT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// PBKDF2 iterations for new identities
    #[arg(long, global = true, default_value_t = PBKDF2_ITERATIONS, env = "VAULT_KDF_ITERATIONS")]
    kdf_iterations: u32,

    /// Directory for ciphertext blobs (in-memory when unset)
    #[arg(long, global = true, env = "VAULT_BLOB_DIR")]
    blob_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, env = "VAULT_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage identities
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },
    /// Encrypt a file for one or more public keys
    Seal {
        /// Recipient public key (JWK file); repeatable
        #[arg(long = "to", required = true)]
        to: Vec<PathBuf>,
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Decrypt a sealed file
    Open {
        /// Identity file created by `vault identity new`
        #[arg(long)]
        identity: PathBuf,
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Run the share/revoke walkthrough
    Demo,
}

#[derive(Subcommand, Debug)]
enum IdentityAction {
    /// Create an identity file and export its public key
    New {
        /// Where to write the identity; the public JWK goes next to it
        #[arg(short, long, default_value = "identity.json")]
        out: PathBuf,
    },
}

impl Args {
    fn password(&self) -> anyhow::Result<&str> {
        self.password
            .as_deref()
            .context("a password is required (--password or VAULT_PASSWORD)")
    }

    fn config(&self) -> VaultConfig {
        VaultConfig {
            kdf_iterations: self.kdf_iterations,
            blob_store: match &self.blob_dir {
                Some(dir) => BlobStoreKind::Filesystem(dir.clone()),
                None => BlobStoreKind::Memory,
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vault={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.config();
    config.validate()?;

    match &args.command {
        Command::Identity {
            action: IdentityAction::New { out },
        } => {
            let public = commands::identity_new(&config, args.password()?, out).await?;
            println!("{}", public.display());
        }
        Command::Seal { to, input, output } => commands::seal(to, input, output)?,
        Command::Open {
            identity,
            input,
            output,
        } => commands::open(identity, args.password()?, input, output).await?,
        Command::Demo => {
            if args.blob_dir.is_none() {
                tracing::warn!("Using in-memory storage - data will NOT persist");
            }
            commands::demo(&config).await?
        }
    }

    Ok(())
}
