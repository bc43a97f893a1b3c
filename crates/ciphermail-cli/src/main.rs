//! Ciphermail CLI.
//!
//! Local key management, message encryption and an in-process ledger
//! demo. No network access.

mod commands;
mod output;

use std::path::PathBuf;

use ciphermail_types::config::AppConfig;
use clap::{Parser, Subcommand};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Ciphermail: end-to-end encrypted messages with on-chain delivery proofs.
#[derive(Parser)]
#[command(name = "ciphermail", version, about)]
struct Cli {
    /// Output in JSON format (no colors, machine-readable).
    #[arg(long, global = true)]
    json: bool,

    /// Path to a JSON config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an identity key and write it password-wrapped.
    Keygen(commands::keys::KeygenArgs),
    /// Print the public key stored in a key file.
    Pubkey(commands::keys::PubkeyArgs),
    /// Encrypt a message to a public key and print the wire blob.
    Encrypt(commands::message::EncryptArgs),
    /// Decrypt a wire blob with a key file.
    Decrypt(commands::message::DecryptArgs),
    /// Print the content hash of a wire blob.
    Hash(commands::message::HashArgs),
    /// Run the Alice/Bob delivery scenario against an in-process ledger.
    Demo,
}

// ---------------------------------------------------------------------------
// Global options passed to every command handler
// ---------------------------------------------------------------------------

/// Shared options threaded into command handlers.
pub struct GlobalOpts {
    pub json: bool,
    pub config: AppConfig,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => {
            let opts = GlobalOpts {
                json: cli.json,
                config,
            };
            dispatch(opts, cli.command).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        output::print_error(&e, cli.json);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&std::path::Path>) -> std::result::Result<AppConfig, String> {
    match path {
        Some(path) => AppConfig::load(path).map_err(|e| e.to_string()),
        None => Ok(AppConfig::default()),
    }
}

async fn dispatch(opts: GlobalOpts, cmd: Commands) -> std::result::Result<(), String> {
    match cmd {
        Commands::Keygen(args) => commands::keys::keygen(args, &opts),
        Commands::Pubkey(args) => commands::keys::pubkey(args, &opts),
        Commands::Encrypt(args) => commands::message::encrypt(args, &opts),
        Commands::Decrypt(args) => commands::message::decrypt(args, &opts),
        Commands::Hash(args) => commands::message::hash(args, &opts),
        Commands::Demo => commands::demo::run(&opts).await,
    }
}
