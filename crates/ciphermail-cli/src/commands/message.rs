//! Message commands: encrypt, decrypt, hash.

use std::path::{Path, PathBuf};

use clap::Args;
use ciphermail_crypto::ecdh::X25519PublicKey;
use ciphermail_protocol::commitment::content_hash;
use ciphermail_protocol::e2e;
use ciphermail_protocol::envelope::EncryptedMessage;
use ciphermail_wallet::wallet::IdentityWallet;

use crate::commands::require_password;
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct EncryptArgs {
    /// Sender key file.
    #[arg(long)]
    key: PathBuf,
    /// Recipient public key (64 hex chars).
    #[arg(long)]
    to: String,
    /// Message text.
    #[arg(long)]
    message: String,
    /// Password of the sender key file.
    #[arg(long, env = "CIPHERMAIL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Args)]
pub struct DecryptArgs {
    /// Recipient key file.
    #[arg(long)]
    key: PathBuf,
    /// Wire blob (hex).
    #[arg(long)]
    blob: String,
    /// Password of the recipient key file.
    #[arg(long, env = "CIPHERMAIL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Args)]
pub struct HashArgs {
    /// Wire blob (hex).
    #[arg(long)]
    blob: String,
}

fn open_wallet(
    key: &Path,
    password: Option<String>,
) -> std::result::Result<IdentityWallet, String> {
    let password = require_password(password)?;
    let mut wallet = IdentityWallet::load(key).map_err(|e| e.to_string())?;
    wallet
        .unlock(&password)
        .map_err(|_| "wrong password or corrupted key file".to_string())?;
    Ok(wallet)
}

pub fn encrypt(args: EncryptArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let recipient = X25519PublicKey::from_bytes(output::parse_public_key(&args.to)?);
    let wallet = open_wallet(&args.key, args.password)?;
    let secret = wallet.secret().map_err(|e| e.to_string())?;

    let blob = e2e::encrypt(args.message.as_bytes(), secret, &recipient)
        .map_err(|e| e.to_string())?
        .serialize();

    output::print_fields(
        &[
            ("blob", hex::encode(&blob)),
            ("content_hash", content_hash(&blob).to_string()),
        ],
        opts.json,
    );
    Ok(())
}

pub fn decrypt(args: DecryptArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let bytes = output::parse_blob(&args.blob)?;
    let message = EncryptedMessage::deserialize(&bytes).map_err(|e| e.to_string())?;
    let wallet = open_wallet(&args.key, args.password)?;

    let plaintext = wallet
        .decrypt_any(&message)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "message could not be verified".to_string())?;

    output::print_fields(
        &[
            ("plaintext", String::from_utf8_lossy(&plaintext).into_owned()),
            ("sender_public_key", hex::encode(message.sender_public_key)),
        ],
        opts.json,
    );
    Ok(())
}

pub fn hash(args: HashArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let bytes = output::parse_blob(&args.blob)?;
    output::print_fields(&[("content_hash", content_hash(&bytes).to_string())], opts.json);
    Ok(())
}
