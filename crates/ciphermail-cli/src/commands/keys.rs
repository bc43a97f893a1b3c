//! Key commands: keygen, pubkey.

use std::path::PathBuf;

use clap::Args;
use ciphermail_wallet::key_file::read_key_file;
use ciphermail_wallet::wallet::IdentityWallet;

use crate::commands::require_password;
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct KeygenArgs {
    /// Key file to write.
    #[arg(long)]
    out: PathBuf,
    /// Password used to wrap the private key.
    #[arg(long, env = "CIPHERMAIL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Overwrite an existing key file.
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
pub struct PubkeyArgs {
    /// Key file to read.
    #[arg(long)]
    key: PathBuf,
}

pub fn keygen(args: KeygenArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    if args.out.exists() && !args.force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            args.out.display()
        ));
    }
    let password = require_password(args.password)?;

    let wallet =
        IdentityWallet::create(&password, opts.config.client.kdf).map_err(|e| e.to_string())?;
    wallet.save(&args.out).map_err(|e| e.to_string())?;

    if opts.json {
        let obj = serde_json::json!({
            "status": "ok",
            "key_file": args.out.display().to_string(),
            "public_key": wallet.public_key().to_string(),
        });
        println!("{obj}");
    } else {
        output::print_success(&format!("key written to {}", args.out.display()), false);
        output::print_fields(&[("Public key", wallet.public_key().to_string())], false);
    }
    Ok(())
}

pub fn pubkey(args: PubkeyArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let file = read_key_file(&args.key).map_err(|e| e.to_string())?;

    let mut fields = vec![("public_key", file.public_key.clone())];
    if !file.retired.is_empty() {
        let retired: Vec<String> = file.retired.iter().map(|k| k.public_key.clone()).collect();
        fields.push(("retired", retired.join(",")));
    }
    output::print_fields(&fields, opts.json);
    Ok(())
}
