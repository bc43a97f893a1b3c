//! In-process walkthrough of the Alice/Bob delivery scenario.
//!
//! Starts a ledger with manual ticks, registers two identities, and
//! shows each contract decision: the first post is accepted, an
//! immediate second post is rate limited, the same nonce succeeds once
//! ten ticks have passed, and replaying the first nonce is refused.
//! Bob then verifies the proof and decrypts the blob.

use ciphermail_crypto::ecdh::X25519PublicKey;
use ciphermail_node::{LedgerClient, LedgerNode, Messenger};
use ciphermail_protocol::commitment::content_hash;
use ciphermail_protocol::e2e;
use ciphermail_types::config::ContractConfig;
use ciphermail_types::{CiphermailError, Identity, Nickname, PublicKeyBytes, Result};
use ciphermail_wallet::wallet::IdentityWallet;

use crate::output;
use crate::GlobalOpts;

const ALICE: Identity = Identity::new([0xA1; 32]);
const BOB: Identity = Identity::new([0xB0; 32]);
const DEMO_PASSWORD: &str = "demo";

pub async fn run(opts: &GlobalOpts) -> std::result::Result<(), String> {
    let rows = scenario(opts).await.map_err(|e| e.to_string())?;
    output::print_table(&["step", "tick", "outcome"], &rows, opts.json);
    Ok(())
}

async fn scenario(opts: &GlobalOpts) -> Result<Vec<Vec<String>>> {
    let contract = ContractConfig {
        tick_interval_ms: 0,
        ..opts.config.contract.clone()
    };
    let (mut node, task) = LedgerNode::spawn(&contract)?;
    let handle = node.handle();
    let mut rows = Vec::new();

    let alice_wallet = unlocked_wallet(opts)?;
    let bob_wallet = unlocked_wallet(opts)?;
    let alice = LedgerClient::new(handle.clone(), ALICE, &opts.config.client);
    let bob = Messenger::new(
        LedgerClient::new(handle.clone(), BOB, &opts.config.client),
        bob_wallet,
    )?;

    let slot = alice
        .register(Nickname::new("alice")?, alice_wallet.public_key())
        .await?;
    let tick = handle.current_tick().await?;
    rows.push(row("register alice", tick, format!("slot {slot}")));
    let slot = bob.register(Nickname::new("bob")?).await?;
    let tick = handle.current_tick().await?;
    rows.push(row("register bob", tick, format!("slot {slot}")));

    let found = alice
        .lookup_user(Nickname::new("bob")?)
        .await?
        .ok_or_else(|| CiphermailError::ProtocolError {
            reason: "bob is not registered".into(),
        })?;
    let bob_key: PublicKeyBytes = found.pubkey;

    let blob = e2e::encrypt(
        b"hi bob",
        alice_wallet.secret()?,
        &X25519PublicKey::from_bytes(*bob_key.as_bytes()),
    )?
    .serialize();
    let hash = content_hash(&blob);
    let tick = handle.current_tick().await?;
    rows.push(row("encrypt \"hi bob\"", tick, format!("hash {hash}")));

    let mut first_index = 0;
    for (label, nonce, advance) in [
        ("post nonce 1", 1, 0),
        ("post nonce 2", 2, 0),
        ("post nonce 2", 2, 10),
        ("post nonce 1", 1, 0),
    ] {
        if advance > 0 {
            let tick = handle.advance_ticks(advance).await?;
            rows.push(row("advance ticks", tick, format!("+{advance}")));
        }
        let tick = handle.current_tick().await?;
        let outcome = match alice.post_message_meta(BOB, hash, nonce).await {
            Ok(receipt) => {
                if nonce == 1 {
                    first_index = receipt.log_index;
                }
                format!("accepted, logIndex {}", receipt.log_index)
            }
            Err(CiphermailError::Contract { code }) => format!("rejected: {code}"),
            Err(e) => return Err(e),
        };
        rows.push(row(label, tick, outcome));
    }

    let opened = bob.open_from(&blob, first_index, &ALICE).await?;
    let outcome = match opened {
        Some(plaintext) => format!("\"{}\"", String::from_utf8_lossy(&plaintext)),
        None => "could not be verified".into(),
    };
    let tick = handle.current_tick().await?;
    rows.push(row("bob opens", tick, outcome));

    node.shutdown()?;
    if let Err(e) = task.await {
        tracing::warn!(%e, "demo ledger task ended abnormally");
    }
    Ok(rows)
}

fn unlocked_wallet(opts: &GlobalOpts) -> Result<IdentityWallet> {
    let mut wallet = IdentityWallet::create(DEMO_PASSWORD, opts.config.client.kdf)?;
    wallet.unlock(DEMO_PASSWORD)?;
    Ok(wallet)
}

fn row(step: &str, tick: u32, outcome: String) -> Vec<String> {
    vec![step.to_string(), tick.to_string(), outcome]
}
