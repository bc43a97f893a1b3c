//! Integration tests for the ledger actor, client and messenger.
//!
//! Ledgers run with manual ticks unless a test needs the timer, in
//! which case tokio's paused clock keeps it deterministic.

use std::time::Duration;

use ciphermail_contract::abi::{self, PostMessageMetaOutput, RegisterUserInput, RegisterUserOutput};
use ciphermail_contract::CallKind;
use ciphermail_node::{LedgerClient, LedgerHandle, LedgerNode, Messenger, NodeState};
use ciphermail_protocol::commitment::content_hash;
use ciphermail_protocol::nonce::NonceSequence;
use ciphermail_types::config::{ClientConfig, ContractConfig, KdfConfig};
use ciphermail_types::{
    CiphermailError, ContentHash, ContractError, Identity, Nickname, PublicKeyBytes,
};
use ciphermail_wallet::wallet::IdentityWallet;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const ALICE: Identity = Identity::new([0xA1; 32]);
const BOB: Identity = Identity::new([0xB0; 32]);
const PASSWORD: &str = "ledger test password";

fn manual_ticks() -> ContractConfig {
    ContractConfig {
        max_users: 16,
        msg_log_capacity: 64,
        tick_interval_ms: 0,
        ..ContractConfig::default()
    }
}

fn client_config(backoff_ms: u64) -> ClientConfig {
    ClientConfig {
        kdf: KdfConfig {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        },
        max_post_attempts: 3,
        retry_backoff_ms: backoff_ms,
    }
}

fn client(handle: &LedgerHandle, who: Identity, config: &ClientConfig) -> LedgerClient {
    LedgerClient::new(handle.clone(), who, config)
}

fn unlocked_wallet(config: &ClientConfig) -> Result<IdentityWallet, CiphermailError> {
    let mut wallet = IdentityWallet::create(PASSWORD, config.kdf)?;
    wallet.unlock(PASSWORD)?;
    Ok(wallet)
}

fn code_of<T>(result: Result<T, CiphermailError>) -> Option<ContractError> {
    match result {
        Err(CiphermailError::Contract { code }) => Some(code),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// 1. Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn starts_at_genesis_and_advances() -> Result<(), CiphermailError> {
    let (node, _task) = LedgerNode::spawn(&manual_ticks())?;
    let handle = node.handle();

    assert_eq!(node.state(), NodeState::Running);
    assert_eq!(handle.current_tick().await?, 1);
    assert_eq!(handle.advance_ticks(10).await?, 11);

    let status = handle.snapshot().await?;
    assert_eq!(status.tick, 11);
    assert_eq!(status.stats.registered_slots, 0);
    Ok(())
}

#[tokio::test]
async fn double_start_rejected() -> Result<(), CiphermailError> {
    let (mut node, _task) = LedgerNode::spawn(&manual_ticks())?;
    assert!(node.start().is_err());
    Ok(())
}

#[tokio::test]
async fn shutdown_before_start_rejected() -> Result<(), CiphermailError> {
    let mut node = LedgerNode::new(&manual_ticks())?;
    assert!(node.shutdown().is_err());
    Ok(())
}

#[tokio::test]
async fn handle_fails_after_shutdown() -> Result<(), CiphermailError> {
    let (mut node, task) = LedgerNode::spawn(&manual_ticks())?;
    let handle = node.handle();
    node.shutdown()?;
    let _ = task.await;

    assert_eq!(node.state(), NodeState::ShuttingDown);
    assert!(matches!(
        handle.current_tick().await,
        Err(CiphermailError::NodeUnavailable { .. })
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timer_advances_ticks() -> Result<(), CiphermailError> {
    let config = ContractConfig {
        tick_interval_ms: 100,
        ..manual_ticks()
    };
    let (node, _task) = LedgerNode::spawn(&config)?;
    let handle = node.handle();

    tokio::time::sleep(Duration::from_millis(550)).await;
    let tick = handle.current_tick().await?;
    assert!((5..=7).contains(&tick), "tick {tick}");
    Ok(())
}

// ---------------------------------------------------------------------------
// 2. Delivery scenario through the client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn alice_bob_scenario_through_client() -> Result<(), CiphermailError> {
    let (node, _task) = LedgerNode::spawn(&manual_ticks())?;
    let handle = node.handle();
    let config = client_config(0);
    let alice = client(&handle, ALICE, &config);
    let bob = client(&handle, BOB, &config);

    alice
        .register(Nickname::new("alice")?, PublicKeyBytes::new([0xAA; 32]))
        .await?;
    bob.register(Nickname::new("bob")?, PublicKeyBytes::new([0xBB; 32]))
        .await?;

    let found = alice.lookup_user(Nickname::new("bob")?).await?;
    assert_eq!(found.map(|u| u.owner), Some(BOB));

    let hash = ContentHash::new([0x42; 32]);
    let first = alice.post_message_meta(BOB, hash, 1).await?;
    assert_eq!(first.log_index, 0);

    assert_eq!(
        code_of(alice.post_message_meta(BOB, hash, 2).await),
        Some(ContractError::RateLimited)
    );

    handle.advance_ticks(10).await?;
    let second = alice.post_message_meta(BOB, hash, 2).await?;
    assert_eq!(second.log_index, 1);

    assert_eq!(
        code_of(alice.post_message_meta(BOB, hash, 1).await),
        Some(ContractError::BadNonce)
    );

    let entry = bob.get_message_meta(1).await?;
    assert_eq!((entry.sender, entry.receiver, entry.nonce), (ALICE, BOB, 2));
    assert_eq!(
        code_of(bob.get_message_meta(2).await),
        Some(ContractError::IndexOutOfWindow)
    );
    Ok(())
}

#[tokio::test]
async fn raw_invoke_goes_through_the_same_state() -> Result<(), CiphermailError> {
    let (node, _task) = LedgerNode::spawn(&manual_ticks())?;
    let handle = node.handle();

    let input = abi::encode(&RegisterUserInput {
        nickname: Nickname::new("alice")?,
        pubkey: PublicKeyBytes::new([0xAA; 32]),
    })?;
    let out = handle.invoke(ALICE, CallKind::RegisterUser, input).await?;
    assert_eq!(abi::decode::<RegisterUserOutput>(&out)?.slot_index, 0);

    let again = client(&handle, ALICE, &client_config(0))
        .register(Nickname::new("other")?, PublicKeyBytes::new([1; 32]))
        .await;
    assert_eq!(code_of(again), Some(ContractError::AlreadyRegistered));

    let self_post = abi::encode(&abi::PostMessageMetaInput {
        receiver: ALICE,
        content_hash: ContentHash::new([0; 32]),
        nonce: 1,
    })?;
    let out = handle.invoke(ALICE, CallKind::PostMessageMeta, self_post).await?;
    assert_eq!(abi::decode::<PostMessageMetaOutput>(&out)?.error_code, 4);

    assert!(handle
        .invoke(ALICE, CallKind::GetMessageMeta, vec![0; 3])
        .await
        .is_err());
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Retry policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn retry_gives_up_when_ticks_do_not_move() -> Result<(), CiphermailError> {
    let (node, _task) = LedgerNode::spawn(&manual_ticks())?;
    let handle = node.handle();
    let alice = client(&handle, ALICE, &client_config(1));
    alice
        .register(Nickname::new("alice")?, PublicKeyBytes::new([0xAA; 32]))
        .await?;

    let mut nonces = NonceSequence::new();
    let hash = ContentHash::new([7; 32]);
    alice.post_with_retry(BOB, hash, &mut nonces).await?;
    let after_first = nonces.last();

    let result = alice.post_with_retry(BOB, hash, &mut nonces).await;
    assert_eq!(code_of(result), Some(ContractError::RateLimited));
    // Three attempts, three fresh nonces.
    assert!(nonces.last() >= after_first + 3);
    assert_eq!(handle.snapshot().await?.stats.log_cursor, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn retry_succeeds_once_rate_limit_elapses() -> Result<(), CiphermailError> {
    let config = ContractConfig {
        tick_interval_ms: 100,
        ..manual_ticks()
    };
    let (node, _task) = LedgerNode::spawn(&config)?;
    let handle = node.handle();
    let alice = client(&handle, ALICE, &client_config(2_000));
    alice
        .register(Nickname::new("alice")?, PublicKeyBytes::new([0xAA; 32]))
        .await?;

    let mut nonces = NonceSequence::new();
    let hash = ContentHash::new([7; 32]);
    let first = alice.post_with_retry(BOB, hash, &mut nonces).await?;
    let second = alice.post_with_retry(BOB, hash, &mut nonces).await?;
    assert_eq!((first.sequence, second.sequence), (0, 1));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn retry_outlasts_rate_limit_with_default_config() -> Result<(), CiphermailError> {
    let contract = ContractConfig::default();
    let (node, _task) = LedgerNode::spawn(&contract)?;
    let handle = node.handle();
    assert_eq!(handle.rate_limit_wait(), Duration::from_millis(11_000));

    let alice = client(&handle, ALICE, &ClientConfig::default());
    alice
        .register(Nickname::new("alice")?, PublicKeyBytes::new([0xAA; 32]))
        .await?;

    // Seeded above any wall-clock value so each attempt mints exactly
    // one more than the last.
    let mut nonces = NonceSequence::starting_after(4_000_000_000);
    let hash = ContentHash::new([7; 32]);
    let first = alice.post_with_retry(BOB, hash, &mut nonces).await?;
    let after_first = nonces.last();
    let second = alice.post_with_retry(BOB, hash, &mut nonces).await?;

    assert_eq!((first.sequence, second.sequence), (0, 1));
    // One rejected attempt, one accepted.
    assert_eq!(nonces.last(), after_first + 2);
    assert!(handle.current_tick().await? >= contract.genesis_tick + contract.rate_limit_ticks);
    Ok(())
}

#[tokio::test]
async fn manual_ticks_have_no_rate_limit_wait() -> Result<(), CiphermailError> {
    let (node, _task) = LedgerNode::spawn(&manual_ticks())?;
    assert_eq!(node.handle().rate_limit_wait(), Duration::ZERO);
    Ok(())
}

#[tokio::test]
async fn terminal_rejection_is_not_retried() -> Result<(), CiphermailError> {
    let (node, _task) = LedgerNode::spawn(&manual_ticks())?;
    let alice = client(&node.handle(), ALICE, &client_config(1));

    let mut nonces = NonceSequence::starting_after(100);
    let result = alice
        .post_with_retry(BOB, ContentHash::new([7; 32]), &mut nonces)
        .await;
    assert_eq!(code_of(result), Some(ContractError::NotRegistered));
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Messenger
// ---------------------------------------------------------------------------

#[tokio::test]
async fn messenger_send_and_open() -> Result<(), CiphermailError> {
    let (node, _task) = LedgerNode::spawn(&manual_ticks())?;
    let handle = node.handle();
    let config = client_config(0);

    let mut alice = Messenger::new(client(&handle, ALICE, &config), unlocked_wallet(&config)?)?;
    let bob = Messenger::new(client(&handle, BOB, &config), unlocked_wallet(&config)?)?;
    alice.register(Nickname::new("alice")?).await?;
    bob.register(Nickname::new("bob")?).await?;

    let (blob, receipt) = alice.send(Nickname::new("bob")?, "hi bob".as_bytes()).await?;
    let entry = bob.client().get_message_meta(receipt.log_index).await?;
    assert_eq!(entry.content_hash, content_hash(&blob));

    let opened = bob.open_from(&blob, receipt.log_index, &ALICE).await?;
    assert_eq!(opened.as_deref(), Some("hi bob".as_bytes()));

    // Alice is not the receiver named in the proof.
    assert!(alice.open(&blob, receipt.log_index).await?.is_none());

    // Wrong claimed sender.
    assert!(bob.open_from(&blob, receipt.log_index, &BOB).await?.is_none());

    let mut tampered = blob.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;
    assert!(bob.open(&tampered, receipt.log_index).await?.is_none());

    assert!(matches!(
        bob.open(&blob[..40], receipt.log_index).await,
        Err(CiphermailError::MalformedInput { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn messenger_unknown_recipient() -> Result<(), CiphermailError> {
    let (node, _task) = LedgerNode::spawn(&manual_ticks())?;
    let config = client_config(0);
    let mut alice = Messenger::new(
        client(&node.handle(), ALICE, &config),
        unlocked_wallet(&config)?,
    )?;
    alice.register(Nickname::new("alice")?).await?;

    let result = alice.send(Nickname::new("nobody")?, b"hello").await;
    assert!(matches!(result, Err(CiphermailError::ProtocolError { .. })));
    Ok(())
}

#[tokio::test]
async fn rotated_recipient_still_opens_old_messages() -> Result<(), CiphermailError> {
    let (node, _task) = LedgerNode::spawn(&manual_ticks())?;
    let handle = node.handle();
    let config = client_config(0);

    let mut alice = Messenger::new(client(&handle, ALICE, &config), unlocked_wallet(&config)?)?;
    let mut bob = Messenger::new(client(&handle, BOB, &config), unlocked_wallet(&config)?)?;
    alice.register(Nickname::new("alice")?).await?;
    bob.register(Nickname::new("bob")?).await?;

    let (old_blob, old_receipt) = alice.send(Nickname::new("bob")?, b"before").await?;

    bob.rotate_key(PASSWORD).await?;
    let registered = alice.client().lookup_by_owner(BOB).await?;
    assert_eq!(registered.map(|r| r.pubkey), Some(bob.wallet().public_key()));

    handle.advance_ticks(10).await?;
    let (new_blob, new_receipt) = alice.send(Nickname::new("bob")?, b"after").await?;

    assert_eq!(
        bob.open(&old_blob, old_receipt.log_index).await?.as_deref(),
        Some(b"before".as_slice())
    );
    assert_eq!(
        bob.open(&new_blob, new_receipt.log_index).await?.as_deref(),
        Some(b"after".as_slice())
    );
    Ok(())
}

#[tokio::test]
async fn locked_wallet_rejected() -> Result<(), CiphermailError> {
    let (node, _task) = LedgerNode::spawn(&manual_ticks())?;
    let config = client_config(0);
    let wallet = IdentityWallet::create(PASSWORD, config.kdf)?;
    assert!(Messenger::new(client(&node.handle(), ALICE, &config), wallet).is_err());
    Ok(())
}
