//! Async client bound to one caller identity.
//!
//! [`LedgerClient`] turns typed contract outcomes into
//! `ciphermail_types::Result`: a rejection becomes
//! [`CiphermailError::Contract`] with its code, a closed ledger
//! becomes [`CiphermailError::NodeUnavailable`].

use std::time::Duration;

use ciphermail_contract::call::{OwnerLookup, UserLookup};
use ciphermail_contract::registry::SlotIndex;
use ciphermail_contract::{Call, CallOutput, PostReceipt};
use ciphermail_protocol::nonce::NonceSequence;
use ciphermail_types::config::ClientConfig;
use ciphermail_types::{
    CiphermailError, ContentHash, ContractError, Identity, MessageMetaEntry, Nickname,
    PublicKeyBytes, Result,
};

use crate::node::LedgerHandle;

/// Ledger client acting as `identity`.
#[derive(Clone, Debug)]
pub struct LedgerClient {
    handle: LedgerHandle,
    identity: Identity,
    max_post_attempts: u32,
    retry_backoff: Duration,
}

impl LedgerClient {
    pub fn new(handle: LedgerHandle, identity: Identity, config: &ClientConfig) -> Self {
        Self {
            handle,
            identity,
            max_post_attempts: config.max_post_attempts.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Identity every call is submitted as.
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// The underlying ledger handle.
    pub fn handle(&self) -> &LedgerHandle {
        &self.handle
    }

    async fn call(&self, call: Call) -> Result<CallOutput> {
        let kind = call.kind();
        let outcome = self.handle.submit(self.identity, call).await?;
        outcome.map_err(|code| {
            tracing::debug!(%kind, ?code, "ledger rejected call");
            CiphermailError::from(code)
        })
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    /// Registers `nickname` with `pubkey` and returns the slot.
    pub async fn register(&self, nickname: Nickname, pubkey: PublicKeyBytes) -> Result<SlotIndex> {
        match self.call(Call::RegisterUser { nickname, pubkey }).await? {
            CallOutput::Registered { slot } => Ok(slot),
            other => Err(unexpected(other)),
        }
    }

    pub async fn lookup_user(&self, nickname: Nickname) -> Result<Option<UserLookup>> {
        match self.call(Call::LookupUser { nickname }).await? {
            CallOutput::User(found) => Ok(found),
            other => Err(unexpected(other)),
        }
    }

    pub async fn lookup_by_owner(&self, owner: Identity) -> Result<Option<OwnerLookup>> {
        match self.call(Call::LookupUserByOwner { owner }).await? {
            CallOutput::UserByOwner(found) => Ok(found),
            other => Err(unexpected(other)),
        }
    }

    /// Rotates this identity's registered public key.
    pub async fn update_pubkey(&self, new_pubkey: PublicKeyBytes) -> Result<()> {
        match self.call(Call::UpdatePubkey { new_pubkey }).await? {
            CallOutput::PubkeyUpdated => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn deactivate(&self) -> Result<()> {
        match self.call(Call::DeactivateUser).await? {
            CallOutput::Deactivated => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    // -----------------------------------------------------------------------
    // Metadata log
    // -----------------------------------------------------------------------

    /// Posts one delivery proof with an explicit nonce. No retry.
    pub async fn post_message_meta(
        &self,
        receiver: Identity,
        content_hash: ContentHash,
        nonce: u32,
    ) -> Result<PostReceipt> {
        let call = Call::PostMessageMeta {
            receiver,
            content_hash,
            nonce,
        };
        match self.call(call).await? {
            CallOutput::Posted(receipt) => Ok(receipt),
            other => Err(unexpected(other)),
        }
    }

    /// Reads the log entry in physical slot `log_index`.
    pub async fn get_message_meta(&self, log_index: u32) -> Result<MessageMetaEntry> {
        match self.call(Call::GetMessageMeta { log_index }).await? {
            CallOutput::Message(entry) => Ok(entry),
            other => Err(unexpected(other)),
        }
    }

    /// Posts a delivery proof, retrying on `RateLimited` and
    /// `BadNonce` up to the configured number of attempts.
    ///
    /// After `RateLimited` the client sleeps for the longer of the
    /// configured backoff and the ledger's rate-limit wait, so one
    /// retry is enough once the ledger's clock is running.
    ///
    /// Every attempt mints a fresh nonce from `nonces`, so a retry
    /// never reuses a value the ledger may already have consumed.
    /// Any other rejection is returned immediately.
    pub async fn post_with_retry(
        &self,
        receiver: Identity,
        content_hash: ContentHash,
        nonces: &mut NonceSequence,
    ) -> Result<PostReceipt> {
        let mut attempt = 1;
        loop {
            let nonce = nonces.next()?;
            match self.post_message_meta(receiver, content_hash, nonce).await {
                Err(CiphermailError::Contract { code })
                    if is_retryable(code) && attempt < self.max_post_attempts =>
                {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_post_attempts,
                        nonce,
                        ?code,
                        "metadata post rejected -- retrying with a fresh nonce"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.backoff_for(code)).await;
                }
                other => return other,
            }
        }
    }

    fn backoff_for(&self, code: ContractError) -> Duration {
        match code {
            ContractError::RateLimited => {
                self.retry_backoff.max(self.handle.rate_limit_wait())
            }
            _ => self.retry_backoff,
        }
    }
}

fn is_retryable(code: ContractError) -> bool {
    matches!(code, ContractError::RateLimited | ContractError::BadNonce)
}

fn unexpected(output: CallOutput) -> CiphermailError {
    CiphermailError::ProtocolError {
        reason: format!("unexpected ledger output {output:?}"),
    }
}
