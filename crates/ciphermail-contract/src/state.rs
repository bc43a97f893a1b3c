//! The composed contract state and its transition function.
//!
//! [`ContractState::apply`] runs every check a call implies before it
//! performs the first write. A rejected call therefore returns its
//! [`ContractError`] with the state untouched, and an accepted call
//! commits all of its writes (registry, replay state, log) together.

use ciphermail_types::config::ContractConfig;
use ciphermail_types::{ContractError, Identity, MessageMetaEntry, Nickname, Result};
use serde::{Deserialize, Serialize};

use crate::call::{Call, CallContext, CallOutput, OwnerLookup, PostReceipt, UserLookup};
use crate::message_log::MessageMetadataLog;
use crate::registry::UserRegistry;
use crate::replay_gate::ReplayGate;

/// Counters exposed for monitoring.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContractStats {
    /// Slots ever allocated. Never decreases.
    pub registered_slots: u32,
    /// Records currently active.
    pub active_users: u32,
    /// Total metadata posts accepted.
    pub log_cursor: u64,
}

/// Entire mutable state of the contract.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContractState {
    registry: UserRegistry,
    gate: ReplayGate,
    log: MessageMetadataLog,
}

impl ContractState {
    /// Creates an empty state.
    ///
    /// # Errors
    ///
    /// [`CiphermailError::ConfigError`](ciphermail_types::CiphermailError::ConfigError)
    /// if `config` is out of range.
    pub fn new(config: &ContractConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: UserRegistry::new(config.max_users),
            gate: ReplayGate::new(config.rate_limit_ticks),
            log: MessageMetadataLog::new(config.msg_log_capacity),
        })
    }

    pub fn registry(&self) -> &UserRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &ReplayGate {
        &self.gate
    }

    pub fn log(&self) -> &MessageMetadataLog {
        &self.log
    }

    pub fn stats(&self) -> ContractStats {
        ContractStats {
            registered_slots: self.registry.slot_count(),
            active_users: self.registry.active_count(),
            log_cursor: self.log.cursor(),
        }
    }

    // -----------------------------------------------------------------------
    // Transition
    // -----------------------------------------------------------------------

    /// Applies one call as a single atomic step.
    pub fn apply(
        &mut self,
        ctx: &CallContext,
        call: &Call,
    ) -> std::result::Result<CallOutput, ContractError> {
        let outcome = self.dispatch(ctx, call);
        if let Err(code) = &outcome {
            tracing::debug!(
                caller = %ctx.caller,
                tick = ctx.tick,
                kind = %call.kind(),
                ?code,
                "call rejected"
            );
        }
        outcome
    }

    fn dispatch(
        &mut self,
        ctx: &CallContext,
        call: &Call,
    ) -> std::result::Result<CallOutput, ContractError> {
        match call {
            Call::RegisterUser { nickname, pubkey } => {
                let slot = self
                    .registry
                    .register(*nickname, *pubkey, ctx.caller, ctx.tick)?;
                self.gate.open_slot(slot);
                tracing::info!(slot, %nickname, owner = %ctx.caller, "user registered");
                Ok(CallOutput::Registered { slot })
            }

            Call::UpdatePubkey { new_pubkey } => {
                let slot = self
                    .registry
                    .update_pubkey(&ctx.caller, *new_pubkey, ctx.tick)?;
                tracing::info!(slot, owner = %ctx.caller, "public key rotated");
                Ok(CallOutput::PubkeyUpdated)
            }

            Call::DeactivateUser => {
                let slot = self.registry.deactivate(&ctx.caller)?;
                tracing::info!(slot, owner = %ctx.caller, "user deactivated");
                Ok(CallOutput::Deactivated)
            }

            Call::PostMessageMeta {
                receiver,
                content_hash,
                nonce,
            } => {
                let slot = self.gate.admit(
                    self.registry.active_slot(&ctx.caller),
                    &ctx.caller,
                    receiver,
                    *nonce,
                    ctx.tick,
                )?;

                self.gate.record(slot, *nonce, ctx.tick);
                let position = self.log.append(MessageMetaEntry {
                    sender: ctx.caller,
                    receiver: *receiver,
                    content_hash: *content_hash,
                    tick: ctx.tick,
                    nonce: *nonce,
                });
                tracing::debug!(
                    slot,
                    log_index = position.log_index,
                    sequence = position.sequence,
                    "message metadata posted"
                );
                Ok(CallOutput::Posted(position.into()))
            }

            Call::LookupUser { nickname } => Ok(CallOutput::User(self.lookup_user(nickname))),

            Call::LookupUserByOwner { owner } => {
                Ok(CallOutput::UserByOwner(self.lookup_by_owner(owner)))
            }

            Call::GetMessageMeta { log_index } => {
                self.message_meta(*log_index).map(CallOutput::Message)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Public key, owner and registration tick of the active record
    /// holding `nickname`.
    pub fn lookup_user(&self, nickname: &Nickname) -> Option<UserLookup> {
        self.registry
            .lookup_by_nickname(nickname)
            .map(|record| UserLookup {
                pubkey: record.pubkey,
                owner: record.owner,
                registered_tick: record.registered_tick,
            })
    }

    /// Nickname and public key of `owner`'s active record.
    pub fn lookup_by_owner(&self, owner: &Identity) -> Option<OwnerLookup> {
        self.registry.lookup_by_owner(owner).map(|record| OwnerLookup {
            nickname: record.nickname,
            pubkey: record.pubkey,
        })
    }

    /// Log entry in physical slot `log_index`.
    pub fn message_meta(
        &self,
        log_index: u32,
    ) -> std::result::Result<MessageMetaEntry, ContractError> {
        self.log.get(log_index).copied()
    }

    /// Log entry with logical number `sequence`.
    pub fn message_meta_by_sequence(
        &self,
        sequence: u64,
    ) -> std::result::Result<MessageMetaEntry, ContractError> {
        self.log.get_by_sequence(sequence).copied()
    }

    /// Log entry referenced by a receipt, if it is still readable.
    pub fn message_for_receipt(
        &self,
        receipt: &PostReceipt,
    ) -> std::result::Result<MessageMetaEntry, ContractError> {
        self.message_meta_by_sequence(receipt.sequence)
    }
}

/// Pure form of [`ContractState::apply`]: consumes a state and returns
/// the successor state together with the call's result.
pub fn transition(
    mut state: ContractState,
    ctx: &CallContext,
    call: &Call,
) -> (ContractState, std::result::Result<CallOutput, ContractError>) {
    let outcome = state.apply(ctx, call);
    (state, outcome)
}
