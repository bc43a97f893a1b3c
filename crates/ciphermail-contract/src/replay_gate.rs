//! Anti-replay and rate-limit admission for metadata posts.
//!
//! Each registry slot owns a [`ReplayState`]. A post is admitted only
//! if, in order:
//!
//! 1. the sender holds an active slot (`NotRegistered`),
//! 2. the receiver is not the sender (`SelfMessage`),
//! 3. `nonce > last_nonce` (`BadNonce`),
//! 4. `tick - last_post_tick >= rate_limit_ticks`, unless the slot has
//!    never posted (`last_post_tick == 0`) (`RateLimited`).
//!
//! [`ReplayGate::admit`] is a pure check. [`ReplayGate::record`] then
//! updates nonce and tick together.

use ciphermail_types::{ContractError, Identity, Tick};
use serde::{Deserialize, Serialize};

use crate::registry::SlotIndex;

/// Replay state for one registry slot.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReplayState {
    /// Last accepted nonce, `0` before the first post.
    pub last_nonce: u32,
    /// Tick of the last accepted post, `0` before the first post.
    pub last_post_tick: Tick,
}

/// Per-slot replay table plus the rate-limit interval.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplayGate {
    states: Vec<ReplayState>,
    rate_limit_ticks: u32,
}

impl ReplayGate {
    /// Creates an empty gate.
    pub fn new(rate_limit_ticks: u32) -> Self {
        Self {
            states: Vec::new(),
            rate_limit_ticks,
        }
    }

    /// Minimum tick distance between two accepted posts of one slot.
    pub fn rate_limit_ticks(&self) -> u32 {
        self.rate_limit_ticks
    }

    /// Creates the zeroed state for a freshly registered slot,
    /// resetting it if the slot already has one.
    pub fn open_slot(&mut self, slot: SlotIndex) {
        let idx = slot as usize;
        if idx < self.states.len() {
            self.states[idx] = ReplayState::default();
        } else {
            self.states.resize(idx + 1, ReplayState::default());
        }
    }

    /// Replay state of `slot`. Retained after deactivation.
    pub fn state(&self, slot: SlotIndex) -> Option<&ReplayState> {
        self.states.get(slot as usize)
    }

    /// Decides whether a post may proceed. Never mutates.
    ///
    /// `sender_slot` is the sender's active registry slot, if any.
    pub fn admit(
        &self,
        sender_slot: Option<SlotIndex>,
        sender: &Identity,
        receiver: &Identity,
        nonce: u32,
        tick: Tick,
    ) -> Result<SlotIndex, ContractError> {
        let slot = sender_slot.ok_or(ContractError::NotRegistered)?;
        if sender == receiver {
            return Err(ContractError::SelfMessage);
        }

        let state = self.state(slot).copied().unwrap_or_default();
        if nonce <= state.last_nonce {
            return Err(ContractError::BadNonce);
        }
        if state.last_post_tick != 0
            && tick.saturating_sub(state.last_post_tick) < self.rate_limit_ticks
        {
            return Err(ContractError::RateLimited);
        }
        Ok(slot)
    }

    /// Stores the accepted nonce and tick for `slot`.
    pub fn record(&mut self, slot: SlotIndex, nonce: u32, tick: Tick) {
        if self.state(slot).is_none() {
            self.open_slot(slot);
        }
        if let Some(state) = self.states.get_mut(slot as usize) {
            state.last_nonce = nonce;
            state.last_post_tick = tick;
        }
    }
}
