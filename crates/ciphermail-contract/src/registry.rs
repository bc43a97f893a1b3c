//! On-chain user registry.
//!
//! Records live in an append-only slot array that grows up to a fixed
//! maximum and never shrinks. Deactivation clears the `active` flag
//! but keeps the slot, so the slot is never reclaimed even though its
//! nickname becomes free again.
//!
//! Two hash indexes cover the active records only
//! (`nickname → slot`, `owner → slot`). Uniqueness of nicknames and
//! owners is therefore enforced among active records exactly as a
//! linear scan over active slots would.

use std::collections::HashMap;

use ciphermail_types::{ContractError, Identity, Nickname, PublicKeyBytes, Tick};
use serde::{Deserialize, Serialize};

/// Index of a record in the slot array.
pub type SlotIndex = u32;

// ---------------------------------------------------------------------------
// UserRecord
// ---------------------------------------------------------------------------

/// One registered identity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Null-padded nickname.
    pub nickname: Nickname,
    /// Current X25519 public key.
    pub pubkey: PublicKeyBytes,
    /// Chain identity that registered and controls this record.
    pub owner: Identity,
    /// Tick of registration.
    pub registered_tick: Tick,
    /// Tick of registration or of the last key rotation.
    pub last_update_tick: Tick,
    /// `false` once deactivated. Never flips back.
    pub active: bool,
}

// ---------------------------------------------------------------------------
// UserRegistry
// ---------------------------------------------------------------------------

/// Slot-allocated registry of [`UserRecord`]s.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserRegistry {
    slots: Vec<UserRecord>,
    max_users: u32,
    by_nickname: HashMap<Nickname, SlotIndex>,
    by_owner: HashMap<Identity, SlotIndex>,
}

impl UserRegistry {
    /// Creates an empty registry holding at most `max_users` slots.
    pub fn new(max_users: u32) -> Self {
        Self {
            slots: Vec::new(),
            max_users,
            by_nickname: HashMap::new(),
            by_owner: HashMap::new(),
        }
    }

    /// Number of slots ever allocated, active or not.
    pub fn slot_count(&self) -> u32 {
        // Bounded by `max_users: u32`.
        self.slots.len() as u32
    }

    /// Number of currently active records.
    pub fn active_count(&self) -> u32 {
        self.by_owner.len() as u32
    }

    /// Maximum number of slots.
    pub fn capacity(&self) -> u32 {
        self.max_users
    }

    /// Record stored in `slot`, active or not.
    pub fn record(&self, slot: SlotIndex) -> Option<&UserRecord> {
        self.slots.get(slot as usize)
    }

    /// Slot of the caller's active record.
    pub fn active_slot(&self, owner: &Identity) -> Option<SlotIndex> {
        self.by_owner.get(owner).copied()
    }

    // -- Reads ------------------------------------------------------------

    /// Active record holding `nickname`.
    pub fn lookup_by_nickname(&self, nickname: &Nickname) -> Option<&UserRecord> {
        self.by_nickname
            .get(nickname)
            .and_then(|slot| self.record(*slot))
    }

    /// Active record owned by `owner`.
    pub fn lookup_by_owner(&self, owner: &Identity) -> Option<&UserRecord> {
        self.active_slot(owner).and_then(|slot| self.record(slot))
    }

    // -- Mutations --------------------------------------------------------

    /// Checks whether `owner` may register `nickname` and returns the
    /// slot it would receive. Never mutates.
    ///
    /// Checks run in this order: owner already active, nickname held
    /// by an active record, slot array full.
    pub fn check_register(
        &self,
        nickname: &Nickname,
        owner: &Identity,
    ) -> Result<SlotIndex, ContractError> {
        if self.by_owner.contains_key(owner) {
            return Err(ContractError::AlreadyRegistered);
        }
        if self.by_nickname.contains_key(nickname) {
            return Err(ContractError::NicknameTaken);
        }
        if self.slot_count() >= self.max_users {
            return Err(ContractError::RegistryFull);
        }
        Ok(self.slot_count())
    }

    /// Appends a new active record.
    ///
    /// # Errors
    ///
    /// See [`check_register`](Self::check_register). On error nothing
    /// changes.
    pub fn register(
        &mut self,
        nickname: Nickname,
        pubkey: PublicKeyBytes,
        owner: Identity,
        tick: Tick,
    ) -> Result<SlotIndex, ContractError> {
        let slot = self.check_register(&nickname, &owner)?;

        self.slots.push(UserRecord {
            nickname,
            pubkey,
            owner,
            registered_tick: tick,
            last_update_tick: tick,
            active: true,
        });
        self.by_nickname.insert(nickname, slot);
        self.by_owner.insert(owner, slot);
        Ok(slot)
    }

    /// Replaces the public key of the caller's active record.
    ///
    /// Messages encrypted to the old key are not touched.
    ///
    /// # Errors
    ///
    /// [`ContractError::NotAuthorized`] if `owner` has no active record.
    pub fn update_pubkey(
        &mut self,
        owner: &Identity,
        new_pubkey: PublicKeyBytes,
        tick: Tick,
    ) -> Result<SlotIndex, ContractError> {
        let slot = self.active_slot(owner).ok_or(ContractError::NotAuthorized)?;
        let record = self
            .slots
            .get_mut(slot as usize)
            .ok_or(ContractError::NotAuthorized)?;

        record.pubkey = new_pubkey;
        record.last_update_tick = tick;
        Ok(slot)
    }

    /// Marks the caller's active record inactive and frees its
    /// nickname. The slot stays allocated.
    ///
    /// # Errors
    ///
    /// [`ContractError::NotAuthorized`] if `owner` has no active record.
    pub fn deactivate(&mut self, owner: &Identity) -> Result<SlotIndex, ContractError> {
        let slot = self.active_slot(owner).ok_or(ContractError::NotAuthorized)?;
        let record = self
            .slots
            .get_mut(slot as usize)
            .ok_or(ContractError::NotAuthorized)?;

        record.active = false;
        let nickname = record.nickname;
        self.by_nickname.remove(&nickname);
        self.by_owner.remove(owner);
        Ok(slot)
    }
}
