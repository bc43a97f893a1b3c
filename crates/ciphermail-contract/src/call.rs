//! Typed contract calls and their results.

use std::fmt;

use ciphermail_types::{
    CiphermailError, ContentHash, Identity, MessageMetaEntry, Nickname, PublicKeyBytes, Tick,
};
use serde::{Deserialize, Serialize};

use crate::message_log::AppendPosition;
use crate::registry::SlotIndex;

// ---------------------------------------------------------------------------
// CallKind
// ---------------------------------------------------------------------------

/// Numeric identifier of every externally callable entrypoint.
///
/// Ids 1..=4 are procedures (may mutate state); ids 5..=7 are
/// read-only functions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CallKind {
    RegisterUser = 1,
    UpdatePubkey = 2,
    DeactivateUser = 3,
    PostMessageMeta = 4,
    LookupUser = 5,
    LookupUserByOwner = 6,
    GetMessageMeta = 7,
}

impl CallKind {
    /// All kinds in id order.
    pub const ALL: [CallKind; 7] = [
        CallKind::RegisterUser,
        CallKind::UpdatePubkey,
        CallKind::DeactivateUser,
        CallKind::PostMessageMeta,
        CallKind::LookupUser,
        CallKind::LookupUserByOwner,
        CallKind::GetMessageMeta,
    ];

    /// Wire id of this kind.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Looks up a kind by its wire id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// `true` for functions that never mutate state.
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::LookupUser | Self::LookupUserByOwner | Self::GetMessageMeta
        )
    }
}

impl TryFrom<u8> for CallKind {
    type Error = CiphermailError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_id(id).ok_or_else(|| CiphermailError::MalformedInput {
            reason: format!("unknown call kind {id}"),
        })
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Call
// ---------------------------------------------------------------------------

/// Invocation context supplied by the runtime, never by the caller's
/// payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CallContext {
    /// Authenticated invoker.
    pub caller: Identity,
    /// Tick at which the call executes.
    pub tick: Tick,
}

/// A decoded contract call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    RegisterUser {
        nickname: Nickname,
        pubkey: PublicKeyBytes,
    },
    UpdatePubkey {
        new_pubkey: PublicKeyBytes,
    },
    DeactivateUser,
    PostMessageMeta {
        receiver: Identity,
        content_hash: ContentHash,
        nonce: u32,
    },
    LookupUser {
        nickname: Nickname,
    },
    LookupUserByOwner {
        owner: Identity,
    },
    GetMessageMeta {
        log_index: u32,
    },
}

impl Call {
    /// Entrypoint this call targets.
    pub fn kind(&self) -> CallKind {
        match self {
            Self::RegisterUser { .. } => CallKind::RegisterUser,
            Self::UpdatePubkey { .. } => CallKind::UpdatePubkey,
            Self::DeactivateUser => CallKind::DeactivateUser,
            Self::PostMessageMeta { .. } => CallKind::PostMessageMeta,
            Self::LookupUser { .. } => CallKind::LookupUser,
            Self::LookupUserByOwner { .. } => CallKind::LookupUserByOwner,
            Self::GetMessageMeta { .. } => CallKind::GetMessageMeta,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Where an accepted metadata post landed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PostReceipt {
    /// Physical ring-buffer slot.
    pub log_index: u32,
    /// Logical append number, never reused.
    pub sequence: u64,
}

impl From<AppendPosition> for PostReceipt {
    fn from(pos: AppendPosition) -> Self {
        Self {
            log_index: pos.log_index,
            sequence: pos.sequence,
        }
    }
}

/// Result of `LookupUser`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserLookup {
    pub pubkey: PublicKeyBytes,
    pub owner: Identity,
    pub registered_tick: Tick,
}

/// Result of `LookupUserByOwner`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OwnerLookup {
    pub nickname: Nickname,
    pub pubkey: PublicKeyBytes,
}

/// Successful outcome of a [`Call`], one variant per [`CallKind`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallOutput {
    Registered { slot: SlotIndex },
    PubkeyUpdated,
    Deactivated,
    Posted(PostReceipt),
    User(Option<UserLookup>),
    UserByOwner(Option<OwnerLookup>),
    Message(MessageMetaEntry),
}
