//! Commands and status types for client → ledger communication.
//!
//! [`LedgerCommand`] is the bounded-channel message type that clients,
//! the CLI and tests use to drive the ledger. Each command that
//! produces a result carries a `tokio::sync::oneshot::Sender` for the
//! reply.
//!
//! All commands are processed sequentially inside the event loop, so
//! every contract call observes the fully committed state left by the
//! previous one.

use ciphermail_contract::{Call, CallKind, CallOutput, ContractStats};
use ciphermail_types::{ContractError, Identity, Tick};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::node::NodeState;

/// Outcome of one typed contract call.
pub type CallResult = std::result::Result<CallOutput, ContractError>;

// ---------------------------------------------------------------------------
// LedgerCommand
// ---------------------------------------------------------------------------

/// Commands accepted by the ledger event loop.
pub enum LedgerCommand {
    /// Apply a typed call on behalf of `caller` at the current tick.
    Submit {
        caller: Identity,
        call: Call,
        reply: oneshot::Sender<CallResult>,
    },

    /// Apply a call given as raw input bytes and return the raw
    /// output bytes.
    Invoke {
        caller: Identity,
        kind: CallKind,
        input: Vec<u8>,
        reply: oneshot::Sender<ciphermail_types::Result<Vec<u8>>>,
    },

    /// Read the current tick.
    CurrentTick { reply: oneshot::Sender<Tick> },

    /// Move the tick forward by `ticks` and reply with the new value.
    AdvanceTicks {
        ticks: u32,
        reply: oneshot::Sender<Tick>,
    },

    /// Query the ledger status.
    Snapshot {
        reply: oneshot::Sender<LedgerStatus>,
    },

    /// Stop the event loop. No reply; await the `JoinHandle` returned
    /// by [`LedgerNode::start`](crate::node::LedgerNode::start) to
    /// confirm completion.
    Shutdown,
}

// Manual Debug because oneshot::Sender does not implement Debug.
impl std::fmt::Debug for LedgerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submit { caller, call, .. } => f
                .debug_struct("Submit")
                .field("caller", caller)
                .field("call", call)
                .finish_non_exhaustive(),
            Self::Invoke {
                caller,
                kind,
                input,
                ..
            } => f
                .debug_struct("Invoke")
                .field("caller", caller)
                .field("kind", kind)
                .field("input_len", &input.len())
                .finish_non_exhaustive(),
            Self::CurrentTick { .. } => f.write_str("CurrentTick"),
            Self::AdvanceTicks { ticks, .. } => f
                .debug_struct("AdvanceTicks")
                .field("ticks", ticks)
                .finish_non_exhaustive(),
            Self::Snapshot { .. } => f.write_str("Snapshot"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerStatus
// ---------------------------------------------------------------------------

/// Snapshot of the ledger's current state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LedgerStatus {
    /// Lifecycle state of the node.
    pub state: NodeState,
    /// Current tick.
    pub tick: Tick,
    /// Contract counters.
    pub stats: ContractStats,
}
