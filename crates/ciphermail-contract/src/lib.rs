//! The ciphermail ledger contract.
//!
//! A single deterministic state machine: every call is applied to one
//! owned [`state::ContractState`] to completion, and a rejected call
//! leaves that state untouched. The surrounding runtime is
//! responsible for feeding calls in one global order (see the
//! `ciphermail-node` actor).
//!
//! # Modules
//!
//! - [`registry`]: nickname ↔ public key ↔ owner records
//! - [`replay_gate`]: per-slot nonce and rate-limit admission
//! - [`message_log`]: fixed-capacity delivery-proof ring buffer
//! - [`call`]: typed calls, results and call kinds
//! - [`state`]: the composed transition function
//! - [`abi`]: fixed-width little-endian byte interface

pub mod abi;
pub mod call;
pub mod message_log;
pub mod registry;
pub mod replay_gate;
pub mod state;

pub use call::{Call, CallContext, CallKind, CallOutput, PostReceipt};
pub use state::{transition, ContractState, ContractStats};
