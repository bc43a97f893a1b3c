//! In-process ledger runtime for ciphermail.
//!
//! Funnels every contract call through one tokio task that owns the
//! contract state, and layers an async client and a messenger on top.
//!
//! # Modules
//!
//! - [`node`]: lifecycle and the cloneable [`node::LedgerHandle`]
//! - [`command`]: channel message types
//! - `event_loop`: the single-writer loop and tick timer
//! - [`client`]: typed calls and post retry policy
//! - [`messenger`]: encrypt, commit, post, and the matching open

pub mod client;
pub mod command;
mod event_loop;
pub mod messenger;
pub mod node;

pub use client::LedgerClient;
pub use command::{LedgerCommand, LedgerStatus};
pub use messenger::Messenger;
pub use node::{LedgerHandle, LedgerNode, NodeState};
