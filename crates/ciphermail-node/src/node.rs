//! Ledger lifecycle and the channel-based handle.
//!
//! The [`LedgerNode`] owns the contract state until it is started;
//! from then on the state lives inside the event loop task and is
//! reachable only through [`LedgerCommand`]s.
//!
//! # State machine
//!
//! ```text
//! Initializing ──start()──▶ Running ──shutdown()──▶ ShuttingDown
//! ```
//!
//! Double-start and shutdown-from-initializing are rejected with
//! `CiphermailError::ConfigError`.

use std::time::Duration;

use ciphermail_contract::{Call, CallKind, ContractState};
use ciphermail_types::config::ContractConfig;
use ciphermail_types::{CiphermailError, Identity, Result, Tick};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::command::{CallResult, LedgerCommand, LedgerStatus};
use crate::event_loop;

/// Bounded command channel capacity.
///
/// Callers await backpressure if the event loop falls behind.
const COMMAND_CHANNEL_SIZE: usize = 256;

// ---------------------------------------------------------------------------
// NodeState
// ---------------------------------------------------------------------------

/// Lifecycle state of the ledger.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NodeState {
    /// Created, event loop not started.
    Initializing,
    /// Event loop is active.
    Running,
    /// Shutdown requested.
    ShuttingDown,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Running => write!(f, "running"),
            Self::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerRuntime (internal)
// ---------------------------------------------------------------------------

/// Owned runtime state moved into the event loop task.
pub(crate) struct LedgerRuntime {
    pub contract: ContractState,
    pub tick: Tick,
    pub tick_interval_ms: u64,
    pub command_rx: mpsc::Receiver<LedgerCommand>,
    pub shutdown_rx: watch::Receiver<bool>,
}

// ---------------------------------------------------------------------------
// LedgerNode
// ---------------------------------------------------------------------------

/// In-process ledger: one contract state behind one serializing task.
///
/// After construction via [`LedgerNode::new`], call
/// [`LedgerNode::start`] to spawn the event loop, then talk to it
/// through [`LedgerNode::handle`]. Dropping the node stops the loop.
pub struct LedgerNode {
    state: NodeState,
    runtime: Option<LedgerRuntime>,
    command_tx: mpsc::Sender<LedgerCommand>,
    shutdown_tx: watch::Sender<bool>,
    rate_limit_wait: Duration,
}

impl LedgerNode {
    /// Creates a ledger with an empty contract state at the genesis
    /// tick.
    ///
    /// # Errors
    ///
    /// `CiphermailError::ConfigError` if `config` is out of range.
    pub fn new(config: &ContractConfig) -> Result<Self> {
        let contract = ContractState::new(config)?;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runtime = LedgerRuntime {
            contract,
            tick: config.genesis_tick,
            tick_interval_ms: config.tick_interval_ms,
            command_rx,
            shutdown_rx,
        };

        Ok(Self {
            state: NodeState::Initializing,
            runtime: Some(runtime),
            command_tx,
            shutdown_tx,
            rate_limit_wait: rate_limit_wait(config),
        })
    }

    /// Creates and starts a ledger in one step.
    pub fn spawn(config: &ContractConfig) -> Result<(Self, JoinHandle<()>)> {
        let mut node = Self::new(config)?;
        let task = node.start()?;
        Ok((node, task))
    }

    /// Starts the event loop in a new tokio task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// `CiphermailError::ConfigError` if the node is not in
    /// `Initializing` state.
    pub fn start(&mut self) -> Result<JoinHandle<()>> {
        if self.state != NodeState::Initializing {
            return Err(CiphermailError::ConfigError {
                reason: format!(
                    "cannot start ledger in state '{}'; expected 'initializing'",
                    self.state,
                ),
            });
        }

        let runtime = self
            .runtime
            .take()
            .ok_or_else(|| CiphermailError::ConfigError {
                reason: "runtime already consumed (double start?)".into(),
            })?;

        let handle = tokio::spawn(event_loop::run_event_loop(runtime));
        self.state = NodeState::Running;
        Ok(handle)
    }

    /// Signals the event loop to exit after the command it is
    /// currently processing. Idempotent once running.
    ///
    /// # Errors
    ///
    /// `CiphermailError::ConfigError` if the node was never started.
    pub fn shutdown(&mut self) -> Result<()> {
        match self.state {
            NodeState::Initializing => Err(CiphermailError::ConfigError {
                reason: "cannot shutdown a ledger that has not been started".into(),
            }),
            NodeState::ShuttingDown => Ok(()),
            NodeState::Running => {
                self.state = NodeState::ShuttingDown;
                let _ = self.shutdown_tx.send(true);
                Ok(())
            }
        }
    }

    /// Returns a cloneable handle for submitting commands.
    pub fn handle(&self) -> LedgerHandle {
        LedgerHandle {
            tx: self.command_tx.clone(),
            rate_limit_wait: self.rate_limit_wait,
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> NodeState {
        self.state
    }
}

// ---------------------------------------------------------------------------
// LedgerHandle
// ---------------------------------------------------------------------------

/// Cloneable sender side of the ledger command channel.
///
/// Every method fails with [`CiphermailError::NodeUnavailable`] once
/// the event loop has exited.
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    tx: mpsc::Sender<LedgerCommand>,
    rate_limit_wait: Duration,
}

impl LedgerHandle {
    /// Wall-clock time after which a rate-limited sender may post
    /// again. Zero when ticks only move through
    /// [`advance_ticks`](Self::advance_ticks).
    pub fn rate_limit_wait(&self) -> Duration {
        self.rate_limit_wait
    }

    /// Applies a typed call as `caller` at the current tick.
    pub async fn submit(&self, caller: Identity, call: Call) -> Result<CallResult> {
        self.request(|reply| LedgerCommand::Submit {
            caller,
            call,
            reply,
        })
        .await
    }

    /// Applies a call given as raw input bytes.
    pub async fn invoke(
        &self,
        caller: Identity,
        kind: CallKind,
        input: Vec<u8>,
    ) -> Result<Vec<u8>> {
        self.request(|reply| LedgerCommand::Invoke {
            caller,
            kind,
            input,
            reply,
        })
        .await?
    }

    pub async fn current_tick(&self) -> Result<Tick> {
        self.request(|reply| LedgerCommand::CurrentTick { reply })
            .await
    }

    /// Advances the tick by `ticks` and returns the new tick.
    pub async fn advance_ticks(&self, ticks: u32) -> Result<Tick> {
        self.request(|reply| LedgerCommand::AdvanceTicks { ticks, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<LedgerStatus> {
        self.request(|reply| LedgerCommand::Snapshot { reply }).await
    }

    /// Asks the event loop to exit.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(LedgerCommand::Shutdown)
            .await
            .map_err(|_| unavailable())
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LedgerCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).await.map_err(|_| unavailable())?;
        rx.await.map_err(|_| unavailable())
    }
}

/// One tick more than the rate limit, so the wait never ends on the
/// same instant as the tick that would admit the post.
fn rate_limit_wait(config: &ContractConfig) -> Duration {
    let ticks = u64::from(config.rate_limit_ticks).saturating_add(1);
    Duration::from_millis(ticks.saturating_mul(config.tick_interval_ms))
}

fn unavailable() -> CiphermailError {
    CiphermailError::NodeUnavailable {
        reason: "ledger event loop has exited".into(),
    }
}
