//! Main event loop driving the ledger.
//!
//! [`run_event_loop`] is spawned as a tokio task by
//! [`LedgerNode::start`](crate::node::LedgerNode::start). It uses
//! `tokio::select!` to multiplex:
//!
//! 1. **Commands**: contract calls, tick control, status, shutdown.
//! 2. **Tick timer**: advances the tick every `tick_interval_ms`
//!    (disabled when the interval is `0`).
//! 3. **Shutdown signal**: graceful exit via `watch` channel.
//!
//! Exactly one command is handled per iteration, to completion.

use std::time::Duration;

use ciphermail_contract::CallContext;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::command::{LedgerCommand, LedgerStatus};
use crate::node::{LedgerRuntime, NodeState};

// ---------------------------------------------------------------------------
// Event loop entry point
// ---------------------------------------------------------------------------

/// Runs the ledger event loop until shutdown is signalled or every
/// command sender has been dropped.
pub(crate) async fn run_event_loop(mut rt: LedgerRuntime) {
    tracing::info!(
        tick = rt.tick,
        tick_interval_ms = rt.tick_interval_ms,
        "ledger event loop started"
    );

    let mut ticker = tick_timer(rt.tick_interval_ms);

    loop {
        tokio::select! {
            // ---------------------------------------------------------------
            // 1. Commands.
            // ---------------------------------------------------------------
            cmd = rt.command_rx.recv() => {
                let Some(cmd) = cmd else {
                    tracing::info!("all ledger handles dropped -- exiting event loop");
                    break;
                };
                if handle_command(cmd, &mut rt) {
                    tracing::info!("shutdown command received -- exiting event loop");
                    break;
                }
            }

            // ---------------------------------------------------------------
            // 2. Wall-clock tick.
            // ---------------------------------------------------------------
            _ = next_tick(&mut ticker) => {
                advance(&mut rt, 1);
            }

            // ---------------------------------------------------------------
            // 3. Shutdown signal via watch channel.
            // ---------------------------------------------------------------
            changed = rt.shutdown_rx.changed() => {
                if changed.is_err() || *rt.shutdown_rx.borrow() {
                    tracing::info!("shutdown signal received -- exiting event loop");
                    break;
                }
            }
        }
    }

    let stats = rt.contract.stats();
    tracing::info!(
        tick = rt.tick,
        registered_slots = stats.registered_slots,
        log_cursor = stats.log_cursor,
        "ledger event loop exited"
    );
}

// ---------------------------------------------------------------------------
// Command handler
// ---------------------------------------------------------------------------

/// Handles one command. Returns `true` if the loop should exit.
fn handle_command(cmd: LedgerCommand, rt: &mut LedgerRuntime) -> bool {
    match cmd {
        LedgerCommand::Submit {
            caller,
            call,
            reply,
        } => {
            let ctx = CallContext {
                caller,
                tick: rt.tick,
            };
            let outcome = rt.contract.apply(&ctx, &call);
            // Receiver may have been dropped. The call is committed
            // regardless.
            let _ = reply.send(outcome);
        }

        LedgerCommand::Invoke {
            caller,
            kind,
            input,
            reply,
        } => {
            let outcome = rt.contract.invoke(caller, rt.tick, kind, &input);
            let _ = reply.send(outcome);
        }

        LedgerCommand::CurrentTick { reply } => {
            let _ = reply.send(rt.tick);
        }

        LedgerCommand::AdvanceTicks { ticks, reply } => {
            advance(rt, ticks);
            let _ = reply.send(rt.tick);
        }

        LedgerCommand::Snapshot { reply } => {
            let _ = reply.send(LedgerStatus {
                state: NodeState::Running,
                tick: rt.tick,
                stats: rt.contract.stats(),
            });
        }

        LedgerCommand::Shutdown => return true,
    }
    false
}

// ---------------------------------------------------------------------------
// Tick helpers
// ---------------------------------------------------------------------------

fn advance(rt: &mut LedgerRuntime, ticks: u32) {
    rt.tick = rt.tick.saturating_add(ticks);
    tracing::trace!(tick = rt.tick, "tick advanced");
}

fn tick_timer(interval_ms: u64) -> Option<Interval> {
    if interval_ms == 0 {
        return None;
    }
    let period = Duration::from_millis(interval_ms);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(interval)
}

/// Resolves on the next timer tick, or never if ticking is disabled.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
