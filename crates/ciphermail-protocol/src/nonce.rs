//! Client-side minting of anti-replay nonces.
//!
//! The ledger only requires each accepted nonce to be strictly greater
//! than the sender's previous one. [`NonceSequence`] seeds from a
//! coarse wall clock so a fresh client process usually starts above
//! anything it posted before, and falls back to `last + 1` whenever
//! the clock has not moved or has gone backwards.

use chrono::Utc;
use ciphermail_types::{CiphermailError, Result};

/// Strictly increasing `u32` nonce generator for one sender.
#[derive(Clone, Debug, Default)]
pub struct NonceSequence {
    last: u32,
}

impl NonceSequence {
    /// Creates a sequence whose next value is at least `1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sequence that continues after `last`.
    pub fn starting_after(last: u32) -> Self {
        Self { last }
    }

    /// Last value handed out or observed.
    pub fn last(&self) -> u32 {
        self.last
    }

    /// Returns `max(last + 1, now_utc_seconds)`.
    ///
    /// # Errors
    ///
    /// [`CiphermailError::ProtocolError`] once `u32::MAX` has been
    /// used; the sender can never post again with this identity.
    pub fn next(&mut self) -> Result<u32> {
        self.next_with_clock(coarse_clock())
    }

    /// Lifts the floor so the next value is greater than `nonce`.
    ///
    /// Used after the ledger reports a nonce this process did not
    /// mint (another device, a restart).
    pub fn observe(&mut self, nonce: u32) {
        self.last = self.last.max(nonce);
    }

    fn next_with_clock(&mut self, clock: u32) -> Result<u32> {
        let bumped = self
            .last
            .checked_add(1)
            .ok_or_else(|| CiphermailError::ProtocolError {
                reason: "nonce space exhausted".into(),
            })?;
        self.last = bumped.max(clock);
        Ok(self.last)
    }
}

fn coarse_clock() -> u32 {
    u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX)
}
