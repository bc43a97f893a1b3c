//! Application configuration with sensible defaults.
//!
//! All operational parameters are centralized here. Contract defaults
//! reproduce the protocol constants; changing them produces a ledger
//! that is incompatible with other deployments.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CiphermailError, Result};

/// Upper bound accepted for any capacity value, to keep a
/// misconfigured file from allocating gigabytes.
const MAX_CAPACITY: u32 = 1 << 24;

// ---------------------------------------------------------------------------
// ContractConfig
// ---------------------------------------------------------------------------

/// Parameters of the on-chain state machine.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Maximum number of registry slots. Slots are never reclaimed.
    pub max_users: u32,

    /// Capacity of the message metadata ring buffer.
    pub msg_log_capacity: u32,

    /// Minimum number of ticks between two accepted posts of one
    /// sender.
    pub rate_limit_ticks: u32,

    /// Tick value at which a fresh ledger starts.
    pub genesis_tick: u32,

    /// Wall-clock duration of one tick in milliseconds. `0` disables
    /// automatic advancement.
    pub tick_interval_ms: u64,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            max_users: 8192,
            msg_log_capacity: 65_536,
            rate_limit_ticks: 10,
            genesis_tick: 1,
            tick_interval_ms: 1000,
        }
    }
}

impl ContractConfig {
    /// Validates all contract parameters.
    pub fn validate(&self) -> Result<()> {
        if self.max_users == 0 || self.max_users > MAX_CAPACITY {
            return Err(CiphermailError::ConfigError {
                reason: format!("max_users must be in 1..={MAX_CAPACITY}"),
            });
        }

        if self.msg_log_capacity == 0 || self.msg_log_capacity > MAX_CAPACITY {
            return Err(CiphermailError::ConfigError {
                reason: format!("msg_log_capacity must be in 1..={MAX_CAPACITY}"),
            });
        }

        if self.genesis_tick == 0 {
            return Err(CiphermailError::ConfigError {
                reason: "genesis_tick must be at least 1".into(),
            });
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// KdfConfig
// ---------------------------------------------------------------------------

/// Argon2id cost parameters used when wrapping local private keys.
///
/// | Parameter | Default | Meaning |
/// |-----------|---------|---------|
/// | `m_cost`  | 65 536  | Memory usage in KiB (64 MiB) |
/// | `t_cost`  | 3       | Number of iterations |
/// | `p_cost`  | 1       | Degree of parallelism |
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KdfConfig {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Time cost (number of passes).
    pub t_cost: u32,
    /// Parallelism degree.
    pub p_cost: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            m_cost: 65_536,
            t_cost: 3,
            p_cost: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Parameters of the off-chain client.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Key-wrapping KDF parameters for newly written key files.
    pub kdf: KdfConfig,

    /// Maximum number of submissions of one metadata post, counting
    /// the first attempt.
    pub max_post_attempts: u32,

    /// Delay between two submissions of the same post.
    pub retry_backoff_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            kdf: KdfConfig::default(),
            max_post_attempts: 3,
            retry_backoff_ms: 250,
        }
    }
}

impl ClientConfig {
    /// Validates all client parameters.
    pub fn validate(&self) -> Result<()> {
        if self.kdf.t_cost == 0 || self.kdf.p_cost == 0 {
            return Err(CiphermailError::ConfigError {
                reason: "kdf t_cost and p_cost must be greater than 0".into(),
            });
        }

        if self.kdf.m_cost < 8 * self.kdf.p_cost {
            return Err(CiphermailError::ConfigError {
                reason: "kdf m_cost must be at least 8 * p_cost".into(),
            });
        }

        if self.max_post_attempts == 0 {
            return Err(CiphermailError::ConfigError {
                reason: "max_post_attempts must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Global application configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Contract parameters.
    pub contract: ContractConfig,
    /// Client parameters.
    pub client: ClientConfig,
}

impl AppConfig {
    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.contract.validate()?;
        self.client.validate()
    }

    /// Loads and validates a JSON config file.
    ///
    /// Missing fields take their default value.
    ///
    /// # Errors
    ///
    /// - [`CiphermailError::StorageError`] if the file cannot be read.
    /// - [`CiphermailError::ConfigError`] if the JSON is invalid or a
    ///   value is out of range.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| CiphermailError::StorageError {
            reason: format!("failed to read config file {}: {e}", path.display()),
        })?;

        let config: Self = serde_json::from_str(&json).map_err(|e| CiphermailError::ConfigError {
            reason: format!("failed to parse config file: {e}"),
        })?;

        config.validate()?;
        Ok(config)
    }
}
