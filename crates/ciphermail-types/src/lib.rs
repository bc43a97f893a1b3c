//! Core shared types for the ciphermail workspace.
//!
//! Every fixed-width value that crosses a crate boundary (chain
//! identities, nicknames, public keys, content hashes) is defined here,
//! together with the central error type and the on-chain result-code
//! taxonomy. No other crate should define shared types.

pub mod config;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Width of the on-chain nickname field in bytes (null-padded UTF-8).
pub const NICKNAME_LEN: usize = 32;

/// Width of an X25519 public key in bytes.
pub const PUBKEY_LEN: usize = 32;

/// Width of a content hash in bytes.
pub const HASH_LEN: usize = 32;

/// Discrete logical time unit of the ledger.
///
/// Used for registration timestamps, rate-limit measurement and log
/// timestamps.
pub type Tick = u32;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Owning chain identity (32 bytes).
///
/// This is the authenticated invoker of every contract call. The
/// contract never derives it; it is supplied by the execution
/// environment alongside each call.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Identity([u8; 32]);

impl Identity {
    /// The fixed byte length of an identity.
    pub const LEN: usize = 32;

    /// Creates a new `Identity` from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Identity {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Identity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Identity {
    type Err = CiphermailError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let arr = decode_hex_32(s).map_err(|reason| CiphermailError::InvalidIdentity { reason })?;
        Ok(Self(arr))
    }
}

// ---------------------------------------------------------------------------
// PublicKeyBytes
// ---------------------------------------------------------------------------

/// Raw X25519 public key as stored in the registry (32 bytes).
///
/// The registry treats keys as opaque bytes; conversion into a curve
/// point happens only in the crypto crate.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PublicKeyBytes([u8; 32]);

impl PublicKeyBytes {
    /// The fixed byte length of a public key.
    pub const LEN: usize = PUBKEY_LEN;

    /// Creates a new `PublicKeyBytes` from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for PublicKeyBytes {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for PublicKeyBytes {
    type Err = CiphermailError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let arr = decode_hex_32(s).map_err(|reason| CiphermailError::MalformedInput {
            reason: format!("public key: {reason}"),
        })?;
        Ok(Self(arr))
    }
}

// ---------------------------------------------------------------------------
// ContentHash
// ---------------------------------------------------------------------------

/// 32-byte digest of an encrypted message blob.
///
/// Posted on-chain as the tamper-evident delivery commitment. Always
/// computed over ciphertext, never over plaintext.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// The fixed byte length of a content hash.
    pub const LEN: usize = HASH_LEN;

    /// Creates a new `ContentHash` from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for ContentHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// Nickname
// ---------------------------------------------------------------------------

/// Fixed-width, null-padded UTF-8 nickname (32 bytes).
///
/// Two nicknames are equal iff all 32 bytes are equal, matching the
/// byte comparison the registry performs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Nickname([u8; NICKNAME_LEN]);

impl Nickname {
    /// Builds a nickname from a human-entered string.
    ///
    /// # Errors
    ///
    /// [`CiphermailError::InvalidNickname`] if the string is empty,
    /// longer than [`NICKNAME_LEN`] bytes, or contains a NUL byte
    /// (which would be indistinguishable from padding).
    pub fn new(name: &str) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() {
            return Err(CiphermailError::InvalidNickname {
                reason: "nickname must not be empty".into(),
            });
        }
        if bytes.len() > NICKNAME_LEN {
            return Err(CiphermailError::InvalidNickname {
                reason: format!(
                    "nickname is {} bytes, maximum is {NICKNAME_LEN}",
                    bytes.len()
                ),
            });
        }
        if bytes.contains(&0) {
            return Err(CiphermailError::InvalidNickname {
                reason: "nickname must not contain NUL bytes".into(),
            });
        }

        let mut arr = [0u8; NICKNAME_LEN];
        arr[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Wraps a raw on-chain field without validation.
    pub fn from_bytes(bytes: [u8; NICKNAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32-byte field.
    pub fn as_bytes(&self) -> &[u8; NICKNAME_LEN] {
        &self.0
    }

    /// Returns the nickname with trailing padding removed, decoding
    /// invalid UTF-8 lossily.
    pub fn to_display_string(&self) -> String {
        let end = self
            .0
            .iter()
            .rposition(|b| *b != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl FromStr for Nickname {
    type Err = CiphermailError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// MessageMetaEntry
// ---------------------------------------------------------------------------

/// One delivery-proof record in the on-chain metadata log.
///
/// Field order matches the `GetMessageMeta` output layout.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MessageMetaEntry {
    /// Identity that posted the record.
    pub sender: Identity,
    /// Intended recipient identity.
    pub receiver: Identity,
    /// Hash of the off-chain wire blob.
    pub content_hash: ContentHash,
    /// Tick at which the record was accepted.
    pub tick: Tick,
    /// Sender's anti-replay nonce for this post.
    pub nonce: u32,
}

// ---------------------------------------------------------------------------
// ContractError
// ---------------------------------------------------------------------------

/// Rejection codes of the on-chain state machine.
///
/// These are always returned as values. A rejected call leaves the
/// contract state exactly as it was.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Error, Serialize, Deserialize)]
pub enum ContractError {
    /// The caller already owns an active registration.
    #[error("caller already owns an active registration")]
    AlreadyRegistered,
    /// Another active record holds the requested nickname.
    #[error("nickname is held by another active record")]
    NicknameTaken,
    /// The slot array reached its fixed maximum.
    #[error("registry is full")]
    RegistryFull,
    /// The caller holds no active registration.
    #[error("sender is not registered")]
    NotRegistered,
    /// Sender and receiver are the same identity.
    #[error("self-addressed metadata is not allowed")]
    SelfMessage,
    /// Nonce is not strictly greater than the last accepted nonce.
    #[error("nonce is not strictly increasing")]
    BadNonce,
    /// Too few ticks since the sender's last accepted post.
    #[error("rate limit interval has not elapsed")]
    RateLimited,
    /// The caller does not own the record it tried to mutate.
    #[error("caller is not authorized to mutate this record")]
    NotAuthorized,
    /// The requested log index is out of range or already overwritten.
    #[error("log index is outside the readable window")]
    IndexOutOfWindow,
}

impl ContractError {
    /// Slot code reported by `RegisterUser` on rejection.
    ///
    /// `-1` nickname taken, `-2` registry full, `-3` already
    /// registered. Codes that `RegisterUser` cannot produce map to
    /// `i32::MIN`.
    pub fn register_code(self) -> i32 {
        match self {
            Self::NicknameTaken => -1,
            Self::RegistryFull => -2,
            Self::AlreadyRegistered => -3,
            _ => i32::MIN,
        }
    }

    /// Inverse of [`register_code`](Self::register_code).
    pub fn from_register_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::NicknameTaken),
            -2 => Some(Self::RegistryFull),
            -3 => Some(Self::AlreadyRegistered),
            _ => None,
        }
    }

    /// `errorCode` reported by `PostMessageMeta` on rejection.
    ///
    /// `1` not registered, `2` bad nonce, `3` rate limited, `4`
    /// self-message. `0` is reserved for success.
    pub fn post_code(self) -> u8 {
        match self {
            Self::NotRegistered => 1,
            Self::BadNonce => 2,
            Self::RateLimited => 3,
            Self::SelfMessage => 4,
            _ => u8::MAX,
        }
    }

    /// Inverse of [`post_code`](Self::post_code).
    pub fn from_post_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::NotRegistered),
            2 => Some(Self::BadNonce),
            3 => Some(Self::RateLimited),
            4 => Some(Self::SelfMessage),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CiphermailError
// ---------------------------------------------------------------------------

/// Central error type for the ciphermail workspace.
///
/// All crates convert their internal failures into variants of this
/// enum. Authentication failures of decryption and key unwrapping are
/// deliberately **not** represented here; those surface as `None`.
#[derive(Debug, Error)]
pub enum CiphermailError {
    /// A chain identity is malformed.
    #[error("invalid identity: {reason}")]
    InvalidIdentity {
        /// Human-readable description of the problem.
        reason: String,
    },

    /// A nickname cannot be encoded into the fixed-width field.
    #[error("invalid nickname: {reason}")]
    InvalidNickname {
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Input bytes do not match the expected layout (e.g. a wire
    /// blob shorter than its fixed header).
    #[error("malformed input: {reason}")]
    MalformedInput {
        /// Human-readable description of the layout violation.
        reason: String,
    },

    /// A cryptographic primitive failed for a non-adversarial reason
    /// (bad parameters, RNG failure).
    #[error("crypto error: {reason}")]
    CryptoError {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Reading or writing local files failed.
    #[error("storage error: {reason}")]
    StorageError {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// A protocol-level invariant was violated on the client side.
    #[error("protocol error: {reason}")]
    ProtocolError {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// The contract rejected a call.
    #[error("contract rejected call: {code}")]
    Contract {
        /// The rejection code returned by the state machine.
        code: ContractError,
    },

    /// The ledger actor is gone (shut down or panicked).
    #[error("ledger node unavailable: {reason}")]
    NodeUnavailable {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },
}

impl From<ContractError> for CiphermailError {
    fn from(code: ContractError) -> Self {
        Self::Contract { code }
    }
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`CiphermailError`].
pub type Result<T> = std::result::Result<T, CiphermailError>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode_hex_32(s: &str) -> std::result::Result<[u8; 32], String> {
    let bytes = hex::decode(s).map_err(|_| "invalid hex encoding".to_string())?;
    if bytes.len() != 32 {
        return Err(format!("expected 32 bytes, got {}", bytes.len()));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
