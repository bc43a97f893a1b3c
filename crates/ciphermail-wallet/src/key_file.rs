//! JSON key-file persistence.
//!
//! # File format (v1)
//!
//! ```json
//! {
//!   "version": 1,
//!   "public_key": "<hex 32 bytes>",
//!   "wrapped_key": "<hex 104 bytes>",
//!   "kdf": { "m_cost": 65536, "t_cost": 3, "p_cost": 1 },
//!   "retired": [ { "public_key": "...", "wrapped_key": "..." } ]
//! }
//! ```
//!
//! Every wrapped key in the file shares the recorded KDF parameters.
//! No plaintext secret material is ever written.

use std::path::Path;

use ciphermail_types::config::KdfConfig;
use ciphermail_types::{CiphermailError, PublicKeyBytes, Result};
use serde::{Deserialize, Serialize};

use crate::key_wrap::WrappedKey;

/// Current key-file format version.
pub const KEY_FILE_VERSION: u32 = 1;

/// A wrapped key together with its public half, both hex encoded.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StoredKey {
    /// Hex X25519 public key.
    pub public_key: String,
    /// Hex v1 wrapped-key blob.
    pub wrapped_key: String,
}

impl StoredKey {
    /// Encodes a key pair for storage.
    pub fn new(public_key: &PublicKeyBytes, wrapped: &WrappedKey) -> Self {
        Self {
            public_key: public_key.to_string(),
            wrapped_key: hex::encode(wrapped.to_bytes()),
        }
    }

    /// Decodes the public key.
    ///
    /// # Errors
    ///
    /// [`CiphermailError::MalformedInput`] on bad hex or length.
    pub fn public_key(&self) -> Result<PublicKeyBytes> {
        self.public_key.parse()
    }

    /// Decodes the wrapped blob.
    ///
    /// # Errors
    ///
    /// [`CiphermailError::MalformedInput`] on bad hex or length.
    pub fn wrapped_key(&self) -> Result<WrappedKey> {
        let bytes = hex::decode(&self.wrapped_key).map_err(|e| CiphermailError::MalformedInput {
            reason: format!("wrapped key is not valid hex: {e}"),
        })?;
        WrappedKey::from_bytes(&bytes)
    }
}

/// On-disk representation of an identity wallet.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KeyFile {
    /// Format version, always [`KEY_FILE_VERSION`] when written.
    pub version: u32,
    /// Hex public key of the current identity key.
    pub public_key: String,
    /// Hex wrapped blob of the current identity key.
    pub wrapped_key: String,
    /// Argon2id parameters used for every blob in the file.
    pub kdf: KdfConfig,
    /// Keys replaced by rotation, oldest first.
    #[serde(default)]
    pub retired: Vec<StoredKey>,
}

impl KeyFile {
    /// The current key as a [`StoredKey`] view.
    pub fn current(&self) -> StoredKey {
        StoredKey {
            public_key: self.public_key.clone(),
            wrapped_key: self.wrapped_key.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

/// Writes `file` as pretty JSON.
///
/// The data goes to a sibling `.tmp` file first and is renamed into
/// place, so a crash never leaves a half-written key file behind.
///
/// # Errors
///
/// [`CiphermailError::StorageError`] on serialization or I/O failure.
pub fn write_key_file(path: &Path, file: &KeyFile) -> Result<()> {
    let json = serde_json::to_string_pretty(file).map_err(|e| CiphermailError::StorageError {
        reason: format!("key file serialization failed: {e}"),
    })?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json.as_bytes()).map_err(|e| CiphermailError::StorageError {
        reason: format!("failed to write key file: {e}"),
    })?;

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        CiphermailError::StorageError {
            reason: format!("failed to rename key file: {e}"),
        }
    })?;

    tracing::info!(path = %path.display(), "key file saved");
    Ok(())
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// Reads and validates a key file.
///
/// # Validation order
///
/// 1. File exists and parses as JSON.
/// 2. `version` equals [`KEY_FILE_VERSION`].
/// 3. Current and retired entries decode to well-formed keys and blobs.
///
/// # Errors
///
/// - [`CiphermailError::StorageError`] for I/O, JSON, or version errors.
/// - [`CiphermailError::MalformedInput`] for bad key encodings.
pub fn read_key_file(path: &Path) -> Result<KeyFile> {
    let json = std::fs::read_to_string(path).map_err(|e| CiphermailError::StorageError {
        reason: format!("failed to read key file {}: {e}", path.display()),
    })?;

    let file: KeyFile = serde_json::from_str(&json).map_err(|e| CiphermailError::StorageError {
        reason: format!("failed to parse key file: {e}"),
    })?;

    if file.version != KEY_FILE_VERSION {
        return Err(CiphermailError::StorageError {
            reason: format!(
                "unsupported key file version {} (expected {KEY_FILE_VERSION})",
                file.version
            ),
        });
    }

    for stored in std::iter::once(file.current()).chain(file.retired.iter().cloned()) {
        stored.public_key()?;
        stored.wrapped_key()?;
    }

    tracing::debug!(path = %path.display(), retired = file.retired.len(), "key file loaded");
    Ok(file)
}
