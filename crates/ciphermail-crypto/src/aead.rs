//! XChaCha20-Poly1305 authenticated encryption.
//!
//! Message encryption and key wrapping both seal with this cipher
//! using 192-bit nonces drawn from OS entropy. Opening never reports
//! *why* authentication failed: a wrong key, a flipped bit and a
//! truncated tag all yield the same `None`.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use ciphermail_types::{CiphermailError, Result};
use rand::rngs::OsRng;
use rand::RngCore;

/// Length of the Poly1305 authentication tag appended to every
/// ciphertext.
pub const TAG_LEN: usize = 16;

// ---------------------------------------------------------------------------
// AeadNonce
// ---------------------------------------------------------------------------

/// 192-bit (24-byte) nonce for XChaCha20-Poly1305.
///
/// Unrelated to the 32-bit on-chain anti-replay nonce.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AeadNonce([u8; 24]);

impl AeadNonce {
    /// Fixed byte length of an XChaCha20-Poly1305 nonce.
    pub const LEN: usize = 24;

    /// Creates an [`AeadNonce`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 24]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 24-byte array.
    pub fn as_bytes(&self) -> &[u8; 24] {
        &self.0
    }

    /// Draws a fresh random nonce from OS entropy.
    ///
    /// # Errors
    ///
    /// [`CiphermailError::CryptoError`] if the OS RNG is unavailable.
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; 24];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CiphermailError::CryptoError {
                reason: format!("failed to draw AEAD nonce: {e}"),
            })?;
        Ok(Self(bytes))
    }
}

// ---------------------------------------------------------------------------
// Seal / Open
// ---------------------------------------------------------------------------

/// Encrypts `plaintext` under `key` and `nonce`, binding `aad`.
///
/// Returns the ciphertext with the 16-byte tag appended
/// (`plaintext.len() + TAG_LEN` bytes).
///
/// # Errors
///
/// [`CiphermailError::CryptoError`] if the cipher refuses the input
/// (only possible for plaintexts beyond the XChaCha20 length limit).
pub fn seal(key: &[u8; 32], nonce: &AeadNonce, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(XNonce::from_slice(&nonce.0), Payload { msg: plaintext, aad })
        .map_err(|e| CiphermailError::CryptoError {
            reason: format!("XChaCha20-Poly1305 encryption failed: {e}"),
        })
}

/// Decrypts and authenticates `ciphertext`.
///
/// Returns `None` on any authentication failure. The tag comparison
/// inside `chacha20poly1305` is constant time, and no partial
/// plaintext is ever released.
pub fn open(key: &[u8; 32], nonce: &AeadNonce, ciphertext: &[u8], aad: &[u8]) -> Option<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(XNonce::from_slice(&nonce.0), Payload { msg: ciphertext, aad })
        .ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
