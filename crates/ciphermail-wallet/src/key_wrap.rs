//! Password wrapping of raw X25519 private keys.
//!
//! # Blob layout (v1)
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0      32   Argon2id salt (fresh per wrap)
//!  32      24   XChaCha20-Poly1305 nonce (fresh per wrap)
//!  56      48   ciphertext: 32-byte key + 16-byte tag
//! ```
//!
//! The KDF cost parameters are not part of the blob; they are stored
//! next to it in the key file.

use ciphermail_crypto::aead::{self, AeadNonce, TAG_LEN};
use ciphermail_crypto::ecdh::X25519StaticSecret;
use ciphermail_crypto::kdf::argon2id_derive_key;
use ciphermail_types::config::KdfConfig;
use ciphermail_types::{CiphermailError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

/// Binds wrapped blobs to this format version.
const KEYWRAP_AAD: &[u8] = b"ciphermail-keywrap-v1";

/// Argon2id salt length.
pub const SALT_LEN: usize = 32;

/// Length of the wrapped ciphertext (key plus tag).
pub const CIPHERTEXT_LEN: usize = X25519StaticSecret::LEN + TAG_LEN;

/// Total length of a v1 wrapped blob.
pub const WRAPPED_KEY_LEN: usize = SALT_LEN + AeadNonce::LEN + CIPHERTEXT_LEN;

// ---------------------------------------------------------------------------
// WrappedKey
// ---------------------------------------------------------------------------

/// A private key encrypted under a password-derived key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WrappedKey {
    salt: [u8; SALT_LEN],
    nonce: [u8; AeadNonce::LEN],
    ciphertext: [u8; CIPHERTEXT_LEN],
}

impl WrappedKey {
    /// Concatenates `[salt][nonce][ciphertext]`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(WRAPPED_KEY_LEN);
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Splits a v1 blob into its fields.
    ///
    /// # Errors
    ///
    /// [`CiphermailError::MalformedInput`] if the length is not
    /// exactly [`WRAPPED_KEY_LEN`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != WRAPPED_KEY_LEN {
            return Err(CiphermailError::MalformedInput {
                reason: format!(
                    "wrapped key must be {WRAPPED_KEY_LEN} bytes, got {}",
                    bytes.len()
                ),
            });
        }

        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; AeadNonce::LEN];
        let mut ciphertext = [0u8; CIPHERTEXT_LEN];
        salt.copy_from_slice(&bytes[..SALT_LEN]);
        nonce.copy_from_slice(&bytes[SALT_LEN..SALT_LEN + AeadNonce::LEN]);
        ciphertext.copy_from_slice(&bytes[SALT_LEN + AeadNonce::LEN..]);

        Ok(Self {
            salt,
            nonce,
            ciphertext,
        })
    }
}

// ---------------------------------------------------------------------------
// Wrap / Unwrap
// ---------------------------------------------------------------------------

/// Encrypts `secret` under a key derived from `password`.
///
/// Salt and nonce are fresh on every call, so wrapping the same key
/// twice yields unrelated blobs.
///
/// # Errors
///
/// - [`CiphermailError::ConfigError`] if `kdf` is rejected by Argon2.
/// - [`CiphermailError::CryptoError`] if the OS RNG or the cipher fails.
pub fn wrap(secret: &X25519StaticSecret, password: &str, kdf: &KdfConfig) -> Result<WrappedKey> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CiphermailError::CryptoError {
            reason: format!("failed to generate random salt: {e}"),
        })?;
    let nonce = AeadNonce::random()?;

    let wrapping_key = argon2id_derive_key(password.as_bytes(), &salt, kdf)?;
    let raw = secret.to_raw();
    let sealed = aead::seal(wrapping_key.as_bytes(), &nonce, &raw[..], KEYWRAP_AAD)?;

    let mut ciphertext = [0u8; CIPHERTEXT_LEN];
    if sealed.len() != CIPHERTEXT_LEN {
        return Err(CiphermailError::CryptoError {
            reason: format!("unexpected wrapped length {}", sealed.len()),
        });
    }
    ciphertext.copy_from_slice(&sealed);

    Ok(WrappedKey {
        salt,
        nonce: *nonce.as_bytes(),
        ciphertext,
    })
}

/// Recovers the private key from `wrapped`.
///
/// Returns `Ok(None)` when authentication fails. A wrong password and
/// a corrupted blob are indistinguishable here.
///
/// # Errors
///
/// [`CiphermailError::ConfigError`] if `kdf` is rejected by Argon2.
pub fn unwrap(
    wrapped: &WrappedKey,
    password: &str,
    kdf: &KdfConfig,
) -> Result<Option<X25519StaticSecret>> {
    let wrapping_key = argon2id_derive_key(password.as_bytes(), &wrapped.salt, kdf)?;
    let nonce = AeadNonce::from_bytes(wrapped.nonce);

    let Some(plain) = aead::open(wrapping_key.as_bytes(), &nonce, &wrapped.ciphertext, KEYWRAP_AAD)
    else {
        return Ok(None);
    };
    let plain = Zeroizing::new(plain);

    let mut raw = [0u8; X25519StaticSecret::LEN];
    if plain.len() != raw.len() {
        return Ok(None);
    }
    raw.copy_from_slice(&plain);
    Ok(Some(X25519StaticSecret::from_raw(raw)))
}

/// [`unwrap`] over a raw blob.
///
/// # Errors
///
/// [`CiphermailError::MalformedInput`] if `blob` is not a v1 layout,
/// plus the errors of [`unwrap`].
pub fn unwrap_bytes(
    blob: &[u8],
    password: &str,
    kdf: &KdfConfig,
) -> Result<Option<X25519StaticSecret>> {
    unwrap(&WrappedKey::from_bytes(blob)?, password, kdf)
}
