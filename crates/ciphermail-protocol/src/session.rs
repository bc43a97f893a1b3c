//! Session key derivation from ECDH shared secrets.
//!
//! The raw X25519 output is never used as a cipher key. It is run
//! through HKDF-SHA256 with a fixed domain-separating salt and an
//! `info` string that binds the key to the ordered
//! `(sender, recipient)` public-key pair:
//!
//! ```text
//! session_key = HKDF-SHA256(
//!     IKM  = x25519(own_secret, peer_public),
//!     salt = b"ciphermail-e2e-v1",
//!     info = sender_pk || recipient_pk,
//!     L    = 32
//! )
//! ```

use ciphermail_crypto::hkdf::hkdf_sha256;
use ciphermail_types::Result;
use zeroize::Zeroizing;

const E2E_SALT: &[u8] = b"ciphermail-e2e-v1";

// ---------------------------------------------------------------------------
// SessionKey
// ---------------------------------------------------------------------------

/// 256-bit XChaCha20-Poly1305 key for one sender/recipient pair.
///
/// Zeroized on drop. No `Clone`, no `Debug`.
pub struct SessionKey(Zeroizing<[u8; 32]>);

impl SessionKey {
    /// Returns the 32-byte symmetric key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Builds the HKDF `info` field: `sender_pk || recipient_pk`.
pub fn context_info(sender_pk: &[u8; 32], recipient_pk: &[u8; 32]) -> [u8; 64] {
    let mut info = [0u8; 64];
    info[..32].copy_from_slice(sender_pk);
    info[32..].copy_from_slice(recipient_pk);
    info
}

/// Derives the session key for a message from `sender_pk` to
/// `recipient_pk`.
///
/// Sender and recipient obtain the same key because X25519 is
/// symmetric and the `info` ordering is fixed by message direction,
/// not by who computes it.
///
/// # Errors
///
/// [`ciphermail_types::CiphermailError::CryptoError`] if HKDF fails.
pub fn derive_session_key(
    shared_secret: &[u8; 32],
    sender_pk: &[u8; 32],
    recipient_pk: &[u8; 32],
) -> Result<SessionKey> {
    let info = context_info(sender_pk, recipient_pk);
    let okm = hkdf_sha256::<32>(shared_secret, E2E_SALT, &info)?;
    Ok(SessionKey(okm))
}
