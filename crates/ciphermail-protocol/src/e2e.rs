//! Authenticated ECDH encryption between two identity keys.
//!
//! # Encryption flow (sender)
//!
//! ```text
//! 1. shared      ← X25519(sender_secret, recipient_public)
//! 2. session_key ← HKDF-SHA256(shared, info = sender_pk || recipient_pk)
//! 3. nonce       ← random 24 bytes
//! 4. ciphertext  ← XChaCha20-Poly1305(session_key, nonce, plaintext)
//! 5. return { nonce, sender_pk, ciphertext }
//! ```
//!
//! # Decryption flow (recipient)
//!
//! ```text
//! 1. shared      ← X25519(recipient_secret, msg.sender_public_key)
//! 2. session_key ← HKDF-SHA256(shared, info = msg.sender_pk || own_pk)
//! 3. plaintext   ← XChaCha20-Poly1305.open(session_key, msg.nonce, msg.ciphertext)
//! ```
//!
//! The sender's public key travels with the message so the recipient
//! needs no registry lookup to decrypt. Forward secrecy is out of
//! scope: both sides use their long-lived identity keys.

use ciphermail_crypto::aead::{self, AeadNonce};
use ciphermail_crypto::ecdh::{ecdh_derive_shared, X25519PublicKey, X25519StaticSecret};
use ciphermail_types::{CiphermailError, Result};

use crate::envelope::EncryptedMessage;
use crate::session::derive_session_key;

// ---------------------------------------------------------------------------
// Encrypt
// ---------------------------------------------------------------------------

/// Encrypts `plaintext` from `sender_secret` to `recipient_public`.
///
/// # Errors
///
/// - [`CiphermailError::CryptoError`] if the recipient key is a
///   low-order point (the shared secret would be all zeros), if the
///   OS RNG fails, or if HKDF/AEAD reject their input.
pub fn encrypt(
    plaintext: &[u8],
    sender_secret: &X25519StaticSecret,
    recipient_public: &X25519PublicKey,
) -> Result<EncryptedMessage> {
    let shared = ecdh_derive_shared(sender_secret, recipient_public);
    if !shared.is_contributory() {
        return Err(CiphermailError::CryptoError {
            reason: "recipient public key is a low-order point".into(),
        });
    }

    let sender_pk = sender_secret.public_key().to_bytes();
    let session_key =
        derive_session_key(shared.as_bytes(), &sender_pk, recipient_public.as_bytes())?;

    let nonce = AeadNonce::random()?;
    let ciphertext = aead::seal(session_key.as_bytes(), &nonce, plaintext, &[])?;

    Ok(EncryptedMessage {
        nonce: *nonce.as_bytes(),
        sender_public_key: sender_pk,
        ciphertext,
    })
}

// ---------------------------------------------------------------------------
// Decrypt
// ---------------------------------------------------------------------------

/// Decrypts `msg` with `recipient_secret`.
///
/// Returns `None` for every failure: wrong recipient, tampered
/// ciphertext, forged sender key, or a low-order sender key. The
/// full key schedule and tag check run on every path before the
/// outcome is decided.
pub fn decrypt(msg: &EncryptedMessage, recipient_secret: &X25519StaticSecret) -> Option<Vec<u8>> {
    let sender_public = X25519PublicKey::from_bytes(msg.sender_public_key);
    let shared = ecdh_derive_shared(recipient_secret, &sender_public);

    let recipient_pk = recipient_secret.public_key().to_bytes();
    let session_key =
        derive_session_key(shared.as_bytes(), &msg.sender_public_key, &recipient_pk).ok()?;

    let nonce = AeadNonce::from_bytes(msg.nonce);
    let opened = aead::open(session_key.as_bytes(), &nonce, &msg.ciphertext, &[]);

    if !shared.is_contributory() {
        return None;
    }
    opened
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
