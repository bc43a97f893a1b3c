//! Off-chain wire format of an encrypted message.
//!
//! ```text
//! [nonce:24][sender_public_key:32][ciphertext:N]
//! ```
//!
//! The blob is what travels over the transport and what the content
//! hash commits to. Nothing about it is stored on-chain.

use ciphermail_types::{CiphermailError, Result};

/// Byte length of the AEAD nonce prefix.
pub const NONCE_LEN: usize = 24;

/// Byte length of the sender public-key field.
pub const SENDER_KEY_LEN: usize = 32;

/// Length of the fixed header preceding the ciphertext.
pub const HEADER_LEN: usize = NONCE_LEN + SENDER_KEY_LEN;

/// Smallest blob `deserialize` accepts: header plus one ciphertext byte.
pub const MIN_WIRE_LEN: usize = HEADER_LEN + 1;

/// An end-to-end encrypted message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncryptedMessage {
    /// XChaCha20-Poly1305 nonce.
    pub nonce: [u8; NONCE_LEN],
    /// Sender's X25519 identity public key.
    pub sender_public_key: [u8; SENDER_KEY_LEN],
    /// Ciphertext with the 16-byte Poly1305 tag appended.
    pub ciphertext: Vec<u8>,
}

impl EncryptedMessage {
    /// Encodes the message into its wire layout.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.sender_public_key);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Decodes a wire blob.
    ///
    /// Only the length is checked here. Whether the ciphertext
    /// authenticates is decided by [`crate::e2e::decrypt`].
    ///
    /// # Errors
    ///
    /// [`CiphermailError::MalformedInput`] ("TooShort") if `bytes` is
    /// shorter than [`MIN_WIRE_LEN`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_WIRE_LEN {
            return Err(CiphermailError::MalformedInput {
                reason: format!(
                    "TooShort: wire blob is {} bytes, minimum is {MIN_WIRE_LEN}",
                    bytes.len()
                ),
            });
        }

        let (nonce_bytes, rest) = bytes.split_at(NONCE_LEN);
        let (key_bytes, ciphertext) = rest.split_at(SENDER_KEY_LEN);

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);
        let mut sender_public_key = [0u8; SENDER_KEY_LEN];
        sender_public_key.copy_from_slice(key_bytes);

        Ok(Self {
            nonce,
            sender_public_key,
            ciphertext: ciphertext.to_vec(),
        })
    }
}
