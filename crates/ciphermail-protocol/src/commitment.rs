//! Content-hash commitments binding off-chain blobs to on-chain
//! metadata.
//!
//! The commitment is SHA3-256 over the serialized wire blob
//! `[nonce][sender_pk][ciphertext]`. It never sees plaintext.

use ciphermail_crypto::hash::sha3_256;
use ciphermail_types::{ContentHash, Identity, MessageMetaEntry};
use subtle::ConstantTimeEq;

/// Hashes a serialized wire blob into the 32-byte on-chain
/// commitment. Deterministic: identical bytes give identical hashes.
///
/// The input is the whole output of
/// [`EncryptedMessage::serialize`](crate::envelope::EncryptedMessage::serialize),
/// nonce and sender key included. Hashing only the `ciphertext` field
/// yields a different value that no delivery proof will match.
pub fn content_hash(blob: &[u8]) -> ContentHash {
    ContentHash::new(sha3_256(blob))
}

/// Checks that `blob` is the message `entry` commits to, sent by
/// `expected_sender` to `expected_receiver`.
///
/// All three comparisons are evaluated in constant time and combined
/// before branching.
pub fn verify_delivery(
    blob: &[u8],
    entry: &MessageMetaEntry,
    expected_sender: &Identity,
    expected_receiver: &Identity,
) -> bool {
    let hash = content_hash(blob);
    let hash_ok = hash.as_bytes().ct_eq(entry.content_hash.as_bytes());
    let sender_ok = expected_sender.as_bytes().ct_eq(entry.sender.as_bytes());
    let receiver_ok = expected_receiver.as_bytes().ct_eq(entry.receiver.as_bytes());
    (hash_ok & sender_ok & receiver_ok).into()
}
