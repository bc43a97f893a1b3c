//! SHA3-256 hashing.
//!
//! The content-hash commitment posted on-chain is a SHA3-256 digest of
//! the serialized ciphertext blob. Identical input always produces an
//! identical digest.

use sha3::{Digest, Sha3_256};

/// Computes the SHA3-256 hash of `data`.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha3_256::digest(data));
    out
}

/// Computes SHA3-256 over the concatenation of `parts` without
/// allocating the concatenated buffer.
pub fn sha3_256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}
