//! Local protection of ciphermail identity keys.
//!
//! - **Wrap / unwrap** a raw X25519 private key under a password
//!   (Argon2id + XChaCha20-Poly1305)
//! - **Key file** JSON persistence with recorded KDF parameters
//! - **Identity wallet** lock/unlock lifecycle and key rotation that
//!   keeps retired keys for reading old messages

pub mod key_file;
pub mod key_wrap;
pub mod wallet;
