//! Cryptographic primitives for the ciphermail workspace.
//!
//! This crate is the **sole** location for raw cryptographic
//! operations. Higher layers (protocol, wallet) compose these
//! primitives but never touch a cipher or curve crate directly.
//!
//! # Modules
//!
//! - [`ecdh`]: X25519 keypair generation and Diffie-Hellman
//! - [`aead`]: XChaCha20-Poly1305 authenticated encryption
//! - [`hash`]: SHA3-256 hashing
//! - [`kdf`]: Argon2id password-based key derivation
//! - [`hkdf`]: HKDF-SHA256 expansion of shared secrets

pub mod aead;
pub mod ecdh;
pub mod hash;
pub mod hkdf;
pub mod kdf;
