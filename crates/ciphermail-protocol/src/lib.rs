//! Client-side message protocol for ciphermail.
//!
//! Turns plaintext into the exact bytes the ledger commits to: an
//! authenticated ECDH encryption, a fixed wire layout, and a
//! content-hash commitment over that layout.
//!
//! # Modules
//!
//! - [`session`]: HKDF session keys bound to a sender/recipient pair
//! - [`envelope`]: `EncryptedMessage` and its `[nonce][pk][ct]` wire form
//! - [`e2e`]: `encrypt` / `decrypt`
//! - [`commitment`]: content hash and delivery-proof verification
//! - [`nonce`]: strictly increasing anti-replay nonce minting

pub mod commitment;
pub mod e2e;
pub mod envelope;
pub mod nonce;
pub mod session;
