//! X25519 key generation and Diffie-Hellman key agreement.
//!
//! Identity keys are long-lived static secrets. The same secret is
//! used both to encrypt outgoing messages and to decrypt incoming
//! ones; the registry publishes only the public half.

use rand::rngs::OsRng;
use zeroize::{Zeroize, Zeroizing};

// ---------------------------------------------------------------------------
// X25519PublicKey
// ---------------------------------------------------------------------------

/// X25519 public key (32 bytes, Montgomery u-coordinate).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct X25519PublicKey(x25519_dalek::PublicKey);

impl X25519PublicKey {
    /// Fixed byte length of a public key.
    pub const LEN: usize = 32;

    /// Creates an [`X25519PublicKey`] from its raw 32-byte encoding.
    ///
    /// Every 32-byte string is a valid u-coordinate, so this cannot
    /// fail. Low-order points are caught later by
    /// [`SharedSecret::is_contributory`].
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(x25519_dalek::PublicKey::from(bytes))
    }

    /// Returns the raw 32-byte representation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Returns an owned copy of the raw bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

// ---------------------------------------------------------------------------
// X25519StaticSecret
// ---------------------------------------------------------------------------

/// Long-lived X25519 private scalar.
///
/// Zeroized on drop by `x25519-dalek`. Deliberately neither `Clone`
/// nor `Debug`.
pub struct X25519StaticSecret(x25519_dalek::StaticSecret);

impl X25519StaticSecret {
    /// Fixed byte length of a private key.
    pub const LEN: usize = 32;

    /// Generates a fresh secret from OS entropy.
    pub fn generate() -> Self {
        Self(x25519_dalek::StaticSecret::random_from_rng(OsRng))
    }

    /// Creates a secret from raw key material.
    ///
    /// Clamping happens inside the scalar multiplication, so the raw
    /// bytes are stored unchanged and [`to_raw`](Self::to_raw) returns
    /// them verbatim.
    pub fn from_raw(mut bytes: [u8; 32]) -> Self {
        let secret = x25519_dalek::StaticSecret::from(bytes);
        bytes.zeroize();
        Self(secret)
    }

    /// Returns the raw key material in a zeroizing buffer.
    pub fn to_raw(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.0.to_bytes())
    }

    /// Scalar base multiplication: the matching public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey(x25519_dalek::PublicKey::from(&self.0))
    }
}

// ---------------------------------------------------------------------------
// SharedSecret
// ---------------------------------------------------------------------------

/// Raw X25519 shared secret (32 bytes).
///
/// Never used directly as a symmetric key; it is fed through HKDF
/// first. Zeroized on drop.
pub struct SharedSecret {
    bytes: [u8; 32],
    contributory: bool,
}

impl SharedSecret {
    /// Returns the raw 32-byte shared secret.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// `false` when the peer key was a low-order point, in which case
    /// the secret is all zeros and carries no entropy.
    pub fn is_contributory(&self) -> bool {
        self.contributory
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

/// Generates a fresh identity keypair.
pub fn generate_keypair() -> (X25519StaticSecret, X25519PublicKey) {
    let secret = X25519StaticSecret::generate();
    let public = secret.public_key();
    (secret, public)
}

/// Derives the public key for an existing private key.
pub fn derive_public_key(secret: &X25519StaticSecret) -> X25519PublicKey {
    secret.public_key()
}

/// Performs X25519 between `our_secret` and `their_public`.
///
/// Both parties obtain the identical secret when each uses its own
/// private key and the other's public key.
pub fn ecdh_derive_shared(
    our_secret: &X25519StaticSecret,
    their_public: &X25519PublicKey,
) -> SharedSecret {
    let raw = our_secret.0.diffie_hellman(&their_public.0);
    SharedSecret {
        contributory: raw.was_contributory(),
        bytes: raw.to_bytes(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
