//! Known-vector tests for cryptographic primitives.
//!
//! Test vectors sourced from:
//! - X25519:   RFC 7748 §6.1
//! - SHA3-256: NIST FIPS 202 examples
//! - HKDF:     RFC 5869 Test Case 3 (empty salt and info)
//! - AEAD:     Deterministic roundtrip (XChaCha20-Poly1305)
//! - Argon2:   Deterministic output stability

use ciphermail_crypto::aead::{open, seal, AeadNonce, TAG_LEN};
use ciphermail_crypto::ecdh::{
    derive_public_key, ecdh_derive_shared, X25519PublicKey, X25519StaticSecret,
};
use ciphermail_crypto::hash::sha3_256;
use ciphermail_crypto::hkdf::hkdf_sha256;
use ciphermail_crypto::kdf::argon2id_derive_key;
use ciphermail_types::config::KdfConfig;
use ciphermail_types::CiphermailError;

fn hex32(s: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hex::decode(s).unwrap_or_default());
    out
}

// ===================================================================
// X25519: RFC 7748 §6.1
// ===================================================================

const ALICE_PRIVATE: &str = "77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a";
const ALICE_PUBLIC: &str = "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a";
const BOB_PRIVATE: &str = "5dab087e624a8a4b79e17f8b83800ee66f3bb1292618b6fd1c2f8b27ff88e0eb";
const BOB_PUBLIC: &str = "de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f";
const SHARED: &str = "4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742";

#[test]
fn x25519_rfc7748_public_keys() {
    let alice = X25519StaticSecret::from_raw(hex32(ALICE_PRIVATE));
    let bob = X25519StaticSecret::from_raw(hex32(BOB_PRIVATE));

    assert_eq!(derive_public_key(&alice).as_bytes(), &hex32(ALICE_PUBLIC));
    assert_eq!(derive_public_key(&bob).as_bytes(), &hex32(BOB_PUBLIC));
}

#[test]
fn x25519_rfc7748_shared_secret() {
    let alice = X25519StaticSecret::from_raw(hex32(ALICE_PRIVATE));
    let bob = X25519StaticSecret::from_raw(hex32(BOB_PRIVATE));
    let alice_pub = X25519PublicKey::from_bytes(hex32(ALICE_PUBLIC));
    let bob_pub = X25519PublicKey::from_bytes(hex32(BOB_PUBLIC));

    let ab = ecdh_derive_shared(&alice, &bob_pub);
    let ba = ecdh_derive_shared(&bob, &alice_pub);
    assert_eq!(ab.as_bytes(), &hex32(SHARED));
    assert_eq!(ba.as_bytes(), &hex32(SHARED));
    assert!(ab.is_contributory());
}

#[test]
fn x25519_raw_bytes_survive_roundtrip() {
    let alice = X25519StaticSecret::from_raw(hex32(ALICE_PRIVATE));
    assert_eq!(*alice.to_raw(), hex32(ALICE_PRIVATE));
}

// ===================================================================
// SHA3-256: NIST FIPS 202
// ===================================================================

#[test]
fn sha3_256_nist_vectors() {
    assert_eq!(
        sha3_256(b""),
        hex32("a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a")
    );
    assert_eq!(
        sha3_256(b"abc"),
        hex32("3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532")
    );
}

// ===================================================================
// HKDF-SHA256: RFC 5869 Test Case 3
// ===================================================================

#[test]
fn hkdf_rfc5869_empty_salt_and_info() -> std::result::Result<(), CiphermailError> {
    let ikm = [0x0bu8; 22];
    let okm = hkdf_sha256::<42>(&ikm, b"", b"")?;
    assert_eq!(
        hex::encode(*okm),
        "8da4e775a563c18f715f802a063c5a31b8a11f5c5ee1879ec3454e5f3c738d2d9d201395faa4b61a96c8"
    );
    Ok(())
}

// ===================================================================
// XChaCha20-Poly1305
// ===================================================================

#[test]
fn aead_fixed_nonce_roundtrip() -> std::result::Result<(), CiphermailError> {
    let key = [0x42u8; 32];
    let nonce = AeadNonce::from_bytes([0x01; 24]);
    let plaintext = "päivää 👋".as_bytes();

    let sealed = seal(&key, &nonce, plaintext, b"header")?;
    assert_eq!(sealed.len(), plaintext.len() + TAG_LEN);
    assert_eq!(
        open(&key, &nonce, &sealed, b"header").as_deref(),
        Some(plaintext)
    );
    Ok(())
}

#[test]
fn aead_every_bit_flip_rejected() -> std::result::Result<(), CiphermailError> {
    let key = [0xEE; 32];
    let nonce = AeadNonce::random()?;
    let sealed = seal(&key, &nonce, b"payload", b"")?;

    for i in 0..sealed.len() {
        let mut bad = sealed.clone();
        bad[i] ^= 0x80;
        assert!(open(&key, &nonce, &bad, b"").is_none(), "flip at byte {i}");
    }
    Ok(())
}

// ===================================================================
// Argon2id: determinism
// ===================================================================

#[test]
fn argon2id_output_is_stable() -> std::result::Result<(), CiphermailError> {
    let params = KdfConfig {
        m_cost: 256,
        t_cost: 1,
        p_cost: 1,
    };
    let salt = b"0123456789abcdef";

    let k1 = argon2id_derive_key(b"test_password", salt, &params)?;
    let k2 = argon2id_derive_key(b"test_password", salt, &params)?;
    assert_eq!(k1.as_bytes(), k2.as_bytes());
    assert_ne!(k1.as_bytes(), &[0u8; 32]);
    Ok(())
}
