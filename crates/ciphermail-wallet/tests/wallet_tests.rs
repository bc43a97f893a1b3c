//! Integration tests for ciphermail-wallet.
//!
//! Argon2id runs with light parameters (256 KiB, t=1) so the suite
//! stays fast. Salts and nonces still come from the OS RNG.

use ciphermail_crypto::ecdh::X25519StaticSecret;
use ciphermail_protocol::e2e::encrypt;
use ciphermail_types::config::KdfConfig;
use ciphermail_types::CiphermailError;

use ciphermail_wallet::key_file::{read_key_file, KEY_FILE_VERSION};
use ciphermail_wallet::key_wrap::{unwrap, unwrap_bytes, wrap, WRAPPED_KEY_LEN};
use ciphermail_wallet::wallet::IdentityWallet;

// ---------------------------------------------------------------------------
// Test constants
// ---------------------------------------------------------------------------

const PASSWORD: &str = "correct horse battery staple";
const WRONG_PASSWORD: &str = "wrong password entirely";

fn light() -> KdfConfig {
    KdfConfig {
        m_cost: 256,
        t_cost: 1,
        p_cost: 1,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// RAII guard that removes a temporary file on drop.
struct TempFile(std::path::PathBuf);

impl TempFile {
    fn new(name: &str) -> Self {
        Self(std::env::temp_dir().join(format!(
            "ciphermail_test_{name}_{}.json",
            std::process::id()
        )))
    }

    fn path(&self) -> &std::path::Path {
        &self.0
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

// ---------------------------------------------------------------------------
// 1. Wrap / unwrap
// ---------------------------------------------------------------------------

#[test]
fn unwrap_with_same_password_returns_key() -> std::result::Result<(), CiphermailError> {
    let secret = X25519StaticSecret::from_raw([0x5A; 32]);
    let wrapped = wrap(&secret, PASSWORD, &light())?;
    let restored = unwrap(&wrapped, PASSWORD, &light())?;
    assert_eq!(restored.map(|s| *s.to_raw()), Some([0x5A; 32]));
    Ok(())
}

#[test]
fn unwrap_with_other_password_returns_none() -> std::result::Result<(), CiphermailError> {
    let secret = X25519StaticSecret::from_raw([0x5A; 32]);
    let wrapped = wrap(&secret, "pw1", &light())?;
    assert!(unwrap(&wrapped, "pw2", &light())?.is_none());
    Ok(())
}

#[test]
fn every_corrupted_byte_returns_none() -> std::result::Result<(), CiphermailError> {
    let secret = X25519StaticSecret::from_raw([0x5A; 32]);
    let blob = wrap(&secret, PASSWORD, &light())?.to_bytes();
    assert_eq!(blob.len(), WRAPPED_KEY_LEN);

    for i in (0..blob.len()).step_by(13) {
        let mut bad = blob.clone();
        bad[i] ^= 0x01;
        assert!(unwrap_bytes(&bad, PASSWORD, &light())?.is_none(), "byte {i}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 2. Create → Save → Load → Unlock
// ---------------------------------------------------------------------------

#[test]
fn save_load_unlock_cycle() -> std::result::Result<(), CiphermailError> {
    let file = TempFile::new("cycle");
    let wallet = IdentityWallet::create(PASSWORD, light())?;
    wallet.save(file.path())?;

    let on_disk = read_key_file(file.path())?;
    assert_eq!(on_disk.version, KEY_FILE_VERSION);
    assert_eq!(on_disk.kdf, light());
    assert_eq!(on_disk.public_key, wallet.public_key().to_string());

    let mut loaded = IdentityWallet::load(file.path())?;
    assert!(!loaded.is_unlocked());
    loaded.unlock(PASSWORD)?;
    assert_eq!(
        loaded.secret()?.public_key().as_bytes(),
        wallet.public_key().as_bytes()
    );
    Ok(())
}

#[test]
fn loaded_wallet_rejects_wrong_password() -> std::result::Result<(), CiphermailError> {
    let file = TempFile::new("wrongpw");
    IdentityWallet::create(PASSWORD, light())?.save(file.path())?;

    let mut loaded = IdentityWallet::load(file.path())?;
    let err = loaded.unlock(WRONG_PASSWORD);
    assert!(matches!(err, Err(CiphermailError::CryptoError { .. })));
    assert!(!loaded.is_unlocked());
    Ok(())
}

#[test]
fn swapped_public_key_detected_on_unlock() -> std::result::Result<(), CiphermailError> {
    let file = TempFile::new("swapped");
    let wallet = IdentityWallet::create(PASSWORD, light())?;
    let mut key_file = wallet.to_key_file();
    key_file.public_key = hex::encode([0x77; 32]);

    ciphermail_wallet::key_file::write_key_file(file.path(), &key_file)?;
    let mut loaded = IdentityWallet::load(file.path())?;
    assert!(loaded.unlock(PASSWORD).is_err());
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Rotation
// ---------------------------------------------------------------------------

#[test]
fn rotated_wallet_reads_old_and_new_messages() -> std::result::Result<(), CiphermailError> {
    let sender = X25519StaticSecret::from_raw([0xAA; 32]);
    let mut wallet = IdentityWallet::create(PASSWORD, light())?;
    wallet.unlock(PASSWORD)?;

    let old_pub = wallet.secret()?.public_key();
    let old_msg = encrypt(b"before rotation", &sender, &old_pub)?;

    wallet.rotate(PASSWORD)?;
    let new_pub = wallet.secret()?.public_key();
    assert_ne!(old_pub, new_pub);
    let new_msg = encrypt(b"after rotation", &sender, &new_pub)?;

    assert_eq!(
        wallet.decrypt_any(&old_msg)?.as_deref(),
        Some(b"before rotation".as_slice())
    );
    assert_eq!(
        wallet.decrypt_any(&new_msg)?.as_deref(),
        Some(b"after rotation".as_slice())
    );
    Ok(())
}

#[test]
fn retired_keys_survive_persistence() -> std::result::Result<(), CiphermailError> {
    let file = TempFile::new("retired");
    let sender = X25519StaticSecret::from_raw([0xAA; 32]);

    let mut wallet = IdentityWallet::create(PASSWORD, light())?;
    wallet.unlock(PASSWORD)?;
    let old_msg = encrypt(b"archived", &sender, &wallet.secret()?.public_key())?;
    wallet.rotate(PASSWORD)?;
    wallet.rotate(PASSWORD)?;
    wallet.save(file.path())?;

    let mut loaded = IdentityWallet::load(file.path())?;
    assert_eq!(loaded.retired_public_keys().len(), 2);
    loaded.unlock(PASSWORD)?;
    assert_eq!(
        loaded.decrypt_any(&old_msg)?.as_deref(),
        Some(b"archived".as_slice())
    );
    Ok(())
}

#[test]
fn foreign_message_is_none() -> std::result::Result<(), CiphermailError> {
    let sender = X25519StaticSecret::from_raw([0xAA; 32]);
    let stranger = X25519StaticSecret::from_raw([0xDD; 32]).public_key();

    let mut wallet = IdentityWallet::create(PASSWORD, light())?;
    wallet.unlock(PASSWORD)?;
    let msg = encrypt(b"not for you", &sender, &stranger)?;
    assert!(wallet.decrypt_any(&msg)?.is_none());
    Ok(())
}

#[test]
fn decrypt_any_requires_unlock() -> std::result::Result<(), CiphermailError> {
    let sender = X25519StaticSecret::from_raw([0xAA; 32]);
    let wallet = IdentityWallet::create(PASSWORD, light())?;
    let pk = ciphermail_crypto::ecdh::X25519PublicKey::from_bytes(*wallet.public_key().as_bytes());
    let msg = encrypt(b"x", &sender, &pk)?;
    assert!(wallet.decrypt_any(&msg).is_err());
    Ok(())
}
