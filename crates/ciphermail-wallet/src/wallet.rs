//! Identity wallet: lock/unlock lifecycle and key rotation.
//!
//! At rest an [`IdentityWallet`] holds only wrapped keys. On
//! [`unlock`](IdentityWallet::unlock) every key is unwrapped and the
//! current one is checked against its recorded public key. Locking
//! drops the secrets, which zeroizes them.
//!
//! Rotation never discards an old key: it moves to the `retired`
//! list so messages encrypted to it stay readable through
//! [`decrypt_any`](IdentityWallet::decrypt_any).

use std::path::Path;

use ciphermail_crypto::ecdh::{generate_keypair, X25519StaticSecret};
use ciphermail_protocol::e2e::decrypt;
use ciphermail_protocol::envelope::EncryptedMessage;
use ciphermail_types::config::KdfConfig;
use ciphermail_types::{CiphermailError, PublicKeyBytes, Result};

use crate::key_file::{read_key_file, write_key_file, KeyFile, StoredKey, KEY_FILE_VERSION};
use crate::key_wrap::{unwrap, wrap, WrappedKey};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct WrappedEntry {
    public_key: PublicKeyBytes,
    wrapped: WrappedKey,
}

struct UnlockedKeys {
    current: X25519StaticSecret,
    /// Same order as `IdentityWallet::retired`.
    retired: Vec<X25519StaticSecret>,
}

enum WalletState {
    Locked,
    Unlocked(UnlockedKeys),
}

// ---------------------------------------------------------------------------
// IdentityWallet
// ---------------------------------------------------------------------------

/// Password-protected X25519 identity with rotation history.
pub struct IdentityWallet {
    current: WrappedEntry,
    retired: Vec<WrappedEntry>,
    kdf: KdfConfig,
    state: WalletState,
}

impl IdentityWallet {
    /// Generates a fresh identity key and wraps it under `password`.
    ///
    /// The wallet is returned **locked**.
    ///
    /// # Errors
    ///
    /// Propagates wrapping errors (bad KDF parameters, RNG failure).
    pub fn create(password: &str, kdf: KdfConfig) -> Result<Self> {
        let (secret, public) = generate_keypair();
        let wrapped = wrap(&secret, password, &kdf)?;
        tracing::info!(public_key = %hex_prefix(public.as_bytes()), "identity key created");

        Ok(Self {
            current: WrappedEntry {
                public_key: PublicKeyBytes::new(public.to_bytes()),
                wrapped,
            },
            retired: Vec::new(),
            kdf,
            state: WalletState::Locked,
        })
    }

    /// Rebuilds a locked wallet from a parsed key file.
    ///
    /// # Errors
    ///
    /// [`CiphermailError::MalformedInput`] if any stored key is badly
    /// encoded.
    pub fn from_key_file(file: &KeyFile) -> Result<Self> {
        let decode = |stored: &StoredKey| -> Result<WrappedEntry> {
            Ok(WrappedEntry {
                public_key: stored.public_key()?,
                wrapped: stored.wrapped_key()?,
            })
        };

        Ok(Self {
            current: decode(&file.current())?,
            retired: file.retired.iter().map(decode).collect::<Result<Vec<_>>>()?,
            kdf: file.kdf,
            state: WalletState::Locked,
        })
    }

    /// Produces the on-disk representation.
    pub fn to_key_file(&self) -> KeyFile {
        KeyFile {
            version: KEY_FILE_VERSION,
            public_key: self.current.public_key.to_string(),
            wrapped_key: hex::encode(self.current.wrapped.to_bytes()),
            kdf: self.kdf,
            retired: self
                .retired
                .iter()
                .map(|e| StoredKey::new(&e.public_key, &e.wrapped))
                .collect(),
        }
    }

    /// Reads a key file and returns a locked wallet.
    ///
    /// # Errors
    ///
    /// See [`read_key_file`] and [`from_key_file`](Self::from_key_file).
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_key_file(&read_key_file(path)?)
    }

    /// Writes the wallet's key file atomically.
    ///
    /// # Errors
    ///
    /// See [`write_key_file`].
    pub fn save(&self, path: &Path) -> Result<()> {
        write_key_file(path, &self.to_key_file())
    }

    // -- Accessors --------------------------------------------------------

    /// Current public key. Available while locked.
    pub fn public_key(&self) -> PublicKeyBytes {
        self.current.public_key
    }

    /// Public keys retired by rotation, oldest first.
    pub fn retired_public_keys(&self) -> Vec<PublicKeyBytes> {
        self.retired.iter().map(|e| e.public_key).collect()
    }

    /// KDF parameters every blob in this wallet was wrapped with.
    pub fn kdf(&self) -> &KdfConfig {
        &self.kdf
    }

    /// `true` while secrets are held in memory.
    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, WalletState::Unlocked(_))
    }

    /// The current identity secret.
    ///
    /// # Errors
    ///
    /// [`CiphermailError::CryptoError`] if the wallet is locked.
    pub fn secret(&self) -> Result<&X25519StaticSecret> {
        Ok(&self.unlocked()?.current)
    }

    // -- Lifecycle --------------------------------------------------------

    /// Unwraps every stored key with `password`.
    ///
    /// No-op if already unlocked.
    ///
    /// # Errors
    ///
    /// [`CiphermailError::CryptoError`] if the password is wrong, a
    /// blob is corrupted, or the current key does not match its
    /// recorded public key. The wallet stays locked on every error.
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        if self.is_unlocked() {
            return Ok(());
        }

        let current = self.unwrap_entry(&self.current, password)?;
        let retired = self
            .retired
            .iter()
            .map(|entry| self.unwrap_entry(entry, password))
            .collect::<Result<Vec<_>>>()?;

        self.state = WalletState::Unlocked(UnlockedKeys { current, retired });
        tracing::debug!(retired = self.retired.len(), "wallet unlocked");
        Ok(())
    }

    /// Drops all in-memory secrets. No-op if already locked.
    pub fn lock(&mut self) {
        self.state = WalletState::Locked;
    }

    /// Replaces the current key with a freshly generated one wrapped
    /// under the same `password`, retiring the old key.
    ///
    /// Returns the new public key, which the caller should publish
    /// with `UpdatePubkey`.
    ///
    /// # Errors
    ///
    /// - [`CiphermailError::CryptoError`] if the wallet is locked or
    ///   `password` does not open the current key.
    /// - Wrapping errors for the new key.
    pub fn rotate(&mut self, password: &str) -> Result<PublicKeyBytes> {
        self.unlocked()?;
        // The new key must be wrapped under the password that opens the current one.
        self.unwrap_entry(&self.current, password)?;

        let (new_secret, new_public) = generate_keypair();
        let new_entry = WrappedEntry {
            public_key: PublicKeyBytes::new(new_public.to_bytes()),
            wrapped: wrap(&new_secret, password, &self.kdf)?,
        };

        let WalletState::Unlocked(keys) = &mut self.state else {
            return Err(locked_error());
        };
        let old_secret = std::mem::replace(&mut keys.current, new_secret);
        keys.retired.push(old_secret);

        let old_entry = std::mem::replace(&mut self.current, new_entry);
        tracing::info!(
            old = %hex_prefix(old_entry.public_key.as_bytes()),
            new = %hex_prefix(new_public.as_bytes()),
            "identity key rotated"
        );
        self.retired.push(old_entry);

        Ok(self.current.public_key)
    }

    /// Decrypts `msg` with the current key, then with retired keys
    /// from newest to oldest.
    ///
    /// Returns `Ok(None)` if no key opens the message.
    ///
    /// # Errors
    ///
    /// [`CiphermailError::CryptoError`] if the wallet is locked.
    pub fn decrypt_any(&self, msg: &EncryptedMessage) -> Result<Option<Vec<u8>>> {
        let keys = self.unlocked()?;
        Ok(std::iter::once(&keys.current)
            .chain(keys.retired.iter().rev())
            .find_map(|secret| decrypt(msg, secret)))
    }

    // -- Internals --------------------------------------------------------

    fn unlocked(&self) -> Result<&UnlockedKeys> {
        match &self.state {
            WalletState::Unlocked(keys) => Ok(keys),
            WalletState::Locked => Err(locked_error()),
        }
    }

    fn unwrap_entry(&self, entry: &WrappedEntry, password: &str) -> Result<X25519StaticSecret> {
        let secret = unwrap(&entry.wrapped, password, &self.kdf)?.ok_or_else(|| {
            CiphermailError::CryptoError {
                reason: "wrong password or corrupted key file".into(),
            }
        })?;

        if secret.public_key().as_bytes() != entry.public_key.as_bytes() {
            return Err(CiphermailError::CryptoError {
                reason: "unwrapped key does not match recorded public key".into(),
            });
        }
        Ok(secret)
    }
}

fn locked_error() -> CiphermailError {
    CiphermailError::CryptoError {
        reason: "wallet is locked; call unlock() first".into(),
    }
}

fn hex_prefix(bytes: &[u8; 32]) -> String {
    hex::encode(&bytes[..8])
}
