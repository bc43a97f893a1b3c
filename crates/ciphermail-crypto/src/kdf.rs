//! Argon2id password-based key derivation.
//!
//! Turns a user password and a random salt into the 256-bit key that
//! wraps a locally stored private key. Cost parameters come from
//! [`KdfConfig`] and are recorded next to every wrapped blob so a
//! future default change never orphans old key files.

use ciphermail_types::config::KdfConfig;
use ciphermail_types::{CiphermailError, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum accepted salt length. RFC 9106 recommends 16 bytes.
const MIN_SALT_LEN: usize = 16;

// ---------------------------------------------------------------------------
// DerivedKey
// ---------------------------------------------------------------------------

/// 256-bit key derived by Argon2id. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; 32]);

impl DerivedKey {
    /// Fixed byte length of the derived key.
    pub const LEN: usize = 32;

    /// Returns the raw key material.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derives a 256-bit key from `password` and `salt` using Argon2id
/// (version 0x13).
///
/// # Errors
///
/// - [`CiphermailError::ConfigError`] if the salt is shorter than 16
///   bytes or the cost parameters are rejected by `argon2`.
/// - [`CiphermailError::CryptoError`] if the computation itself fails.
pub fn argon2id_derive_key(
    password: &[u8],
    salt: &[u8],
    params: &KdfConfig,
) -> Result<DerivedKey> {
    if salt.len() < MIN_SALT_LEN {
        return Err(CiphermailError::ConfigError {
            reason: format!(
                "salt must be at least {MIN_SALT_LEN} bytes, got {}",
                salt.len()
            ),
        });
    }

    let argon2_params = argon2::Params::new(
        params.m_cost,
        params.t_cost,
        params.p_cost,
        Some(DerivedKey::LEN),
    )
    .map_err(|e| CiphermailError::ConfigError {
        reason: format!("invalid Argon2 parameters: {e}"),
    })?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    // Written in place; an early return drops and wipes the buffer.
    let mut key = DerivedKey([0u8; DerivedKey::LEN]);
    argon2
        .hash_password_into(password, salt, &mut key.0)
        .map_err(|e| CiphermailError::CryptoError {
            reason: format!("Argon2id derivation failed: {e}"),
        })?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> KdfConfig {
        KdfConfig {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        }
    }

    const SALT: &[u8; 16] = b"0123456789abcdef";

    #[test]
    fn same_inputs_same_key() -> std::result::Result<(), CiphermailError> {
        let a = argon2id_derive_key(b"pw", SALT, &light())?;
        let b = argon2id_derive_key(b"pw", SALT, &light())?;
        assert_eq!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn derived_key_wipes_its_own_buffer() -> std::result::Result<(), CiphermailError> {
        let mut key = argon2id_derive_key(b"pw", SALT, &light())?;
        assert_ne!(key.as_bytes(), &[0u8; DerivedKey::LEN]);
        key.zeroize();
        assert_eq!(key.as_bytes(), &[0u8; DerivedKey::LEN]);
        Ok(())
    }

    #[test]
    fn password_changes_key() -> std::result::Result<(), CiphermailError> {
        let a = argon2id_derive_key(b"pw1", SALT, &light())?;
        let b = argon2id_derive_key(b"pw2", SALT, &light())?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn salt_changes_key() -> std::result::Result<(), CiphermailError> {
        let a = argon2id_derive_key(b"pw", b"salt_aaaaaaa_aaa", &light())?;
        let b = argon2id_derive_key(b"pw", b"salt_bbbbbbb_bbb", &light())?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn cost_parameters_change_key() -> std::result::Result<(), CiphermailError> {
        let heavier = KdfConfig {
            t_cost: 2,
            ..light()
        };
        let a = argon2id_derive_key(b"pw", SALT, &light())?;
        let b = argon2id_derive_key(b"pw", SALT, &heavier)?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn short_salt_rejected() {
        assert!(argon2id_derive_key(b"pw", b"short", &light()).is_err());
    }

    #[test]
    fn zero_time_cost_rejected() {
        let params = KdfConfig {
            t_cost: 0,
            ..light()
        };
        assert!(argon2id_derive_key(b"pw", SALT, &params).is_err());
    }

    #[test]
    fn empty_password_allowed() -> std::result::Result<(), CiphermailError> {
        let key = argon2id_derive_key(b"", SALT, &light())?;
        assert_ne!(key.as_bytes(), &[0u8; 32]);
        Ok(())
    }
}
