//! HKDF-SHA256 (RFC 5869) for turning X25519 shared secrets into
//! symmetric keys.

use ciphermail_types::{CiphermailError, Result};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Derives exactly `N` bytes of key material.
///
/// An empty `salt` is replaced by the RFC 5869 default (a zero-filled
/// block). The output sits in a zeroizing buffer.
///
/// # Errors
///
/// [`CiphermailError::CryptoError`] if `N` is zero or larger than
/// 255 × 32 bytes.
pub fn hkdf_sha256<const N: usize>(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
) -> Result<Zeroizing<[u8; N]>> {
    if N == 0 {
        return Err(CiphermailError::CryptoError {
            reason: "HKDF output length must be at least 1 byte".into(),
        });
    }

    let salt_opt = (!salt.is_empty()).then_some(salt);
    let hk = Hkdf::<Sha256>::new(salt_opt, ikm);

    let mut okm = Zeroizing::new([0u8; N]);
    hk.expand(info, okm.as_mut())
        .map_err(|e| CiphermailError::CryptoError {
            reason: format!("HKDF-SHA256 expansion failed: {e}"),
        })?;
    Ok(okm)
}
