//! Command handlers, one module per command group.

pub mod demo;
pub mod keys;
pub mod message;

/// Resolves the key-file password from the flag or the
/// `CIPHERMAIL_PASSWORD` environment variable (clap fills both into
/// the same field).
pub fn require_password(password: Option<String>) -> std::result::Result<String, String> {
    match password {
        Some(p) if !p.is_empty() => Ok(p),
        _ => Err("a password is required (--password or CIPHERMAIL_PASSWORD)".into()),
    }
}
