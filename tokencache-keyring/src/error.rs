//! Secret-store error types.

use thiserror::Error;
use tokencache_crypto::CryptoError;

/// Result type for secret-store operations.
pub type KeyringResult<T> = Result<T, KeyringError>;

/// Errors that can occur while talking to an OS secret facility.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// No key with this description exists (`ENOKEY`, missing entry).
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key exists but can't be used (expired, revoked, rejected).
    #[error("key invalid: {0}")]
    KeyInvalid(String),

    /// The facility itself is unusable in this session.
    #[error("secret store unavailable: {0}")]
    Unavailable(String),

    #[error("{op} failed: {source}")]
    Os {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("stored key payload has wrong length: {0}")]
    Payload(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl KeyringError {
    /// True for the "invalid or not found" class that a fresh key repairs.
    pub fn is_key_unavailable(&self) -> bool {
        matches!(self, Self::KeyNotFound(_) | Self::KeyInvalid(_))
    }

    /// True only when the key doesn't exist at all.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }
}
