//! Token cache error types.

use thiserror::Error;
use tokencache_crypto::CryptoError;
use tokencache_keyring::KeyringError;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur in cache operations.
///
/// Payloads are strings so one outcome can be handed to every caller that
/// waited on the same construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache I/O failed: {0}")]
    Io(String),

    #[error("couldn't resolve cache path: {0}")]
    Path(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    FacilityUnavailable(String),

    #[error("secret store error: {0}")]
    Keyring(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("malformed cache file: {0}")]
    Format(String),

    #[error("token cache serialization failed: {0}")]
    Marshal(String),
}

impl CacheError {
    /// The error returned when the secret store is unusable and plaintext
    /// storage wasn't requested.
    pub fn facility_unavailable(cause: impl std::fmt::Display) -> Self {
        Self::FacilityUnavailable(format!(
            "persistent token caching requires an OS secret store, which isn't usable here ({cause}). \
             Set allow_unencrypted_storage in CacheOptions to store the cache in plaintext instead"
        ))
    }
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<KeyringError> for CacheError {
    fn from(e: KeyringError) -> Self {
        match e {
            KeyringError::Unavailable(_) => Self::facility_unavailable(e),
            other => Self::Keyring(other.to_string()),
        }
    }
}

impl From<CryptoError> for CacheError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Format(msg) => Self::Format(msg),
            other => Self::Crypto(other.to_string()),
        }
    }
}
