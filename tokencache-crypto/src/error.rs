//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors produced by the AEAD primitive and the JWE codec.
///
/// A tag mismatch and a padding failure both surface as [`CryptoError::Decryption`]
/// with the same message, so callers can't tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("malformed JWE: {0}")]
    Format(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("decryption failed")]
    Decryption,
}
