//! Encryption layer for the token cache.
//!
//! Provides the at-rest format of a cache file:
//! - AES_128_CBC_HMAC_SHA_256 authenticated encryption built from AES-128
//!   and HMAC-SHA-256 (RFC 7518 §5.2.3)
//! - A JWE compact codec restricted to direct encryption with that suite
//! - A zeroizing 32-byte [`SymmetricKey`]
//!
//! # Format
//!
//! A cache file holds a single line of ASCII:
//!
//! ```text
//! eyJhbGciOiJkaXIiLCJlbmMiOiJBMTI4Q0JDLUhTMjU2Iiwia2lkIjoiNDIifQ..<iv>.<ciphertext>.<tag>
//! ```
//!
//! The key never appears in the file; the `kid` header names the secret-store
//! entry that holds it.

pub mod aead;
mod error;
pub mod jwe;
mod key;

pub use aead::{AesCbcHmacSha256, BLOCK_SIZE, IV_SIZE, SUITE_NAME, Sealed, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use jwe::{ALG_DIRECT, Header, Jwe};
pub use key::{KEY_SIZE, SUBKEY_SIZE, SymmetricKey};
