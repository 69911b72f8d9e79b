//! Raw symmetric key material.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a cache encryption key in bytes.
pub const KEY_SIZE: usize = 32;

/// Half of the key used by each subkey (RFC 7518 §5.2.3).
pub const SUBKEY_SIZE: usize = KEY_SIZE / 2;

/// A 32-byte key for AES_128_CBC_HMAC_SHA_256.
///
/// The first half is the MAC key, the second half the AES key. The bytes are
/// wiped on drop and never printed by `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Wraps exactly [`KEY_SIZE`] bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Copies a key out of a slice, rejecting anything but [`KEY_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Generates a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// `key[0..16]`, keys the HMAC.
    pub fn mac_key(&self) -> &[u8] {
        &self.0[..SUBKEY_SIZE]
    }

    /// `key[16..32]`, keys AES-128.
    pub fn enc_key(&self) -> &[u8] {
        &self.0[SUBKEY_SIZE..]
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}
