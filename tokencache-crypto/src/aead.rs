//! AES_128_CBC_HMAC_SHA_256 authenticated encryption (RFC 7518 §5.2.3).
//!
//! Encrypt-then-MAC over AES-128 in CBC mode with PKCS#7 padding. The tag is
//! the first 16 bytes of `HMAC-SHA-256(mac_key, AAD || IV || C || AL)` where
//! `AL` is the bit length of the AAD as a big-endian u64.
//!
//! Decryption verifies the tag in constant time before the ciphertext is
//! decrypted or the padding inspected, and every failure after that point
//! collapses into the same [`CryptoError::Decryption`].

use crate::error::{CryptoError, CryptoResult};
use crate::key::{KEY_SIZE, SymmetricKey};
use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

type HmacSha256 = Hmac<Sha256>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// CBC initialization vector size in bytes.
pub const IV_SIZE: usize = 16;

/// Truncated HMAC tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// JWE `enc` identifier for this suite.
pub const SUITE_NAME: &str = "A128CBC-HS256";

/// Output of [`AesCbcHmacSha256::encrypt`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_SIZE],
}

/// The AES_128_CBC_HMAC_SHA_256 cipher bound to one key.
///
/// Both the key and the expanded AES key schedule are wiped on drop.
pub struct AesCbcHmacSha256 {
    key: SymmetricKey,
    block: Aes128,
}

impl ZeroizeOnDrop for AesCbcHmacSha256 {}

impl AesCbcHmacSha256 {
    /// Builds the cipher from 32 raw key bytes.
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        Self::from_key(SymmetricKey::from_slice(key)?)
    }

    pub fn from_key(key: SymmetricKey) -> CryptoResult<Self> {
        let block = Aes128::new_from_slice(key.enc_key()).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: key.as_bytes().len(),
            }
        })?;
        Ok(Self { key, block })
    }

    /// The JWE `enc` value this cipher implements.
    pub fn suite_name(&self) -> &'static str {
        SUITE_NAME
    }

    /// Pads, encrypts and authenticates `plaintext`.
    pub fn encrypt(&self, iv: &[u8; IV_SIZE], plaintext: &[u8], aad: &[u8]) -> CryptoResult<Sealed> {
        let mut ciphertext = pkcs7_pad(plaintext);
        self.cbc_encrypt(iv, &mut ciphertext);

        let mac = self.mac(aad, iv, &ciphertext)?;
        let full = mac.finalize().into_bytes();
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&full[..TAG_SIZE]);

        Ok(Sealed { ciphertext, tag })
    }

    /// Authenticates and decrypts. Any failure is [`CryptoError::Decryption`].
    pub fn decrypt(&self, iv: &[u8], ciphertext: &[u8], aad: &[u8], tag: &[u8]) -> CryptoResult<Vec<u8>> {
        // verify_truncated_left accepts any prefix length, so pin it first
        if tag.len() != TAG_SIZE || iv.len() != IV_SIZE {
            return Err(CryptoError::Decryption);
        }
        self.mac(aad, iv, ciphertext)?
            .verify_truncated_left(tag)
            .map_err(|_| CryptoError::Decryption)?;

        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::Decryption);
        }

        let mut buf = ciphertext.to_vec();
        self.cbc_decrypt(iv, &mut buf);
        let len = pkcs7_unpadded_len(&buf)?;
        buf.truncate(len);
        Ok(buf)
    }

    fn mac(&self, aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> CryptoResult<HmacSha256> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.key.mac_key()).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: self.key.as_bytes().len(),
            }
        })?;
        let aad_bits = (aad.len() as u64).wrapping_mul(8);
        mac.update(aad);
        mac.update(iv);
        mac.update(ciphertext);
        mac.update(&aad_bits.to_be_bytes());
        Ok(mac)
    }

    fn cbc_encrypt(&self, iv: &[u8; IV_SIZE], buf: &mut [u8]) {
        let mut prev = *iv;
        for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
            xor_in_place(chunk, &prev);
            self.block.encrypt_block(GenericArray::from_mut_slice(chunk));
            prev.copy_from_slice(chunk);
        }
    }

    fn cbc_decrypt(&self, iv: &[u8], buf: &mut [u8]) {
        let mut prev = [0u8; BLOCK_SIZE];
        prev.copy_from_slice(iv);
        for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
            let mut saved = [0u8; BLOCK_SIZE];
            saved.copy_from_slice(chunk);
            self.block.decrypt_block(GenericArray::from_mut_slice(chunk));
            xor_in_place(chunk, &prev);
            prev = saved;
        }
    }
}

fn xor_in_place(block: &mut [u8], other: &[u8; BLOCK_SIZE]) {
    for (b, o) in block.iter_mut().zip(other) {
        *b ^= o;
    }
}

/// Always appends 1..=16 bytes, so aligned input gains a whole block.
fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let n = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut out = Vec::with_capacity(data.len() + n);
    out.extend_from_slice(data);
    out.resize(data.len() + n, n as u8);
    out
}

fn pkcs7_unpadded_len(data: &[u8]) -> CryptoResult<usize> {
    let Some(&last) = data.last() else {
        return Err(CryptoError::Decryption);
    };
    let n = last as usize;
    if n == 0 || n > BLOCK_SIZE || data.len() % BLOCK_SIZE != 0 || n > data.len() {
        return Err(CryptoError::Decryption);
    }
    if data[data.len() - n..].iter().any(|&b| b != last) {
        return Err(CryptoError::Decryption);
    }
    Ok(data.len() - n)
}
