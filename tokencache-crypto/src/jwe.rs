//! Minimal JSON Web Encryption.
//!
//! Only direct key agreement (`"alg":"dir"`) with A128CBC-HS256 content
//! encryption in compact serialization:
//!
//! ```text
//! BASE64URL(header) . "" . BASE64URL(iv) . BASE64URL(ciphertext) . BASE64URL(tag)
//! ```
//!
//! The encrypted-key segment is always empty because the content key is the
//! key held in the secret store.

use crate::aead::{AesCbcHmacSha256, IV_SIZE};
use crate::error::{CryptoError, CryptoResult};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// The only supported key management algorithm.
pub const ALG_DIRECT: &str = "dir";

const SEGMENTS: usize = 5;

/// JOSE header. Field order is the serialized order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub alg: String,
    pub enc: String,
    #[serde(default)]
    pub kid: String,
}

/// A parsed or freshly encrypted JWE.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Jwe {
    pub header: Header,
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub tag: Vec<u8>,
}

impl Jwe {
    /// Encrypts `plaintext` under a random IV with empty AAD.
    pub fn encrypt(plaintext: &[u8], kid: &str, cipher: &AesCbcHmacSha256) -> CryptoResult<Self> {
        let mut iv = [0u8; IV_SIZE];
        rand::rng().fill_bytes(&mut iv);

        let sealed = cipher.encrypt(&iv, plaintext, &[])?;
        Ok(Self {
            header: Header {
                alg: ALG_DIRECT.to_string(),
                enc: cipher.suite_name().to_string(),
                kid: kid.to_string(),
            },
            iv: iv.to_vec(),
            ciphertext: sealed.ciphertext,
            tag: sealed.tag.to_vec(),
        })
    }

    /// Compact serialization.
    pub fn serialize(&self) -> CryptoResult<String> {
        let header = serde_json::to_vec(&self.header)
            .map_err(|e| CryptoError::Format(format!("header encoding failed: {e}")))?;
        Ok(format!(
            "{}..{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(&self.iv),
            URL_SAFE_NO_PAD.encode(&self.ciphertext),
            URL_SAFE_NO_PAD.encode(&self.tag),
        ))
    }

    /// Parses a compact serialization. Never panics on hostile input.
    pub fn parse(data: &[u8]) -> CryptoResult<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| CryptoError::Format("not valid UTF-8".into()))?;

        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() != SEGMENTS {
            return Err(CryptoError::Format(format!(
                "expected {SEGMENTS} segments, got {}",
                parts.len()
            )));
        }
        if !parts[1].is_empty() {
            return Err(CryptoError::Format(
                "direct encryption carries no encrypted key".into(),
            ));
        }

        let header_json = decode_segment("header", parts[0])?;
        let header: Header = serde_json::from_slice(&header_json)
            .map_err(|e| CryptoError::Format(format!("invalid header: {e}")))?;

        Ok(Self {
            header,
            iv: decode_segment("iv", parts[2])?,
            ciphertext: decode_segment("ciphertext", parts[3])?,
            tag: decode_segment("tag", parts[4])?,
        })
    }

    /// Checks the header against `cipher`, then authenticates and decrypts.
    pub fn decrypt(&self, cipher: &AesCbcHmacSha256) -> CryptoResult<Vec<u8>> {
        if self.header.alg != ALG_DIRECT {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "alg {:?}",
                self.header.alg
            )));
        }
        if self.header.enc != cipher.suite_name() {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "enc {:?}",
                self.header.enc
            )));
        }
        cipher.decrypt(&self.iv, &self.ciphertext, &[], &self.tag)
    }
}

fn decode_segment(name: &str, segment: &str) -> CryptoResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CryptoError::Format(format!("{name}: {e}")))
}
