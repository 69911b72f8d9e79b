//! The cache encryption key as seen by one accessor.
//!
//! Lifecycle per cache name:
//!
//! ```text
//! Unresolved --find--> Found(id) | NotFound --(encrypt only)--> Created --> Found(id)
//! ```
//!
//! The key is looked up lazily and cached in memory. Encryption repairs a
//! missing or invalid key by creating a new one. Decryption never creates a
//! key: it retries once with a fresh lookup (another process may have rotated
//! the key) and otherwise reports the data as unreadable so the next write
//! overwrites it. No lock is held across secret-store calls; concurrent
//! writers converge because re-adding a key under the same name replaces it.

use crate::error::{KeyringError, KeyringResult};
use crate::store::{KeyId, SecretStore};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokencache_crypto::{AesCbcHmacSha256, Jwe, KEY_SIZE, SymmetricKey};
use tracing::debug;
use zeroize::Zeroizing;

const DECRYPT_ATTEMPTS: usize = 2;

pub struct ManagedKey {
    name: String,
    store: Arc<dyn SecretStore>,
    state: Mutex<KeyState>,
}

#[derive(Default)]
struct KeyState {
    id: Option<KeyId>,
    key: Option<SymmetricKey>,
}

impl ManagedKey {
    pub fn new(name: impl Into<String>, store: Arc<dyn SecretStore>) -> Self {
        Self {
            name: name.into(),
            store,
            state: Mutex::new(KeyState::default()),
        }
    }

    /// The secret-store description of this key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The id of the key currently cached in memory, if any.
    pub fn cached_id(&self) -> Option<KeyId> {
        self.state().id
    }

    /// Forgets the in-memory key and id so the next use looks them up again.
    pub fn clear(&self) {
        *self.state() = KeyState::default();
    }

    /// Encrypts under the stored key, creating one if it's missing or invalid.
    pub fn encrypt(&self, plaintext: &[u8]) -> KeyringResult<Jwe> {
        let (id, key) = match self.get_key() {
            Ok(found) => found,
            Err(e) if e.is_key_unavailable() => {
                debug!(name = %self.name, error = %e, "no usable key; creating one");
                self.clear();
                self.create_key()?
            }
            Err(e) => return Err(e),
        };
        let cipher = AesCbcHmacSha256::from_key(key)?;
        Ok(Jwe::encrypt(plaintext, &id.to_string(), &cipher)?)
    }

    /// Decrypts with the stored key.
    ///
    /// `Ok(None)` means the data can't be read with any key available now:
    /// the key is missing or invalid, or decryption failed twice. Only
    /// facility-level failures are returned as errors.
    pub fn decrypt(&self, jwe: &Jwe) -> KeyringResult<Option<Vec<u8>>> {
        for attempt in 1..=DECRYPT_ATTEMPTS {
            let (_, key) = match self.get_key() {
                Ok(found) => found,
                Err(e) if e.is_key_unavailable() => {
                    debug!(name = %self.name, error = %e, "no key for cached data");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            let cipher = AesCbcHmacSha256::from_key(key)?;
            match jwe.decrypt(&cipher) {
                Ok(plaintext) => return Ok(Some(plaintext)),
                Err(e) => {
                    debug!(name = %self.name, attempt, error = %e, "decryption failed; reloading key");
                    self.clear();
                }
            }
        }
        debug!(name = %self.name, "cached data unreadable; next write overwrites it");
        Ok(None)
    }

    /// Unlinks the key. A key that's already gone is not an error.
    pub fn delete(&self) -> KeyringResult<()> {
        let known = self.state().id;
        self.clear();

        let id = match known.map_or_else(|| self.store.find(&self.name), Ok) {
            Ok(id) => id,
            Err(e) if e.is_key_unavailable() => return Ok(()),
            Err(e) => return Err(e),
        };
        match self.store.delete(id) {
            Ok(()) => {
                debug!(name = %self.name, %id, "deleted cache key");
                Ok(())
            }
            Err(e) if e.is_key_unavailable() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn get_key(&self) -> KeyringResult<(KeyId, SymmetricKey)> {
        let known = {
            let state = self.state();
            if let (Some(id), Some(key)) = (state.id, &state.key) {
                return Ok((id, key.clone()));
            }
            state.id
        };

        let id = match known {
            Some(id) => id,
            None => self.store.find(&self.name)?,
        };
        let payload = self.store.read(id)?;
        let key = key_from_payload(&payload)?;

        let mut state = self.state();
        state.id = Some(id);
        state.key = Some(key.clone());
        Ok((id, key))
    }

    fn create_key(&self) -> KeyringResult<(KeyId, SymmetricKey)> {
        let key = SymmetricKey::generate();
        // NUL terminated, the kernel's convention for user key payloads
        let mut payload = Zeroizing::new(Vec::with_capacity(KEY_SIZE + 1));
        payload.extend_from_slice(key.as_bytes());
        payload.push(0);

        let id = self.store.create(&self.name, &payload)?;
        debug!(name = %self.name, %id, "created cache key");

        let mut state = self.state();
        state.id = Some(id);
        state.key = Some(key.clone());
        Ok((id, key))
    }

    fn state(&self) -> MutexGuard<'_, KeyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn key_from_payload(payload: &[u8]) -> KeyringResult<SymmetricKey> {
    match payload.get(..KEY_SIZE) {
        Some(bytes) => Ok(SymmetricKey::from_slice(bytes)?),
        None => Err(KeyringError::Payload(format!(
            "expected at least {KEY_SIZE} bytes, got {}",
            payload.len()
        ))),
    }
}
