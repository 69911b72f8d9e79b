//! macOS Keychain / Windows Credential Manager adapter via the `keyring` crate.
//!
//! Entries are keyed by (service, cache name). The native APIs have no key
//! serial numbers, so this adapter hands out its own stable ids per name.

use crate::error::{KeyringError, KeyringResult};
use crate::store::{KeyId, SecretStore};
use std::sync::{Mutex, PoisonError};
use zeroize::Zeroizing;

/// Service name under which cache keys are stored.
pub const DEFAULT_SERVICE: &str = "tokencache";

pub struct NativeStore {
    service: String,
    names: Mutex<Vec<String>>,
}

impl NativeStore {
    pub fn new() -> Self {
        Self::with_service(DEFAULT_SERVICE)
    }

    /// Creates a store under a custom service name (test isolation).
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
            names: Mutex::new(Vec::new()),
        }
    }

    fn entry(&self, name: &str) -> KeyringResult<keyring::Entry> {
        keyring::Entry::new(&self.service, name)
            .map_err(|e| KeyringError::Unavailable(format!("failed to open entry {name}: {e}")))
    }

    fn id_for(&self, name: &str) -> KeyId {
        let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        let idx = match names.iter().position(|n| n == name) {
            Some(idx) => idx,
            None => {
                names.push(name.to_string());
                names.len() - 1
            }
        };
        KeyId(idx as i64 + 1)
    }

    fn name_of(&self, id: KeyId) -> KeyringResult<String> {
        let names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        usize::try_from(id.0 - 1)
            .ok()
            .and_then(|idx| names.get(idx).cloned())
            .ok_or_else(|| KeyringError::KeyNotFound(id.to_string()))
    }
}

impl Default for NativeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for NativeStore {
    fn create(&self, name: &str, payload: &[u8]) -> KeyringResult<KeyId> {
        self.entry(name)?
            .set_secret(payload)
            .map_err(|e| classify(name, e))?;
        Ok(self.id_for(name))
    }

    fn find(&self, name: &str) -> KeyringResult<KeyId> {
        let _secret = Zeroizing::new(self.entry(name)?.get_secret().map_err(|e| classify(name, e))?);
        Ok(self.id_for(name))
    }

    fn read(&self, id: KeyId) -> KeyringResult<Zeroizing<Vec<u8>>> {
        let name = self.name_of(id)?;
        let secret = self.entry(&name)?.get_secret().map_err(|e| classify(&name, e))?;
        Ok(Zeroizing::new(secret))
    }

    fn delete(&self, id: KeyId) -> KeyringResult<()> {
        let name = self.name_of(id)?;
        self.entry(&name)?
            .delete_credential()
            .map_err(|e| classify(&name, e))
    }
}

fn classify(name: &str, err: keyring::Error) -> KeyringError {
    match err {
        keyring::Error::NoEntry => KeyringError::KeyNotFound(name.to_string()),
        keyring::Error::BadEncoding(_) | keyring::Error::Ambiguous(_) => {
            KeyringError::KeyInvalid(format!("{name}: {err}"))
        }
        other => KeyringError::Unavailable(format!("{name}: {other}")),
    }
}
