//! In-process secret store.
//!
//! Mirrors kernel keyring semantics closely enough to exercise the retry and
//! self-heal paths: re-adding a name updates the live key in place, revoked
//! keys report [`KeyringError::KeyInvalid`], and clones share one keyring the
//! way separate processes share the user's kernel keyring.

use crate::error::{KeyringError, KeyringResult};
use crate::store::{KeyId, SecretStore};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use zeroize::Zeroizing;

#[derive(Clone, Default)]
pub struct MemorySecretStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    probes: AtomicUsize,
}

#[derive(Default)]
struct State {
    next_id: i64,
    keys: BTreeMap<i64, StoredKey>,
    failure: Option<String>,
}

struct StoredKey {
    name: String,
    payload: Zeroizing<Vec<u8>>,
    revoked: bool,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails as if the facility were missing.
    pub fn unavailable(reason: &str) -> Self {
        let store = Self::new();
        store.set_failure(Some(reason));
        store
    }

    pub fn set_failure(&self, reason: Option<&str>) {
        self.state().failure = reason.map(str::to_string);
    }

    /// Number of times [`SecretStore::probe`] ran.
    pub fn probe_count(&self) -> usize {
        self.inner.probes.load(Ordering::SeqCst)
    }

    /// Marks every key named `name` revoked, as `keyctl revoke` would.
    pub fn revoke(&self, name: &str) {
        for key in self.state().keys.values_mut().filter(|k| k.name == name) {
            key.revoked = true;
        }
    }

    /// Drops every key named `name`, as if it expired and was garbage collected.
    pub fn remove(&self, name: &str) {
        self.state().keys.retain(|_, k| k.name != name);
    }

    /// Raw payload of the live key named `name`.
    pub fn payload(&self, name: &str) -> Option<Vec<u8>> {
        self.state()
            .keys
            .values()
            .find(|k| k.name == name && !k.revoked)
            .map(|k| k.payload.to_vec())
    }

    /// Number of stored keys, revoked ones included.
    pub fn len(&self) -> usize {
        self.state().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(state: &State) -> KeyringResult<()> {
        match &state.failure {
            Some(reason) => Err(KeyringError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl SecretStore for MemorySecretStore {
    fn create(&self, name: &str, payload: &[u8]) -> KeyringResult<KeyId> {
        let mut state = self.state();
        Self::check(&state)?;

        if let Some((&id, key)) = state
            .keys
            .iter_mut()
            .find(|(_, k)| k.name == name && !k.revoked)
        {
            key.payload = Zeroizing::new(payload.to_vec());
            return Ok(KeyId(id));
        }

        // a revoked key with the same description is displaced
        state.keys.retain(|_, k| k.name != name);
        state.next_id += 1;
        let id = state.next_id;
        state.keys.insert(
            id,
            StoredKey {
                name: name.to_string(),
                payload: Zeroizing::new(payload.to_vec()),
                revoked: false,
            },
        );
        Ok(KeyId(id))
    }

    fn find(&self, name: &str) -> KeyringResult<KeyId> {
        let state = self.state();
        Self::check(&state)?;

        let mut revoked = false;
        for (&id, key) in state.keys.iter().filter(|(_, k)| k.name == name) {
            if !key.revoked {
                return Ok(KeyId(id));
            }
            revoked = true;
        }
        if revoked {
            Err(KeyringError::KeyInvalid(format!("{name}: key revoked")))
        } else {
            Err(KeyringError::KeyNotFound(name.to_string()))
        }
    }

    fn read(&self, id: KeyId) -> KeyringResult<Zeroizing<Vec<u8>>> {
        let state = self.state();
        Self::check(&state)?;

        match state.keys.get(&id.0) {
            None => Err(KeyringError::KeyNotFound(id.to_string())),
            Some(k) if k.revoked => Err(KeyringError::KeyInvalid(format!("{id}: key revoked"))),
            Some(k) => Ok(k.payload.clone()),
        }
    }

    fn delete(&self, id: KeyId) -> KeyringResult<()> {
        let mut state = self.state();
        Self::check(&state)?;

        state
            .keys
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| KeyringError::KeyNotFound(id.to_string()))
    }

    fn probe(&self) -> KeyringResult<()> {
        self.inner.probes.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_updates_live_key_in_place() {
        let store = MemorySecretStore::new();
        let a = store.create("n", b"one").unwrap();
        let b = store.create("n", b"two").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.read(a).unwrap().as_slice(), b"two");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn revoked_key_is_invalid_and_replaced_on_create() {
        let store = MemorySecretStore::new();
        let old = store.create("n", b"one").unwrap();
        store.revoke("n");

        assert!(matches!(store.find("n"), Err(KeyringError::KeyInvalid(_))));
        assert!(matches!(store.read(old), Err(KeyringError::KeyInvalid(_))));

        let new = store.create("n", b"two").unwrap();
        assert_ne!(old, new);
        assert_eq!(store.find("n").unwrap(), new);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_key_is_not_found() {
        let store = MemorySecretStore::new();
        assert!(store.find("nope").unwrap_err().is_not_found());
        assert!(store.read(KeyId(99)).unwrap_err().is_not_found());
        assert!(store.delete(KeyId(99)).unwrap_err().is_not_found());
    }

    #[test]
    fn clones_share_keys() {
        let a = MemorySecretStore::new();
        let b = a.clone();
        let id = a.create("shared", b"k").unwrap();
        assert_eq!(b.find("shared").unwrap(), id);
    }

    #[test]
    fn unavailable_store_fails_everything() {
        let store = MemorySecretStore::unavailable("no keyring");
        assert!(matches!(store.probe(), Err(KeyringError::Unavailable(_))));
        assert!(matches!(store.create("n", b"x"), Err(KeyringError::Unavailable(_))));
        assert_eq!(store.probe_count(), 1);

        store.set_failure(None);
        assert!(store.probe().is_ok());
    }

    #[test]
    fn default_probe_cycle_cleans_up() {
        // exercise the trait's default probe through a wrapper
        struct Plain(MemorySecretStore);
        impl SecretStore for Plain {
            fn create(&self, n: &str, p: &[u8]) -> KeyringResult<KeyId> {
                self.0.create(n, p)
            }
            fn find(&self, n: &str) -> KeyringResult<KeyId> {
                self.0.find(n)
            }
            fn read(&self, id: KeyId) -> KeyringResult<Zeroizing<Vec<u8>>> {
                self.0.read(id)
            }
            fn delete(&self, id: KeyId) -> KeyringResult<()> {
                self.0.delete(id)
            }
        }

        let inner = MemorySecretStore::new();
        Plain(inner.clone()).probe().unwrap();
        assert!(inner.is_empty());
    }

    #[test]
    fn overlapping_default_probes_use_separate_keys() {
        use std::sync::{Arc, Barrier};

        // both probes create before either reads back or deletes
        struct Gated {
            inner: MemorySecretStore,
            gate: Arc<Barrier>,
            created: Arc<Mutex<Vec<String>>>,
        }
        impl SecretStore for Gated {
            fn create(&self, n: &str, p: &[u8]) -> KeyringResult<KeyId> {
                let id = self.inner.create(n, p)?;
                self.created.lock().unwrap().push(n.to_string());
                self.gate.wait();
                Ok(id)
            }
            fn find(&self, n: &str) -> KeyringResult<KeyId> {
                self.inner.find(n)
            }
            fn read(&self, id: KeyId) -> KeyringResult<Zeroizing<Vec<u8>>> {
                self.inner.read(id)
            }
            fn delete(&self, id: KeyId) -> KeyringResult<()> {
                self.inner.delete(id)
            }
        }

        let inner = MemorySecretStore::new();
        let gate = Arc::new(Barrier::new(2));
        let created = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Gated {
                    inner: inner.clone(),
                    gate: Arc::clone(&gate),
                    created: Arc::clone(&created),
                };
                std::thread::spawn(move || store.probe())
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        let names = created.lock().unwrap();
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
        assert!(inner.is_empty());
    }

    #[test]
    fn probe_key_names_are_unique() {
        let a = crate::store::probe_key_name();
        let b = crate::store::probe_key_name();
        assert_ne!(a, b);
        assert!(a.starts_with(&format!("tokencache-probe-{}-", std::process::id())));
    }
}
