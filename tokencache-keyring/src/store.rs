//! The secret-store capability every platform adapter implements.

use crate::error::{KeyringError, KeyringResult};
use std::sync::atomic::{AtomicU64, Ordering};
use zeroize::Zeroizing;

static PROBE_SEQ: AtomicU64 = AtomicU64::new(0);

/// A throwaway key name no other probe in this process is using.
pub(crate) fn probe_key_name() -> String {
    let seq = PROBE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("tokencache-probe-{}-{seq}", std::process::id())
}

/// Identifies a key inside one secret store.
///
/// On Linux this is the kernel key serial number; other adapters hand out
/// their own stable numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyId(pub i64);

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Abstraction over an OS facility that holds named raw keys.
///
/// Implementations must map "no such key" to [`KeyringError::KeyNotFound`]
/// and "key exists but is expired/revoked" to [`KeyringError::KeyInvalid`];
/// the retry logic in [`crate::ManagedKey`] depends on that classification.
pub trait SecretStore: Send + Sync {
    /// Stores `payload` under `name`, replacing any existing key with that name.
    fn create(&self, name: &str, payload: &[u8]) -> KeyringResult<KeyId>;

    /// Looks a key up by name.
    fn find(&self, name: &str) -> KeyringResult<KeyId>;

    /// Reads a key's payload.
    fn read(&self, id: KeyId) -> KeyringResult<Zeroizing<Vec<u8>>>;

    /// Removes a key.
    fn delete(&self, id: KeyId) -> KeyringResult<()>;

    /// Checks the facility works end to end with a throwaway key.
    ///
    /// Each call uses its own key, so concurrent probes can't unlink each
    /// other's key.
    fn probe(&self) -> KeyringResult<()> {
        let name = probe_key_name();
        let payload = b"tokencache-probe";

        let id = self.create(&name, payload)?;
        let read = self.read(id);
        if let Err(e) = self.delete(id) {
            tracing::debug!(error = %e, "failed to remove probe key");
        }

        if read?.as_slice() != payload {
            return Err(KeyringError::Unavailable(
                "probe key read back different bytes".into(),
            ));
        }
        Ok(())
    }
}
