//! OS secret stores for the token cache encryption key.
//!
//! Each cache file is encrypted with a 32-byte key that never touches disk.
//! The key lives in an OS facility behind the [`SecretStore`] trait:
//!
//! - Linux: the kernel keyring ([`KernelKeyring`]), `user` key type,
//!   promoted to the persistent keyring when available
//! - macOS / Windows: Keychain / Credential Manager ([`NativeStore`])
//! - Tests: [`MemorySecretStore`]
//!
//! [`ManagedKey`] layers the lookup, lazy creation and decrypt-retry policy
//! on top of any store, so every platform gets the same self-healing behavior.

mod error;
#[cfg(target_os = "linux")]
mod linux;
mod managed;
mod memory;
#[cfg(any(target_os = "macos", target_os = "windows"))]
mod native;
mod store;

pub use error::{KeyringError, KeyringResult};
#[cfg(target_os = "linux")]
pub use linux::KernelKeyring;
pub use managed::ManagedKey;
pub use memory::MemorySecretStore;
#[cfg(any(target_os = "macos", target_os = "windows"))]
pub use native::{DEFAULT_SERVICE, NativeStore};
pub use store::{KeyId, SecretStore};

use std::sync::Arc;

/// Opens the secret store native to the build target.
pub fn platform_store() -> KeyringResult<Arc<dyn SecretStore>> {
    #[cfg(target_os = "linux")]
    {
        Ok(Arc::new(KernelKeyring::new()?))
    }

    #[cfg(any(target_os = "macos", target_os = "windows"))]
    {
        Ok(Arc::new(NativeStore::new()))
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        Err(KeyringError::Unavailable(
            "no secret store for this platform".into(),
        ))
    }
}
