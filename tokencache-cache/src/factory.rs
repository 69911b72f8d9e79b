//! Builds cache accessors, probing the secret store once per factory.
//!
//! Two things are constructed at most once and shared with every caller,
//! including callers that race the first construction:
//!
//! - the secret store and its usability probe
//! - the accessor for each (name, CAE flag) pair
//!
//! Each slot is a [`OnceLock`]; the map of accessor slots is locked only to
//! fetch or insert a slot, so building one accessor never waits on another.

use crate::accessor::{CacheAccessor, EncryptedFileAccessor, PlaintextFileAccessor};
use crate::config::CacheOptions;
use crate::error::{CacheError, CacheResult};
use crate::paths::{DefaultPathResolver, DirPathResolver, PathResolver};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokencache_keyring::{KeyringResult, ManagedKey, SecretStore, platform_store};
use tracing::{debug, warn};

/// File suffix for tokens that support continuous access evaluation.
pub const CAE_SUFFIX: &str = ".cae";
/// File suffix for all other tokens.
pub const NO_CAE_SUFFIX: &str = ".nocae";

/// Opens the secret store the factory will probe.
pub type StoreProvider = Arc<dyn Fn() -> KeyringResult<Arc<dyn SecretStore>> + Send + Sync>;

type AccessorSlot = Arc<OnceLock<CacheResult<Arc<dyn CacheAccessor>>>>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct AccessorKey {
    name: String,
    cae: bool,
    cache_dir: Option<PathBuf>,
    allow_unencrypted_storage: bool,
}

pub struct KeyStoreFactory {
    provider: StoreProvider,
    resolver: Arc<dyn PathResolver>,
    store: OnceLock<CacheResult<Arc<dyn SecretStore>>>,
    accessors: Mutex<HashMap<AccessorKey, AccessorSlot>>,
}

impl KeyStoreFactory {
    /// A factory over the platform secret store and cache directory.
    pub fn new() -> Self {
        Self::with_provider(Arc::new(platform_store))
    }

    /// The factory shared by every [`Cache`](crate::Cache) opened without one.
    pub fn global() -> Arc<KeyStoreFactory> {
        static GLOBAL: OnceLock<Arc<KeyStoreFactory>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(KeyStoreFactory::new())))
    }

    pub fn with_provider(provider: StoreProvider) -> Self {
        Self {
            provider,
            resolver: Arc::new(DefaultPathResolver),
            store: OnceLock::new(),
            accessors: Mutex::new(HashMap::new()),
        }
    }

    /// A factory over an already opened store. The store is still probed.
    pub fn with_store(store: Arc<dyn SecretStore>) -> Self {
        Self::with_provider(Arc::new(move || -> KeyringResult<Arc<dyn SecretStore>> {
            Ok(Arc::clone(&store))
        }))
    }

    /// Replaces the resolver used when options carry no `cache_dir`.
    pub fn with_resolver(mut self, resolver: Arc<dyn PathResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The probed secret store, or the error that made it unusable.
    pub fn store(&self) -> CacheResult<Arc<dyn SecretStore>> {
        self.store.get_or_init(|| self.open_store()).clone()
    }

    /// The accessor for `options.name` and the given CAE flag.
    pub fn accessor(&self, options: &CacheOptions, cae: bool) -> CacheResult<Arc<dyn CacheAccessor>> {
        options.validate()?;
        let key = AccessorKey {
            name: options.name.clone(),
            cae,
            cache_dir: options.cache_dir.clone(),
            allow_unencrypted_storage: options.allow_unencrypted_storage,
        };
        let slot = {
            let mut accessors = self.accessors.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(accessors.entry(key).or_default())
        };
        slot.get_or_init(|| self.build(options, cae)).clone()
    }

    fn open_store(&self) -> CacheResult<Arc<dyn SecretStore>> {
        let store = (self.provider)().map_err(CacheError::facility_unavailable)?;
        store.probe().map_err(CacheError::facility_unavailable)?;
        debug!("secret store probe succeeded");
        Ok(store)
    }

    fn build(&self, options: &CacheOptions, cae: bool) -> CacheResult<Arc<dyn CacheAccessor>> {
        let name = suffixed_name(&options.name, cae);
        let path = match &options.cache_dir {
            Some(dir) => DirPathResolver::new(dir).cache_file_path(&name)?,
            None => self.resolver.cache_file_path(&name)?,
        };

        match self.store() {
            Ok(store) => {
                debug!(name = %name, path = %path.display(), "opened encrypted cache");
                Ok(Arc::new(EncryptedFileAccessor::new(path, ManagedKey::new(name, store))))
            }
            Err(e) if options.allow_unencrypted_storage => {
                warn!(
                    name = %name,
                    path = %path.display(),
                    error = %e,
                    "secret store unusable; storing token cache unencrypted"
                );
                Ok(Arc::new(PlaintextFileAccessor::new(path)))
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for KeyStoreFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// `name` with the suffix selecting the CAE or non-CAE file.
pub fn suffixed_name(name: &str, cae: bool) -> String {
    let suffix = if cae { CAE_SUFFIX } else { NO_CAE_SUFFIX };
    format!("{name}{suffix}")
}
