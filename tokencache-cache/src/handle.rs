//! The handle an OAuth client holds, and the hook it calls around each
//! token cache access.

use crate::accessor::CacheAccessor;
use crate::config::CacheOptions;
use crate::error::{CacheError, CacheResult};
use crate::factory::KeyStoreFactory;
use std::sync::Arc;

/// Boxed error returned by the OAuth library's (un)marshalers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Serializes the in-memory token cache.
pub trait Marshaler {
    fn marshal(&self) -> Result<Vec<u8>, BoxError>;
}

/// Loads a serialized token cache, replacing the in-memory one.
pub trait Unmarshaler {
    fn unmarshal(&mut self, data: &[u8]) -> Result<(), BoxError>;
}

/// A persistent token cache.
///
/// Cloning is cheap; clones share the factory and therefore the accessors.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<Inner>,
}

struct Inner {
    factory: Arc<KeyStoreFactory>,
    options: CacheOptions,
}

impl Cache {
    /// Opens a cache through the process-wide factory.
    pub fn open(options: CacheOptions) -> CacheResult<Self> {
        Self::with_factory(options, KeyStoreFactory::global())
    }

    pub fn with_factory(options: CacheOptions, factory: Arc<KeyStoreFactory>) -> CacheResult<Self> {
        options.validate()?;
        Ok(Self {
            inner: Arc::new(Inner { factory, options }),
        })
    }

    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    /// The export/replace hook for CAE (`true`) or non-CAE tokens.
    ///
    /// The first call for a flag probes the secret store, which fails with
    /// [`CacheError::FacilityUnavailable`] unless plaintext storage was
    /// allowed.
    pub fn accessor(&self, cae: bool) -> CacheResult<ExportReplace> {
        let accessor = self.inner.factory.accessor(&self.inner.options, cae)?;
        Ok(ExportReplace { accessor })
    }
}

/// Moves the token cache between the OAuth library and persistent storage.
#[derive(Clone)]
pub struct ExportReplace {
    accessor: Arc<dyn CacheAccessor>,
}

impl ExportReplace {
    pub fn new(accessor: Arc<dyn CacheAccessor>) -> Self {
        Self { accessor }
    }

    /// Loads persisted tokens into `cache`. A miss leaves `cache` as it is.
    pub fn replace(&self, cache: &mut dyn Unmarshaler) -> CacheResult<()> {
        match self.accessor.read()? {
            Some(data) => cache
                .unmarshal(&data)
                .map_err(|e| CacheError::Marshal(e.to_string())),
            None => Ok(()),
        }
    }

    /// Persists the tokens held by `cache`.
    pub fn export(&self, cache: &dyn Marshaler) -> CacheResult<()> {
        let data = cache
            .marshal()
            .map_err(|e| CacheError::Marshal(e.to_string()))?;
        self.accessor.write(&data)
    }

    /// Removes persisted tokens and the key protecting them.
    pub fn clear(&self) -> CacheResult<()> {
        self.accessor.delete()
    }
}
