//! Token cache configuration.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name used when the application doesn't choose one.
pub const DEFAULT_CACHE_NAME: &str = "msal.cache";

/// Options for opening a persistent token cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Base name of the cache. Applications sharing a name share tokens.
    pub name: String,

    /// Store the cache unencrypted when no OS secret store is usable.
    ///
    /// Off by default. When off, opening a cache on such a system fails with
    /// [`CacheError::FacilityUnavailable`].
    pub allow_unencrypted_storage: bool,

    /// Directory for cache files, overriding the platform cache directory.
    pub cache_dir: Option<PathBuf>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_CACHE_NAME.to_string(),
            allow_unencrypted_storage: false,
            cache_dir: None,
        }
    }
}

impl CacheOptions {
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Rejects names that can't be both a file name and a key description.
    pub fn validate(&self) -> CacheResult<()> {
        let name = self.name.as_str();
        if name.is_empty() {
            return Err(CacheError::Config("cache name must not be empty".into()));
        }
        if name == "." || name == ".." {
            return Err(CacheError::Config(format!("invalid cache name {name:?}")));
        }
        if name.chars().any(|c| c == '/' || c == '\\' || c == '\0') {
            return Err(CacheError::Config(format!(
                "cache name {name:?} must not contain path separators or NUL"
            )));
        }
        Ok(())
    }
}
