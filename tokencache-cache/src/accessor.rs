//! Read/Write/Delete against one named cache file.

use crate::error::CacheResult;
use crate::file;
use std::path::{Path, PathBuf};
use tokencache_crypto::Jwe;
use tokencache_keyring::ManagedKey;
use tracing::debug;

/// The blob-level contract the OAuth library's cache hook relies on.
pub trait CacheAccessor: Send + Sync {
    /// Returns the cached bytes, or `None` when there is nothing usable.
    fn read(&self) -> CacheResult<Option<Vec<u8>>>;

    /// Persists `data`. Empty data leaves any existing file untouched.
    fn write(&self, data: &[u8]) -> CacheResult<()>;

    /// Removes the cache. Deleting a missing cache succeeds.
    fn delete(&self) -> CacheResult<()>;
}

/// Stores the cache as a JWE whose key lives in a secret store.
pub struct EncryptedFileAccessor {
    path: PathBuf,
    key: ManagedKey,
}

impl EncryptedFileAccessor {
    pub fn new(path: PathBuf, key: ManagedKey) -> Self {
        Self { path, key }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheAccessor for EncryptedFileAccessor {
    fn read(&self) -> CacheResult<Option<Vec<u8>>> {
        let Some(data) = file::read(&self.path)? else {
            return Ok(None);
        };
        let jwe = Jwe::parse(&data)?;
        let plaintext = self.key.decrypt(&jwe)?;
        if plaintext.is_none() {
            debug!(path = %self.path.display(), "cache file unreadable; treating as a miss");
        }
        Ok(plaintext)
    }

    fn write(&self, data: &[u8]) -> CacheResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let compact = self.key.encrypt(data)?.serialize()?;
        file::write(&self.path, compact.as_bytes())
    }

    fn delete(&self) -> CacheResult<()> {
        self.key.delete()?;
        file::remove(&self.path)
    }
}

/// Stores the cache unencrypted. Only built on explicit opt-in.
pub struct PlaintextFileAccessor {
    path: PathBuf,
}

impl PlaintextFileAccessor {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheAccessor for PlaintextFileAccessor {
    fn read(&self) -> CacheResult<Option<Vec<u8>>> {
        file::read(&self.path)
    }

    fn write(&self, data: &[u8]) -> CacheResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        file::write(&self.path, data)
    }

    fn delete(&self) -> CacheResult<()> {
        file::remove(&self.path)
    }
}
