//! Persistent, encrypted OAuth token cache.
//!
//! The cache is one file per (name, CAE flag) holding a compact JWE
//! (`dir` + `A128CBC-HS256`). The encryption key lives in the OS secret
//! store, never on disk. Reads self-heal: a file that can't be decrypted
//! reads as empty and the next write replaces it.
//!
//! ```no_run
//! use tokencache_cache::{Cache, CacheOptions};
//!
//! let cache = Cache::open(CacheOptions::with_name("my-app"))?;
//! let hook = cache.accessor(false)?;
//! # Ok::<(), tokencache_cache::CacheError>(())
//! ```
//!
//! Without a usable secret store, opening an accessor fails with
//! [`CacheError::FacilityUnavailable`] unless
//! [`CacheOptions::allow_unencrypted_storage`] is set.

pub mod accessor;
pub mod config;
pub mod error;
pub mod factory;
mod file;
pub mod handle;
pub mod paths;

pub use accessor::{CacheAccessor, EncryptedFileAccessor, PlaintextFileAccessor};
pub use config::{CacheOptions, DEFAULT_CACHE_NAME};
pub use error::{CacheError, CacheResult};
pub use factory::{CAE_SUFFIX, KeyStoreFactory, NO_CAE_SUFFIX, StoreProvider, suffixed_name};
pub use handle::{BoxError, Cache, ExportReplace, Marshaler, Unmarshaler};
pub use paths::{CACHE_SUBDIR, DefaultPathResolver, DirPathResolver, PathResolver};
