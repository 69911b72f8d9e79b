//! Shared helpers for token cache integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use tokencache_cache::{CacheOptions, DirPathResolver, KeyStoreFactory};
use tokencache_keyring::MemorySecretStore;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("tokencache_cache=debug,tokencache_keyring=debug"))
        .with_test_writer()
        .try_init();
}

/// A factory over `store` writing cache files into `dir`.
pub fn factory(store: &MemorySecretStore, dir: &Path) -> Arc<KeyStoreFactory> {
    Arc::new(
        KeyStoreFactory::with_store(Arc::new(store.clone()))
            .with_resolver(Arc::new(DirPathResolver::new(dir))),
    )
}

pub fn options(name: &str) -> CacheOptions {
    CacheOptions::with_name(name)
}
