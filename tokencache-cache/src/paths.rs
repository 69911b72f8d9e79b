//! Cache file locations.
//!
//! Files live at `<platform-cache-dir>/.IdentityService/<name>`. On Linux the
//! platform cache dir is `$XDG_CACHE_HOME`, falling back to `$HOME/.cache`;
//! elsewhere it comes from the `dirs` crate.

use crate::error::{CacheError, CacheResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Directory under the platform cache dir shared with other identity tools.
pub const CACHE_SUBDIR: &str = ".IdentityService";

/// Maps a cache name to the absolute path of its file.
pub trait PathResolver: Send + Sync {
    fn cache_file_path(&self, name: &str) -> CacheResult<PathBuf>;
}

/// Resolves paths under the platform cache directory.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPathResolver;

impl PathResolver for DefaultPathResolver {
    fn cache_file_path(&self, name: &str) -> CacheResult<PathBuf> {
        Ok(platform_cache_dir()?.join(CACHE_SUBDIR).join(name))
    }
}

/// Resolves paths inside a fixed directory.
#[derive(Clone, Debug)]
pub struct DirPathResolver {
    dir: PathBuf,
}

impl DirPathResolver {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl PathResolver for DirPathResolver {
    fn cache_file_path(&self, name: &str) -> CacheResult<PathBuf> {
        if self.dir.is_absolute() {
            Ok(self.dir.join(name))
        } else {
            let cwd = std::env::current_dir().map_err(|e| CacheError::Path(e.to_string()))?;
            Ok(cwd.join(&self.dir).join(name))
        }
    }
}

fn platform_cache_dir() -> CacheResult<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        xdg_cache_dir(std::env::var_os("XDG_CACHE_HOME"), dirs::home_dir())
    }

    #[cfg(not(target_os = "linux"))]
    {
        dirs::cache_dir()
            .ok_or_else(|| CacheError::Path("no cache directory for this user".into()))
    }
}

/// `$XDG_CACHE_HOME` when set to an absolute path, else `$HOME/.cache`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn xdg_cache_dir(xdg: Option<OsString>, home: Option<PathBuf>) -> CacheResult<PathBuf> {
    if let Some(dir) = xdg.map(PathBuf::from).filter(|p| p.is_absolute()) {
        return Ok(dir);
    }
    match home {
        Some(home) if !home.as_os_str().is_empty() => Ok(home.join(".cache")),
        _ => Err(CacheError::Path(
            "neither XDG_CACHE_HOME nor HOME is set".into(),
        )),
    }
}
