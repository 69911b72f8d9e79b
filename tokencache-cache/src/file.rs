//! Cache file I/O shared by the encrypted and plaintext accessors.

use crate::error::CacheResult;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

/// Reads the file. A missing or empty file is `None`.
pub(crate) fn read(path: &Path) -> CacheResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) if data.is_empty() => Ok(None),
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Replaces the file contents, creating the parent directory on first use.
pub(crate) fn write(path: &Path, data: &[u8]) -> CacheResult<()> {
    match write_once(path, data) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                debug!(dir = %parent.display(), "creating cache directory");
                create_dir(parent)?;
            }
            Ok(write_once(path, data)?)
        }
        other => Ok(other?),
    }
}

/// Removes the file. A missing file is not an error.
pub(crate) fn remove(path: &Path) -> CacheResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn write_once(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

fn create_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder.create(dir)
}
