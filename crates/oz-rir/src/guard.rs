//! Scoped replacement of a shared solver configuration file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Holds the pre-call bytes of a file and puts them back on drop.
///
/// A file that did not exist before is removed again.
pub(crate) struct ConfigGuard {
    path: PathBuf,
    original: Option<Vec<u8>>,
}

impl ConfigGuard {
    /// Snapshot `path`, then overwrite it with `contents`.
    pub(crate) fn replace(path: &Path, contents: &[u8]) -> io::Result<Self> {
        let original = match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        let guard = Self {
            path: path.to_path_buf(),
            original,
        };
        fs::write(path, contents)?;
        Ok(guard)
    }

    fn restore(&self) -> io::Result<()> {
        match &self.original {
            Some(bytes) => fs::write(&self.path, bytes),
            None => match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
        }
    }
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::error!(path = %self.path.display(), error = %e, "failed to restore solver configuration");
        }
    }
}
