//! Project-wide build lock.
//!
//! An advisory `flock` on `<root>/.native-build.lock`. The file itself is
//! left in place between runs: only the lock on its inode matters, and it
//! is released when the handle closes.

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::Path;

/// Held for the whole run. Dropping it closes the file and releases the lock.
#[derive(Debug)]
pub struct BuildLock {
    _file: File,
}

impl BuildLock {
    /// Take the lock, or fail at once if another run holds it.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating lock directory '{}'", parent.display()))?;
        }

        // Unlinking would let a later run lock a fresh inode at the same path.
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("opening lock file '{}'", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            bail!(
                "another build is running in this project (lock held: {})",
                path.display()
            );
        }
        tracing::debug!("locked {}", path.display());

        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_fails_until_released() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".native-build.lock");

        let first = BuildLock::acquire(&path).unwrap();
        let err = BuildLock::acquire(&path).unwrap_err();
        assert!(err.to_string().contains("another build is running"));

        drop(first);
        assert!(path.is_file());
        assert!(BuildLock::acquire(&path).is_ok());
    }

    #[test]
    fn test_waiting_opener_and_new_run_never_both_hold_the_lock() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".native-build.lock");

        let first = BuildLock::acquire(&path).unwrap();
        let early_opener = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        drop(first);

        let _second = BuildLock::acquire(&path).unwrap();
        assert!(early_opener.try_lock_exclusive().is_err());
    }

    #[test]
    fn test_creates_missing_parent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("project/.native-build.lock");
        let _lock = BuildLock::acquire(&path).unwrap();
        assert!(path.is_file());
    }
}
