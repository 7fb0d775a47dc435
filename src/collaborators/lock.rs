//! Merge-driver lock: the host VCS invokes a merge driver once per
//! conflicted file, but the merge engine must run only once per logical
//! merge. A marker file in the repository's metadata directory arbitrates
//! which invocation does the real work.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Guard over the merge-driver lock marker file.
///
/// [`MergeDriverLock::acquire`] returns `Ok(Some(lock))` for the invocation
/// that wins the race (creates the marker) and `Ok(None)` for every later
/// invocation within the same merge (marker already present) — that caller
/// should no-op and let the winning invocation's merge result stand. The
/// marker is removed when the winning guard is dropped.
pub struct MergeDriverLock {
    path: PathBuf,
}

impl MergeDriverLock {
    /// Attempt to acquire the lock at `<git_dir>/.semmerge.lock`.
    ///
    /// # Errors
    /// Returns an I/O error only for failures other than "already exists"
    /// (permission denied, missing parent directory, etc).
    pub fn acquire(git_dir: &Path) -> std::io::Result<Option<Self>> {
        let path = git_dir.join(".semmerge.lock");
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Some(Self { path })),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Drop for MergeDriverLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to remove merge-driver lock");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_acquire_wins_second_observes_lock() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = MergeDriverLock::acquire(dir.path())
            .expect("io ok")
            .expect("first invocation wins the lock");
        let second = MergeDriverLock::acquire(dir.path()).expect("io ok");
        assert!(second.is_none());
        drop(first);
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let _lock = MergeDriverLock::acquire(dir.path())
                .expect("io ok")
                .expect("acquired");
        }
        let reacquired = MergeDriverLock::acquire(dir.path()).expect("io ok");
        assert!(reacquired.is_some());
    }
}
