//! Global module search path
//!
//! The search path is process-wide state shared with the script backend's
//! import resolution. Every load that reads it runs while a
//! [`SearchPathGuard`] holds the global lock, so a directory pushed for one
//! load can never be observed by, or leak into, another load. The lock is
//! not reentrant.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::utils::{env_opt, lock};

/// Environment variable seeding the search path (platform path-list syntax)
pub const SEARCH_PATH_ENV: &str = "MODHOST_PATH";

static SEARCH_PATH: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

/// Exclusive access to the search path for the duration of a load
///
/// Created by [`acquire`] or [`scoped`]. A directory pushed by [`scoped`] is
/// removed again when the guard drops, whether the load succeeded, failed
/// or panicked.
pub struct SearchPathGuard {
    entries: MutexGuard<'static, Vec<PathBuf>>,
    pushed: Option<PathBuf>,
}

impl SearchPathGuard {
    /// Current entries, front first
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }
}

impl Drop for SearchPathGuard {
    fn drop(&mut self) {
        if let Some(dir) = self.pushed.take() {
            if let Some(pos) = self.entries.iter().position(|entry| *entry == dir) {
                self.entries.remove(pos);
            }
            debug!("Popped {:?} from module search path", dir);
        }
    }
}

/// Lock the search path without modifying it
pub fn acquire() -> SearchPathGuard {
    SearchPathGuard {
        entries: lock(&SEARCH_PATH),
        pushed: None,
    }
}

/// Lock the search path and push `dir` to its front until the guard drops
pub fn scoped<P: AsRef<Path>>(dir: P) -> SearchPathGuard {
    let dir = dir.as_ref().to_path_buf();
    let mut entries = lock(&SEARCH_PATH);
    entries.insert(0, dir.clone());
    debug!("Pushed {:?} onto module search path", dir);
    SearchPathGuard {
        entries,
        pushed: Some(dir),
    }
}

/// Permanently append `dir` unless it is already present
///
/// Must not be called while the current thread holds a [`SearchPathGuard`].
pub fn append<P: AsRef<Path>>(dir: P) {
    let dir = dir.as_ref().to_path_buf();
    let mut entries = lock(&SEARCH_PATH);
    if !entries.contains(&dir) {
        debug!("Appending {:?} to module search path", dir);
        entries.push(dir);
    }
}

/// Remove every occurrence of `dir`; returns whether anything was removed
pub fn remove<P: AsRef<Path>>(dir: P) -> bool {
    let dir = dir.as_ref();
    let mut entries = lock(&SEARCH_PATH);
    let before = entries.len();
    entries.retain(|entry| entry != dir);
    before != entries.len()
}

/// Snapshot of the current entries
pub fn entries() -> Vec<PathBuf> {
    lock(&SEARCH_PATH).clone()
}

/// Append every directory listed in `MODHOST_PATH`; returns how many were read
pub fn extend_from_env() -> usize {
    let Some(value) = env_opt(SEARCH_PATH_ENV) else {
        return 0;
    };
    let dirs: Vec<PathBuf> = std::env::split_paths(&value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect();
    for dir in &dirs {
        append(dir);
    }
    dirs.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_scoped_push_is_popped() {
        let dir = PathBuf::from("/tmp/modhost-scoped-test");
        {
            let guard = scoped(&dir);
            assert_eq!(guard.entries().first(), Some(&dir));
        }
        assert!(!entries().contains(&dir));
    }

    #[test]
    #[serial]
    fn test_scoped_push_is_popped_on_panic() {
        let dir = PathBuf::from("/tmp/modhost-panic-test");
        let result = std::panic::catch_unwind(|| {
            let _guard = scoped(&dir);
            panic!("load failed");
        });
        assert!(result.is_err());
        assert!(!entries().contains(&dir));
    }

    #[test]
    #[serial]
    fn test_append_and_remove() {
        let dir = PathBuf::from("/tmp/modhost-append-test");
        append(&dir);
        append(&dir);
        assert_eq!(entries().iter().filter(|e| **e == dir).count(), 1);
        assert!(remove(&dir));
        assert!(!remove(&dir));
    }

    #[test]
    #[serial]
    fn test_scoped_goes_before_permanent_entries() {
        let permanent = PathBuf::from("/tmp/modhost-permanent");
        let pushed = PathBuf::from("/tmp/modhost-pushed");
        append(&permanent);
        {
            let guard = scoped(&pushed);
            let entries = guard.entries();
            let p = entries.iter().position(|e| *e == pushed).unwrap();
            let q = entries.iter().position(|e| *e == permanent).unwrap();
            assert!(p < q);
        }
        remove(&permanent);
    }
}
