//! Lock utilities
//!
//! Helpers for common lock patterns with automatic release. A poisoned lock
//! is recovered rather than propagated: the guarded collections stay
//! structurally valid even if a callback panicked while holding them.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

/// Acquire a mutex, recovering from poisoning
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("Recovering poisoned mutex");
        poisoned.into_inner()
    })
}

/// Execute a closure with a Mutex lock, automatically releasing it
///
/// # Example
/// ```rust
/// use modhost::utils::with_lock;
/// use std::sync::Mutex;
///
/// let keys = Mutex::new(vec![1, 2]);
/// let len = with_lock(&keys, |guard| guard.len());
/// assert_eq!(len, 2);
/// ```
pub fn with_lock<T, F, R>(mutex: &Mutex<T>, f: F) -> R
where
    F: FnOnce(&mut T) -> R,
{
    let mut guard = lock(mutex);
    f(&mut guard)
}

/// Execute a closure with a read lock, automatically releasing it
pub fn with_read_lock<T, F, R>(rwlock: &RwLock<T>, f: F) -> R
where
    F: FnOnce(&T) -> R,
{
    let guard: RwLockReadGuard<'_, T> = rwlock.read().unwrap_or_else(|poisoned| {
        warn!("Recovering poisoned read lock");
        poisoned.into_inner()
    });
    f(&guard)
}

/// Execute a closure with a write lock, automatically releasing it
pub fn with_write_lock<T, F, R>(rwlock: &RwLock<T>, f: F) -> R
where
    F: FnOnce(&mut T) -> R,
{
    let mut guard: RwLockWriteGuard<'_, T> = rwlock.write().unwrap_or_else(|poisoned| {
        warn!("Recovering poisoned write lock");
        poisoned.into_inner()
    });
    f(&mut guard)
}
