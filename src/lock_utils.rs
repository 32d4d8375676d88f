//! Poison-tolerant lock acquisition.
//!
//! A producer that panics while the endpoint table is locked, or a task that
//! dies holding the geolocation cache, must not take the listeners down with
//! it. These helpers log the poisoning at ERROR level and hand back the inner
//! guard so request handling keeps going.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::error;

/// Lock `mutex`, recovering the guard if a previous holder panicked.
///
/// `context` names the protected data in the log line, e.g. `"geolocation cache"`.
pub fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        error!("Mutex poisoned for '{}' - recovering", context);
        poisoned.into_inner()
    })
}

pub fn read_lock_or_recover<'a, T>(rwlock: &'a RwLock<T>, context: &str) -> RwLockReadGuard<'a, T> {
    rwlock.read().unwrap_or_else(|poisoned| {
        error!("RwLock (read) poisoned for '{}' - recovering", context);
        poisoned.into_inner()
    })
}

pub fn write_lock_or_recover<'a, T>(
    rwlock: &'a RwLock<T>,
    context: &str,
) -> RwLockWriteGuard<'a, T> {
    rwlock.write().unwrap_or_else(|poisoned| {
        error!("RwLock (write) poisoned for '{}' - recovering", context);
        poisoned.into_inner()
    })
}
