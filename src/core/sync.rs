//! Synchronization helpers for std locks
//!
//! Registries and broker queues guard their maps with std locks. A panic inside
//! a processor or a transport task must not turn every later lock into a panic
//! as well, so poisoned locks are converted into module errors here.

use std::sync::{LockResult, RwLockReadGuard, RwLockWriteGuard};

/// Convert a poisoned mutex into an application error
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use queuebridge::core::sync::handle_mutex_poison;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(mutex.lock(), |msg| msg).unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). A panic occurred while holding a lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Convert a poisoned RwLock read into an application error
pub fn handle_rwlock_read<T, E>(
    result: LockResult<RwLockReadGuard<'_, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<'_, T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock read poisoned). A writer panicked while holding the lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Convert a poisoned RwLock write into an application error
pub fn handle_rwlock_write<T, E>(
    result: LockResult<RwLockWriteGuard<'_, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<'_, T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock write poisoned). A panic occurred while holding the lock. PoisonError: {:?}",
            poison_err
        ))
    })
}
