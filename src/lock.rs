use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// Mutual-exclusion lock over the platform mutex.
///
/// A panic while the lock is held does not poison it; the next caller simply
/// acquires it.
pub struct Lock {
    mutex: Mutex<()>,
}

/// Holds a [`Lock`] until released or dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl Lock {
    pub const fn new() -> Lock {
        Lock { mutex: Mutex::new(()) }
    }

    /// Blocks until the lock is held.
    pub fn acquire(&self) -> LockGuard<'_> {
        if let Some(guard) = self.try_acquire() {
            return guard;
        }
        trace!("lock contended, blocking");
        let guard = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);
        LockGuard { _guard: guard }
    }

    /// Takes the lock only if nobody holds it.
    pub fn try_acquire(&self) -> Option<LockGuard<'_>> {
        match self.mutex.try_lock() {
            Ok(guard) => Some(LockGuard { _guard: guard }),
            Err(TryLockError::Poisoned(poisoned)) => Some(LockGuard { _guard: poisoned.into_inner() }),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

impl Default for Lock {
    fn default() -> Self {
        Lock::new()
    }
}

impl Debug for Lock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lock").finish_non_exhaustive()
    }
}

impl<'a> LockGuard<'a> {
    /// Releases the lock before the end of the scope.
    #[inline]
    pub fn release(self) {}
}

#[cfg(test)]
mod lock_tests {
    use crate::Lock;
    use std::sync::Arc;

    #[test]
    fn try_acquire_fails_while_held() {
        let lock = Lock::new();
        let guard = lock.acquire();
        assert!(lock.try_acquire().is_none());
        guard.release();
        let guard = lock.try_acquire();
        assert!(guard.is_some());
        drop(guard);
        assert!(lock.try_acquire().is_some());
    }

    #[test]
    fn held_lock_blocks_other_threads() {
        let lock = Arc::new(Lock::new());
        let guard = lock.acquire();
        let other = lock.clone();
        let attempt = std::thread::spawn(move || other.try_acquire().is_some()).join().unwrap();
        assert!(!attempt);
        drop(guard);
        let other = lock.clone();
        let attempt = std::thread::spawn(move || other.try_acquire().is_some()).join().unwrap();
        assert!(attempt);
    }

    #[test]
    fn panic_while_held_does_not_poison() {
        let lock = Arc::new(Lock::new());
        let other = lock.clone();
        let result = std::thread::spawn(move || {
            let _guard = other.acquire();
            panic!("holding the lock");
        }).join();
        assert!(result.is_err());
        assert!(lock.try_acquire().is_some());
        lock.acquire().release();
    }
}
