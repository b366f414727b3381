use crate::lock::Lock;
use std::cell::Cell;

/// Reference counter protocol.
///
/// A count of zero means the counted object is released: it can no longer be
/// revived through [`RefCount::try_increase`].
pub trait RefCount {
    fn count(&self) -> usize;

    fn increase(&self);

    /// Adds a reference unless the count already dropped to zero.
    fn try_increase(&self) -> bool;

    /// Drops a reference and returns true when none are left. At zero this
    /// changes nothing and returns true.
    fn try_release(&self) -> bool;
}

/// Unsynchronized counter for single-threaded owners.
#[derive(Debug, Default)]
pub struct RefCountLocal {
    count: Cell<usize>,
}

impl RefCountLocal {
    pub const fn new() -> RefCountLocal {
        RefCountLocal::with_count(0)
    }

    pub const fn with_count(count: usize) -> RefCountLocal {
        RefCountLocal { count: Cell::new(count) }
    }
}

impl RefCount for RefCountLocal {
    #[inline]
    fn count(&self) -> usize {
        self.count.get()
    }

    #[inline]
    fn increase(&self) {
        self.count.set(self.count.get() + 1);
    }

    fn try_increase(&self) -> bool {
        let count = self.count.get();
        if count == 0 {
            return false;
        }
        self.count.set(count + 1);
        true
    }

    fn try_release(&self) -> bool {
        let count = self.count.get();
        if count == 0 {
            return true;
        }
        self.count.set(count - 1);
        count == 1
    }
}

/// Counter shared between threads. Every operation runs under an internal [`Lock`].
#[derive(Debug, Default)]
pub struct RefCountAsync {
    lock: Lock,
    local: RefCountLocal,
}

// `local` is only touched while `lock` is held.
unsafe impl Sync for RefCountAsync {}

impl RefCountAsync {
    pub const fn new() -> RefCountAsync {
        RefCountAsync::with_count(0)
    }

    pub const fn with_count(count: usize) -> RefCountAsync {
        RefCountAsync {
            lock: Lock::new(),
            local: RefCountLocal::with_count(count),
        }
    }
}

impl RefCount for RefCountAsync {
    fn count(&self) -> usize {
        let _guard = self.lock.acquire();
        self.local.count()
    }

    fn increase(&self) {
        let _guard = self.lock.acquire();
        self.local.increase();
    }

    fn try_increase(&self) -> bool {
        let _guard = self.lock.acquire();
        self.local.try_increase()
    }

    fn try_release(&self) -> bool {
        let _guard = self.lock.acquire();
        self.local.try_release()
    }
}

#[cfg(test)]
mod ref_count_tests {
    use crate::{RefCount, RefCountAsync, RefCountLocal};
    use std::sync::Arc;

    fn protocol<R: RefCount>(counter: R) {
        assert_eq!(0, counter.count());
        assert!(!counter.try_increase(), "released object cannot be revived");
        assert!(counter.try_release());
        assert_eq!(0, counter.count());

        counter.increase();
        assert!(counter.try_increase());
        assert_eq!(2, counter.count());
        assert!(!counter.try_release());
        assert!(counter.try_release());
        assert_eq!(0, counter.count());
    }

    #[test]
    fn local_protocol() {
        protocol(RefCountLocal::new());
        assert_eq!(3, RefCountLocal::with_count(3).count());
    }

    #[test]
    fn async_protocol() {
        protocol(RefCountAsync::new());
        assert_eq!(3, RefCountAsync::with_count(3).count());
    }

    #[test]
    fn concurrent_increase_is_exact() {
        let counter = Arc::new(RefCountAsync::with_count(1));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.increase();
                        assert!(counter.try_increase());
                        assert!(!counter.try_release());
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(1 + 8 * 1000, counter.count());
    }
}
