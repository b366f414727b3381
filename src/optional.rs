use crate::aligned::AlignedMemory;
use std::fmt::Debug;

/// A value that may be absent, used as the result of every operation that may or
/// may not yield something (`remove`, replacing `insert`, `try_pop`).
///
/// Unlike `Option`, reading the value is a one-shot operation: [`Optional::unwrap`]
/// moves the value out through `&mut self` and leaves the wrapper absent, so a
/// second `unwrap` is a contract violation and panics.
///
/// ```
/// use stowage::Optional;
///
/// let mut num = Optional::new(1);
/// assert!(num.is_valid());
/// assert_eq!(1, num.unwrap());
/// assert!(!num.is_valid());
/// ```
pub struct Optional<T> {
    is_valid: bool,
    obj: AlignedMemory<T>,
}

impl<T> Optional<T> {
    /// Present value.
    #[inline]
    pub const fn new(value: T) -> Optional<T> {
        Optional {
            is_valid: true,
            obj: AlignedMemory::new(value),
        }
    }

    /// Absent value.
    #[inline]
    pub const fn none() -> Optional<T> {
        Optional {
            is_valid: false,
            obj: AlignedMemory::uninit(),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Moves the value out and marks this wrapper absent.
    ///
    /// # Panics
    ///
    /// Panics if the value is absent.
    #[track_caller]
    pub fn unwrap(&mut self) -> T {
        assert!(self.is_valid, "called `Optional::unwrap` on an absent value");
        self.is_valid = false;
        unsafe { self.obj.read() }
    }

    #[inline]
    pub fn as_ref(&self) -> Option<&T> {
        if self.is_valid {
            Some(unsafe { self.obj.get_ref() })
        } else {
            None
        }
    }

    #[inline]
    pub fn as_mut(&mut self) -> Option<&mut T> {
        if self.is_valid {
            Some(unsafe { self.obj.get_mut() })
        } else {
            None
        }
    }

    /// Transfers the value (if any) into a new wrapper, leaving this one absent.
    pub fn take(&mut self) -> Optional<T> {
        if self.is_valid {
            Optional::new(self.unwrap())
        } else {
            Optional::none()
        }
    }

    pub fn into_option(mut self) -> Option<T> {
        if self.is_valid {
            Some(self.unwrap())
        } else {
            None
        }
    }
}

impl<T> Drop for Optional<T> {
    fn drop(&mut self) {
        if self.is_valid {
            self.is_valid = false;
            unsafe { self.obj.drop_in_place() };
        }
    }
}

impl<T> Default for Optional<T> {
    fn default() -> Self {
        Optional::none()
    }
}

impl<T> From<Option<T>> for Optional<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Optional::new(value),
            None => Optional::none(),
        }
    }
}

impl<T> From<Optional<T>> for Option<T> {
    fn from(value: Optional<T>) -> Self {
        value.into_option()
    }
}

impl<T: Clone> Clone for Optional<T> {
    fn clone(&self) -> Self {
        match self.as_ref() {
            Some(value) => Optional::new(value.clone()),
            None => Optional::none(),
        }
    }
}

impl<T: PartialEq> PartialEq for Optional<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_ref() == other.as_ref()
    }
}

impl<T: Eq> Eq for Optional<T> {}

impl<T: Debug> Debug for Optional<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.as_ref() {
            Some(value) => f.debug_tuple("New").field(value).finish(),
            None => f.write_str("None"),
        }
    }
}

#[cfg(test)]
mod optional_tests {
    use super::Optional;
    use crate::dropflag::{self, Tracked};

    #[test]
    fn unwrap_consumes_once() {
        let mut num = Optional::<i32>::none();
        assert!(!num.is_valid());

        num = Optional::new(1);
        assert!(num.is_valid());
        assert_eq!(1, num.unwrap());
        assert!(!num.is_valid());
    }

    #[test]
    #[should_panic(expected = "absent")]
    fn second_unwrap_panics() {
        let mut num = Optional::new(1);
        num.unwrap();
        num.unwrap();
    }

    #[test]
    fn take_leaves_source_absent() {
        let mut num = Optional::new(1);
        let mut moved = num.take();
        assert!(!num.is_valid());
        assert!(moved.is_valid());
        assert_eq!(1, moved.unwrap());

        let mut empty = Optional::<i32>::none();
        assert!(!empty.take().is_valid());
    }

    #[test]
    fn value_dropped_exactly_once() {
        let drops = dropflag::counter();
        {
            let _present = Optional::new(Tracked::new(1, &drops));
        }
        assert_eq!(1, *drops.borrow());

        let mut present = Optional::new(Tracked::new(2, &drops));
        let value = present.unwrap();
        drop(present);
        assert_eq!(1, *drops.borrow(), "unwrapped value is not dropped by the wrapper");
        drop(value);
        assert_eq!(2, *drops.borrow());

        let mut slot = Optional::new(Tracked::new(3, &drops));
        assert!(slot.is_valid());
        slot = Optional::none();
        assert!(!slot.is_valid());
        assert_eq!(3, *drops.borrow());
    }

    #[test]
    fn conversions_and_formatting() {
        let num: Optional<i32> = Some(5).into();
        assert_eq!(Some(&5), num.as_ref());
        assert_eq!("New(5)", format!("{:?}", num));
        assert_eq!(Some(5), num.into_option());

        let none: Optional<i32> = None.into();
        assert_eq!("None", format!("{:?}", none));
        assert_eq!(None, Option::<i32>::from(none));

        assert_eq!(Optional::new(3), Optional::new(3).clone());
        assert_ne!(Optional::new(3), Optional::none());

        let mut num = Optional::new(3);
        if let Some(v) = num.as_mut() {
            *v += 1;
        }
        assert_eq!(4, num.unwrap());
    }
}
