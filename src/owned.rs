use std::any::Any;
use std::fmt::Debug;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

enum Destructor<T: ?Sized> {
    /// Pointer came from a `Box`.
    Boxed,
    Custom(Box<dyn FnOnce(NonNull<T>) + Send>),
}

/// Single-owner pointer with a pluggable destructor.
///
/// The destructor runs exactly once, when the owning handle is dropped or
/// [`reset`](Owned::reset). A handle that gave its pointer away (by
/// [`take`](Owned::take) or a successful downcast) is null and runs nothing.
///
/// ```
/// use stowage::Owned;
///
/// let mut owned = Owned::new(String::from("value"));
/// let moved = owned.take();
/// assert!(owned.is_null());
/// assert_eq!("value", moved.as_str());
/// ```
pub struct Owned<T: ?Sized> {
    ptr: Option<NonNull<T>>,
    destructor: Destructor<T>,
}

unsafe impl<T: ?Sized + Send> Send for Owned<T> {}
unsafe impl<T: ?Sized + Sync> Sync for Owned<T> {}

impl<T: ?Sized> Owned<T> {
    pub const fn null() -> Owned<T> {
        Owned {
            ptr: None,
            destructor: Destructor::Boxed,
        }
    }

    pub fn from_box(value: Box<T>) -> Owned<T> {
        Owned {
            ptr: Some(NonNull::from(Box::leak(value))),
            destructor: Destructor::Boxed,
        }
    }

    /// Takes ownership of `ptr`; `destructor` receives it when the handle is
    /// dropped or reset.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid for reads and writes until the destructor runs,
    /// and nothing else may free it.
    pub unsafe fn from_raw_with<F>(ptr: NonNull<T>, destructor: F) -> Owned<T>
        where F: FnOnce(NonNull<T>) + Send + 'static
    {
        Owned {
            ptr: Some(ptr),
            destructor: Destructor::Custom(Box::new(destructor)),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.ptr.map(|ptr| unsafe { &mut *ptr.as_ptr() })
    }

    #[inline]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.ptr
    }

    /// Moves ownership into a new handle and leaves this one null.
    pub fn take(&mut self) -> Owned<T> {
        Owned {
            ptr: self.ptr.take(),
            destructor: std::mem::replace(&mut self.destructor, Destructor::Boxed),
        }
    }

    /// Runs the destructor now and leaves the handle null.
    pub fn reset(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            match std::mem::replace(&mut self.destructor, Destructor::Boxed) {
                Destructor::Boxed => unsafe { drop(Box::from_raw(ptr.as_ptr())) },
                Destructor::Custom(destructor) => destructor(ptr),
            }
        }
    }
}

impl<T> Owned<T> {
    pub fn new(value: T) -> Owned<T> {
        Owned::from_box(Box::new(value))
    }
}

impl<T: Any> Owned<T> {
    /// Erases the pointee type. The destructor is kept.
    pub fn into_any(mut self) -> Owned<dyn Any> {
        let ptr = match self.ptr.take() {
            Some(ptr) => ptr,
            None => return Owned::null(),
        };
        let destructor: Destructor<dyn Any> = match std::mem::replace(&mut self.destructor, Destructor::Boxed) {
            Destructor::Boxed => Destructor::Boxed,
            Destructor::Custom(destructor) => {
                Destructor::Custom(Box::new(move |ptr: NonNull<dyn Any>| destructor(ptr.cast::<T>())))
            },
        };
        let ptr: NonNull<dyn Any> = ptr;
        Owned { ptr: Some(ptr), destructor }
    }
}

impl Owned<dyn Any> {
    /// Moves ownership into an `Owned<U>` if the pointee is a `U`.
    ///
    /// On a type mismatch this handle keeps its pointer and a null handle is
    /// returned.
    pub fn try_downcast<U: Any>(&mut self) -> Owned<U> {
        match self.get() {
            Some(value) if value.is::<U>() => {},
            Some(_) => {
                debug!("Owned::try_downcast: pointee is not a {}", std::any::type_name::<U>());
                return Owned::null();
            },
            None => return Owned::null(),
        }

        let mut source = self.take();
        let ptr = source.ptr.take().map(|ptr| ptr.cast::<U>());
        let destructor: Destructor<U> = match std::mem::replace(&mut source.destructor, Destructor::Boxed) {
            Destructor::Boxed => Destructor::Boxed,
            Destructor::Custom(destructor) => {
                Destructor::Custom(Box::new(move |ptr: NonNull<U>| {
                    let ptr: NonNull<dyn Any> = ptr;
                    destructor(ptr)
                }))
            },
        };
        Owned { ptr, destructor }
    }
}

impl<T: ?Sized> Drop for Owned<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized> Default for Owned<T> {
    fn default() -> Self {
        Owned::null()
    }
}

impl<T: ?Sized> Deref for Owned<T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced a null `Owned`"),
        }
    }
}

impl<T: ?Sized> DerefMut for Owned<T> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(value) => value,
            None => panic!("dereferenced a null `Owned`"),
        }
    }
}

impl<T: ?Sized> From<Box<T>> for Owned<T> {
    fn from(value: Box<T>) -> Self {
        Owned::from_box(value)
    }
}

impl<T: ?Sized + Debug> Debug for Owned<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Owned").field(&value).finish(),
            None => f.write_str("Owned(null)"),
        }
    }
}
