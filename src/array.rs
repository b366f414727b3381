use crate::aligned::AlignedMemory;
use crate::error::ReserveError;
use crate::optional::Optional;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::ptr::NonNull;

/// Contiguous growable sequence of raw storage cells.
///
/// Cells `[0, size)` hold live values, cells `[size, capacity)` are uninitialized.
/// Appending to a full array doubles the capacity, starting from 1, so after `n`
/// pushes from empty the capacity is the smallest power of two not below `n`.
///
/// Capacity never shrinks on its own: only [`Array::clear`] and a
/// [`Array::set_capacity`] call below the current capacity release cells, and
/// they destroy any elements living in the released cells first.
///
/// ```
/// use stowage::Array;
///
/// let mut array = Array::new();
/// for i in 0..5 {
///     array.push(i);
/// }
/// assert_eq!(8, array.capacity());
/// assert_eq!(4, array.pop());
/// assert_eq!(&[0, 1, 2, 3], array.as_slice());
/// ```
pub struct Array<T> where T: Sized {
    data: NonNull<AlignedMemory<T>>,
    size: usize,
    capacity: usize,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for Array<T> {}
unsafe impl<T: Sync> Sync for Array<T> {}

impl<T> Array<T> where T: Sized {
    const IS_ZST: bool = std::mem::size_of::<T>() == 0;

    /// Empty array without any allocation.
    pub const fn new() -> Array<T> {
        Array {
            data: NonNull::dangling(),
            size: 0,
            capacity: 0,
            _marker: PhantomData,
        }
    }

    pub fn with_capacity(capacity: usize) -> Array<T> {
        let mut array = Array::new();
        array.reserve(capacity);
        array
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr() as *const T
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_ptr() as *mut T
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.size) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.as_mut_ptr(), self.size) }
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Checked access.
    #[inline]
    pub fn try_get(&self, index: usize) -> Option<&T> {
        if index >= self.size {
            return None;
        }
        Some(unsafe { self.get_unchecked(index) })
    }

    /// Checked mutable access.
    #[inline]
    pub fn try_get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.size {
            return None;
        }
        Some(unsafe { self.get_unchecked_mut(index) })
    }

    /// # Safety
    ///
    /// `index` must be below `size()`.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.size, "get_unchecked: index {} out of bounds (size {})", index, self.size);
        (*self.data.as_ptr().add(index)).get_ref()
    }

    /// # Safety
    ///
    /// `index` must be below `size()`.
    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.size, "get_unchecked_mut: index {} out of bounds (size {})", index, self.size);
        (*self.data.as_ptr().add(index)).get_mut()
    }

    /// Appends `value`, doubling the capacity when the array is full.
    pub fn push(&mut self, value: T) {
        self.ensure_not_full();
        unsafe { (*self.data.as_ptr().add(self.size)).write(value) };
        self.size += 1;
    }

    /// Appends the value produced by `make` and returns a reference to it.
    ///
    /// Storage is prepared before `make` runs, so a reallocation never moves
    /// the new value after it is built.
    pub fn emplace<F>(&mut self, make: F) -> &mut T where F: FnOnce() -> T {
        self.ensure_not_full();
        let index = self.size;
        let cell = unsafe { &mut *self.data.as_ptr().add(index) };
        let value = unsafe { cell.write(make()) };
        self.size += 1;
        value
    }

    /// Removes the last element and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the array is empty.
    #[track_caller]
    pub fn pop(&mut self) -> T {
        assert!(self.size != 0, "called `Array::pop` on an empty array");
        self.size -= 1;
        unsafe { (*self.data.as_ptr().add(self.size)).read() }
    }

    /// Removes the last element if there is one.
    pub fn try_pop(&mut self) -> Optional<T> {
        if self.size == 0 {
            Optional::none()
        } else {
            Optional::new(self.pop())
        }
    }

    pub fn last(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Destroys elements `[size, self.size)`. No-op if `size >= self.size`.
    pub fn truncate(&mut self, size: usize) {
        if size >= self.size {
            return;
        }
        let tail = std::ptr::slice_from_raw_parts_mut(unsafe { self.as_mut_ptr().add(size) }, self.size - size);
        // a panicking destructor leaks the rest of the tail instead of dropping it twice
        self.size = size;
        unsafe { std::ptr::drop_in_place(tail) };
    }

    /// Grows or shrinks to exactly `size` live elements. New elements are
    /// default-constructed, removed elements are destroyed.
    pub fn set_size(&mut self, size: usize) where T: Default {
        if size <= self.size {
            self.truncate(size);
            return;
        }
        self.reserve(size);
        while self.size < size {
            unsafe { (*self.data.as_ptr().add(self.size)).write(T::default()) };
            self.size += 1;
        }
    }

    /// Ensures `capacity() >= capacity`.
    pub fn reserve(&mut self, capacity: usize) {
        handle_reserve(self.try_reserve(capacity));
    }

    /// Ensures `capacity() >= capacity`, reporting failure instead of aborting.
    pub fn try_reserve(&mut self, capacity: usize) -> Result<(), ReserveError> {
        if capacity <= self.capacity {
            return Ok(());
        }
        self.try_set_capacity(capacity)
    }

    /// Reallocates to exactly `capacity` cells. Elements that do not fit are
    /// destroyed and the size is clamped to `capacity`.
    pub fn set_capacity(&mut self, capacity: usize) {
        handle_reserve(self.try_set_capacity(capacity));
    }

    pub fn try_set_capacity(&mut self, capacity: usize) -> Result<(), ReserveError> {
        if capacity == self.capacity {
            return Ok(());
        }

        // tail destructors run before the new buffer exists
        self.truncate(capacity);
        let data = Self::allocate(capacity)?;
        trace!("array realloc: capacity {} -> {}, size {}", self.capacity, capacity, self.size);

        unsafe {
            std::ptr::copy_nonoverlapping(self.data.as_ptr(), data.as_ptr(), self.size);
            Self::deallocate(self.data, self.capacity);
        }
        self.data = data;
        self.capacity = capacity;
        Ok(())
    }

    /// Destroys every element and releases the storage.
    pub fn clear(&mut self) {
        self.truncate(0);
        unsafe { Self::deallocate(self.data, self.capacity) };
        self.data = NonNull::dangling();
        self.capacity = 0;
    }

    /// Moves the contents out, leaving this array empty.
    pub fn take(&mut self) -> Array<T> {
        std::mem::replace(self, Array::new())
    }

    fn ensure_not_full(&mut self) {
        if self.size < self.capacity {
            return;
        }
        let capacity = if self.capacity == 0 {
            1
        } else {
            match self.capacity.checked_mul(2) {
                Some(capacity) => capacity,
                None => panic!("capacity overflow"),
            }
        };
        self.set_capacity(capacity);
    }

    fn layout(capacity: usize) -> Result<Layout, ReserveError> {
        Layout::array::<AlignedMemory<T>>(capacity).map_err(|_| ReserveError::CapacityOverflow)
    }

    fn allocate(capacity: usize) -> Result<NonNull<AlignedMemory<T>>, ReserveError> {
        let layout = Self::layout(capacity)?;
        if Self::IS_ZST || capacity == 0 {
            return Ok(NonNull::dangling());
        }
        let ptr = unsafe { alloc(layout) } as *mut AlignedMemory<T>;
        NonNull::new(ptr).ok_or(ReserveError::AllocFailed { layout })
    }

    unsafe fn deallocate(data: NonNull<AlignedMemory<T>>, capacity: usize) {
        if Self::IS_ZST || capacity == 0 {
            return;
        }
        // capacity was allocated with this layout before, so it is valid
        if let Ok(layout) = Self::layout(capacity) {
            dealloc(data.as_ptr() as *mut u8, layout);
        }
    }
}

fn handle_reserve(result: Result<(), ReserveError>) {
    match result {
        Ok(()) => (),
        Err(ReserveError::CapacityOverflow) => panic!("capacity overflow"),
        Err(ReserveError::AllocFailed { layout }) => handle_alloc_error(layout),
    }
}

impl<T> Drop for Array<T> where T: Sized {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Array::new()
    }
}

impl<T: Clone> Clone for Array<T> {
    fn clone(&self) -> Self {
        let mut array = Array::with_capacity(self.size);
        for value in self.iter() {
            array.push(value.clone());
        }
        array
    }
}

impl<T: PartialEq> PartialEq for Array<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.size != other.size {
            return false;
        }
        if self.data == other.data {
            return true;
        }
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for Array<T> {}

impl<T: Debug> Debug for Array<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Index<usize> for Array<T> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T> IndexMut<usize> for Array<T> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

impl<T> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item=T>>(iter: I) -> Self {
        let mut array = Array::new();
        array.extend(iter);
        array
    }
}

impl<T> Extend<T> for Array<T> {
    fn extend<I: IntoIterator<Item=T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.reserve(self.size.saturating_add(lower));
        for value in iter {
            self.push(value);
        }
    }
}

impl<T, const N: usize> From<[T; N]> for Array<T> {
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<T: Clone> From<&[T]> for Array<T> {
    fn from(values: &[T]) -> Self {
        values.iter().cloned().collect()
    }
}

impl<'a, T> IntoIterator for &'a Array<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut Array<T> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> IntoIterator for Array<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        let array = std::mem::ManuallyDrop::new(self);
        IntoIter {
            data: array.data,
            capacity: array.capacity,
            start: 0,
            end: array.size,
            _marker: PhantomData,
        }
    }
}

/// Owning iterator over the elements of an [`Array`].
pub struct IntoIter<T> {
    data: NonNull<AlignedMemory<T>>,
    capacity: usize,
    start: usize,
    end: usize,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for IntoIter<T> {}
unsafe impl<T: Sync> Sync for IntoIter<T> {}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        let value = unsafe { (*self.data.as_ptr().add(self.start)).read() };
        self.start += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.end - self.start;
        (len, Some(len))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        self.end -= 1;
        Some(unsafe { (*self.data.as_ptr().add(self.end)).read() })
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> Drop for IntoIter<T> {
    fn drop(&mut self) {
        let rest = std::ptr::slice_from_raw_parts_mut(
            unsafe { (self.data.as_ptr() as *mut T).add(self.start) },
            self.end - self.start,
        );
        self.start = self.end;
        unsafe {
            std::ptr::drop_in_place(rest);
            Array::<T>::deallocate(self.data, self.capacity);
        }
    }
}
