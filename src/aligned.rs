/**!

Raw, correctly aligned storage for exactly one value.

The cell never constructs or drops `T` on its own. Whoever owns the cell decides
when a value is written into it and when it is read back out or destroyed, and
must pair every write with exactly one of those before the next write or before
the cell itself goes away. Dropping a cell that still holds a value leaks it.

*/

use std::mem::MaybeUninit;

#[repr(transparent)]
pub struct AlignedMemory<T> {
    mem: MaybeUninit<T>,
}

impl<T> AlignedMemory<T> {
    /// Empty cell.
    #[inline(always)]
    pub const fn uninit() -> AlignedMemory<T> {
        AlignedMemory { mem: MaybeUninit::uninit() }
    }

    /// Cell that already holds `value`.
    #[inline(always)]
    pub const fn new(value: T) -> AlignedMemory<T> {
        AlignedMemory { mem: MaybeUninit::new(value) }
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.mem.as_ptr()
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.mem.as_mut_ptr()
    }

    /// Constructs `value` in place.
    ///
    /// # Safety
    ///
    /// The cell must be empty, otherwise the previous value is leaked.
    #[inline(always)]
    pub unsafe fn write(&mut self, value: T) -> &mut T {
        self.mem.write(value)
    }

    /// # Safety
    ///
    /// The cell must hold a value.
    #[inline(always)]
    pub unsafe fn get_ref(&self) -> &T {
        self.mem.assume_init_ref()
    }

    /// # Safety
    ///
    /// The cell must hold a value.
    #[inline(always)]
    pub unsafe fn get_mut(&mut self) -> &mut T {
        self.mem.assume_init_mut()
    }

    /// Moves the value out. The cell is logically empty afterwards.
    ///
    /// # Safety
    ///
    /// The cell must hold a value, and it must not be read or dropped again
    /// until something new is written.
    #[inline(always)]
    pub unsafe fn read(&self) -> T {
        self.mem.assume_init_read()
    }

    /// Destroys the value in place. The cell is logically empty afterwards.
    ///
    /// # Safety
    ///
    /// The cell must hold a value.
    #[inline(always)]
    pub unsafe fn drop_in_place(&mut self) {
        self.mem.assume_init_drop()
    }

    /// Swaps the stored value for `value` and returns the old one.
    ///
    /// # Safety
    ///
    /// The cell must hold a value.
    #[inline(always)]
    pub unsafe fn replace(&mut self, value: T) -> T {
        std::mem::replace(self.get_mut(), value)
    }
}
