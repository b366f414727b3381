use crate::optional::Optional;
use std::fmt::Debug;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::null_mut;

struct Node<T> where T: Sized {
    val: T,
    next: *mut Node<T>,
}

impl<T> Node<T> where T: Sized {
    fn alloc(val: T, next: *mut Node<T>) -> *mut Node<T> {
        Box::into_raw(Box::new(Node { val, next }))
    }
}

/// Forward-only list with insertion and removal at the head, or after a cursor.
///
/// ```
/// use stowage::SinglyLinkedList;
///
/// let mut list = SinglyLinkedList::from([1, 2]);
/// list.push_head(0);
/// assert_eq!(vec![0, 1, 2], list.iter().copied().collect::<Vec<_>>());
/// assert_eq!(0, list.remove_head());
/// ```
pub struct SinglyLinkedList<T> where T: Sized {
    head: *mut Node<T>,
    _marker: PhantomData<Box<Node<T>>>,
}

unsafe impl<T: Send> Send for SinglyLinkedList<T> {}
unsafe impl<T: Sync> Sync for SinglyLinkedList<T> {}

impl<T> SinglyLinkedList<T> where T: Sized {
    pub const fn new() -> SinglyLinkedList<T> {
        SinglyLinkedList {
            head: null_mut(),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    pub fn head(&self) -> Option<&T> {
        if self.head.is_null() {
            None
        } else {
            Some(unsafe { &(*self.head).val })
        }
    }

    pub fn head_mut(&mut self) -> Option<&mut T> {
        if self.head.is_null() {
            None
        } else {
            Some(unsafe { &mut (*self.head).val })
        }
    }

    pub fn push_head(&mut self, value: T) {
        self.head = Node::alloc(value, self.head);
    }

    /// Constructs the new head in place and returns it.
    pub fn emplace_head<F>(&mut self, make: F) -> &mut T where F: FnOnce() -> T {
        self.push_head(make());
        unsafe { &mut (*self.head).val }
    }

    /// # Panics
    ///
    /// Panics if the list is empty.
    #[track_caller]
    pub fn remove_head(&mut self) -> T {
        assert!(!self.head.is_null(), "called `SinglyLinkedList::remove_head` on an empty list");
        unsafe { self.unlink_head() }
    }

    pub fn try_remove_head(&mut self) -> Optional<T> {
        if self.head.is_null() {
            Optional::none()
        } else {
            Optional::new(unsafe { self.unlink_head() })
        }
    }

    unsafe fn unlink_head(&mut self) -> T {
        let node = Box::from_raw(self.head);
        self.head = node.next;
        node.val
    }

    /// Moves the whole chain into a new list, leaving this one empty.
    pub fn take(&mut self) -> SinglyLinkedList<T> {
        let head = std::mem::replace(&mut self.head, null_mut());
        SinglyLinkedList { head, _marker: PhantomData }
    }

    /// Destroys every node, one at a time.
    pub fn clear(&mut self) {
        let mut iter = std::mem::replace(&mut self.head, null_mut());
        while !iter.is_null() {
            let node = unsafe { Box::from_raw(iter) };
            iter = node.next;
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter { current: self.head, _marker: PhantomData }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut { current: self.head, _marker: PhantomData }
    }

    /// Cursor at the head node.
    ///
    /// The cursor may also sit before the head (on an empty list, or after
    /// stepping past the last node). From there `insert_after` and
    /// `remove_after` work on the head itself.
    pub fn cursor_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut { here: self.head, list: self }
    }

    /// Builds a list in iteration order by appending at a moving tail.
    fn from_ordered<I: IntoIterator<Item=T>>(iter: I) -> SinglyLinkedList<T> {
        let mut list = SinglyLinkedList::new();
        let mut tail: *mut *mut Node<T> = &mut list.head;
        for value in iter {
            unsafe {
                let node = Node::alloc(value, null_mut());
                *tail = node;
                tail = &mut (*node).next;
            }
        }
        list
    }
}

impl<T> Drop for SinglyLinkedList<T> where T: Sized {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Default for SinglyLinkedList<T> where T: Sized {
    fn default() -> Self {
        SinglyLinkedList::new()
    }
}

impl<T> Clone for SinglyLinkedList<T> where T: Clone {
    fn clone(&self) -> Self {
        SinglyLinkedList::from_ordered(self.iter().cloned())
    }
}

impl<T> PartialEq for SinglyLinkedList<T> where T: PartialEq {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<T> Eq for SinglyLinkedList<T> where T: Eq {}

impl<T> Debug for SinglyLinkedList<T> where T: Debug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for SinglyLinkedList<T> where T: Sized {
    /// Keeps iteration order: the first item becomes the head.
    fn from_iter<I: IntoIterator<Item=T>>(iter: I) -> Self {
        SinglyLinkedList::from_ordered(iter)
    }
}

impl<T, const N: usize> From<[T; N]> for SinglyLinkedList<T> where T: Sized {
    fn from(values: [T; N]) -> Self {
        SinglyLinkedList::from_ordered(values)
    }
}

impl<'a, T> IntoIterator for &'a SinglyLinkedList<T> where T: Sized {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut SinglyLinkedList<T> where T: Sized {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> IntoIterator for SinglyLinkedList<T> where T: Sized {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { list: self }
    }
}

pub struct Iter<'a, T> {
    current: *const Node<T>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Clone for Iter<'a, T> {
    fn clone(&self) -> Self {
        Iter { current: self.current, _marker: PhantomData }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.current.is_null() {
            return None;
        }
        unsafe {
            let node = &*self.current;
            self.current = node.next;
            Some(&node.val)
        }
    }
}

impl<'a, T> FusedIterator for Iter<'a, T> {}

unsafe impl<'a, T: Sync> Send for Iter<'a, T> {}
unsafe impl<'a, T: Sync> Sync for Iter<'a, T> {}

pub struct IterMut<'a, T> {
    current: *mut Node<T>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.current.is_null() {
            return None;
        }
        unsafe {
            let node = &mut *self.current;
            self.current = node.next;
            Some(&mut node.val)
        }
    }
}

impl<'a, T> FusedIterator for IterMut<'a, T> {}

unsafe impl<'a, T: Send> Send for IterMut<'a, T> {}
unsafe impl<'a, T: Sync> Sync for IterMut<'a, T> {}

pub struct IntoIter<T> where T: Sized {
    list: SinglyLinkedList<T>,
}

impl<T> Iterator for IntoIter<T> where T: Sized {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.list.try_remove_head().into_option()
    }
}

/// Position in a list, used to insert and remove after it.
pub struct CursorMut<'a, T> where T: Sized {
    here: *mut Node<T>,
    list: &'a mut SinglyLinkedList<T>,
}

impl<'a, T> CursorMut<'a, T> where T: Sized {
    /// The value here, `None` before the head.
    pub fn get(&mut self) -> Option<&mut T> {
        if self.here.is_null() {
            None
        } else {
            Some(unsafe { &mut (*self.here).val })
        }
    }

    /// Steps to the next node. From the last node the cursor goes before the
    /// head; from there it goes to the head.
    pub fn move_next(&mut self) {
        self.here = if self.here.is_null() {
            self.list.head
        } else {
            unsafe { (*self.here).next }
        };
    }

    pub fn insert_after(&mut self, value: T) {
        if self.here.is_null() {
            self.list.push_head(value);
        } else {
            unsafe {
                (*self.here).next = Node::alloc(value, (*self.here).next);
            }
        }
    }

    /// Unlinks the node after this one and returns its value. The rest of the
    /// chain stays attached.
    ///
    /// # Panics
    ///
    /// Panics if there is no next node.
    #[track_caller]
    pub fn remove_after(&mut self) -> T {
        let mut removed = self.try_remove_after();
        assert!(removed.is_valid(), "called `CursorMut::remove_after` with no next node");
        removed.unwrap()
    }

    pub fn try_remove_after(&mut self) -> Optional<T> {
        unsafe {
            let link: *mut *mut Node<T> = if self.here.is_null() {
                &mut self.list.head
            } else {
                &mut (*self.here).next
            };
            if (*link).is_null() {
                return Optional::none();
            }
            let node = Box::from_raw(*link);
            *link = node.next;
            Optional::new(node.val)
        }
    }
}
