//! Red-black tree backing the ordered containers.
//!
//! Every absent edge points at a per-tree sentinel node instead of null. The
//! sentinel is black, links to itself and never holds a value, so rotations and
//! fix-up passes can read the color or the links of a missing child without
//! branching. Its parent link is scratch space: removal writes the parent of
//! the spliced node there so the delete fix-up can climb from an empty position.
//!
//! Nodes are boxed individually and never move. Rotations only relink them, so
//! a node keeps its address from insertion until it is removed.

use crate::aligned::AlignedMemory;
use crate::array::Array;
use crate::optional::Optional;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::null_mut;

type Link<T> = *mut Node<T>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

struct Node<T> {
    val: AlignedMemory<T>,
    parent: Link<T>,
    left: Link<T>,
    right: Link<T>,
    color: Color,
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Unique {}
    impl Sealed for super::Duplicates {}
}

/// Compile-time switch between the two insertion policies of [`RBTree`].
pub trait DuplicatePolicy: sealed::Sealed {
    const ALLOW_DUPLICATES: bool;

    /// What `insert` returns: the replaced value for [`Unique`], nothing for [`Duplicates`].
    type InsertResult<T>;

    #[doc(hidden)]
    fn inserted<T>() -> Self::InsertResult<T>;

    #[doc(hidden)]
    fn replaced<T>(previous: T) -> Self::InsertResult<T>;

    #[doc(hidden)]
    fn map_result<T, U, F>(result: Self::InsertResult<T>, f: F) -> Self::InsertResult<U>
        where F: FnOnce(T) -> U;
}

/// Equal keys are rejected: inserting one replaces the stored value.
pub enum Unique {}

/// Equal keys are kept side by side, in insertion order.
pub enum Duplicates {}

impl DuplicatePolicy for Unique {
    const ALLOW_DUPLICATES: bool = false;

    type InsertResult<T> = Optional<T>;

    #[inline(always)]
    fn inserted<T>() -> Optional<T> {
        Optional::none()
    }

    #[inline(always)]
    fn replaced<T>(previous: T) -> Optional<T> {
        Optional::new(previous)
    }

    fn map_result<T, U, F>(mut result: Optional<T>, f: F) -> Optional<U>
        where F: FnOnce(T) -> U
    {
        if result.is_valid() {
            Optional::new(f(result.unwrap()))
        } else {
            Optional::none()
        }
    }
}

impl DuplicatePolicy for Duplicates {
    const ALLOW_DUPLICATES: bool = true;

    type InsertResult<T> = ();

    #[inline(always)]
    fn inserted<T>() {}

    fn replaced<T>(_previous: T) {
        unreachable!("duplicate-allowing tree never replaces")
    }

    #[inline(always)]
    fn map_result<T, U, F>(_result: (), _f: F) where F: FnOnce(T) -> U {}
}

/// Ordered collection over a red-black tree.
///
/// `D` selects what happens on an equal key: [`Duplicates`] (the default) keeps
/// both, [`Unique`] replaces the stored value and hands the old one back.
/// Use the [`Set`] and [`MultiSet`] aliases.
///
/// ```
/// use stowage::Set;
///
/// let mut set: Set<i32> = [5, 3, 8, 1, 4].into();
/// assert_eq!(vec![1, 3, 4, 5, 8], set.iter().copied().collect::<Vec<_>>());
///
/// assert_eq!(3, set.remove(&3).unwrap());
/// assert_eq!(4, set.size());
/// assert_eq!(0, set.count(&3));
/// ```
pub struct RBTree<T, D: DuplicatePolicy = Duplicates> {
    root: Link<T>,
    null: Link<T>,
    size: usize,
    _marker: PhantomData<(Box<Node<T>>, D)>,
}

/// Ordered set, equal values replace each other.
pub type Set<T> = RBTree<T, Unique>;

/// Ordered multiset, equal values are all kept.
pub type MultiSet<T> = RBTree<T, Duplicates>;

unsafe impl<T: Send, D: DuplicatePolicy> Send for RBTree<T, D> {}
unsafe impl<T: Sync, D: DuplicatePolicy> Sync for RBTree<T, D> {}

unsafe fn successor<T>(mut node: Link<T>, null: Link<T>) -> Link<T> {
    if node == null {
        return null;
    }
    if (*node).right != null {
        node = (*node).right;
        while (*node).left != null {
            node = (*node).left;
        }
        return node;
    }
    let mut parent = (*node).parent;
    while parent != null && node == (*parent).right {
        node = parent;
        parent = (*parent).parent;
    }
    parent
}

unsafe fn predecessor<T>(mut node: Link<T>, null: Link<T>) -> Link<T> {
    if node == null {
        return null;
    }
    if (*node).left != null {
        node = (*node).left;
        while (*node).right != null {
            node = (*node).right;
        }
        return node;
    }
    let mut parent = (*node).parent;
    while parent != null && node == (*parent).left {
        node = parent;
        parent = (*parent).parent;
    }
    parent
}

impl<T, D: DuplicatePolicy> RBTree<T, D> {
    pub fn new() -> RBTree<T, D> {
        let null = Box::into_raw(Box::new(Node {
            val: AlignedMemory::uninit(),
            parent: null_mut(),
            left: null_mut(),
            right: null_mut(),
            color: Color::Black,
        }));
        unsafe {
            (*null).parent = null;
            (*null).left = null;
            (*null).right = null;
        }
        RBTree {
            root: null,
            null,
            size: 0,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn first(&self) -> Option<&T> {
        if self.root == self.null {
            return None;
        }
        Some(unsafe { (*self.minimum(self.root)).val.get_ref() })
    }

    pub fn last(&self) -> Option<&T> {
        if self.root == self.null {
            return None;
        }
        Some(unsafe { (*self.maximum(self.root)).val.get_ref() })
    }

    /// Removes and returns the smallest value.
    pub fn pop_first(&mut self) -> Optional<T> {
        if self.root == self.null {
            return Optional::none();
        }
        unsafe {
            let node = self.minimum(self.root);
            Optional::new(self.remove_node(node))
        }
    }

    /// Removes and returns the largest value.
    pub fn pop_last(&mut self) -> Optional<T> {
        if self.root == self.null {
            return Optional::none();
        }
        unsafe {
            let node = self.maximum(self.root);
            Optional::new(self.remove_node(node))
        }
    }

    /// Destroys every value. Walks the tree with an explicit stack, so the
    /// native stack depth does not depend on the tree height.
    pub fn clear(&mut self) {
        if self.root == self.null {
            return;
        }
        trace!("rbtree clear: {} nodes", self.size);

        let mut stack: Array<Link<T>> = Array::new();
        stack.push(self.root);
        while let Some(node) = stack.try_pop().into_option() {
            unsafe {
                if (*node).left != self.null {
                    stack.push((*node).left);
                }
                if (*node).right != self.null {
                    stack.push((*node).right);
                }
                (*node).val.drop_in_place();
                Self::free_node(node);
            }
        }
        self.root = self.null;
        self.size = 0;
    }

    /// In-order iterator.
    pub fn iter(&self) -> Iter<'_, T> {
        let (front, back) = if self.root == self.null {
            (self.null, self.null)
        } else {
            unsafe { (self.minimum(self.root), self.maximum(self.root)) }
        };
        Iter {
            front,
            back,
            remaining: self.size,
            null: self.null,
            _marker: PhantomData,
        }
    }

    /// Cursor at the smallest value, or at the end of an empty tree.
    pub fn begin(&self) -> Cursor<'_, T, D> {
        let here = if self.root == self.null {
            self.null
        } else {
            unsafe { self.minimum(self.root) }
        };
        Cursor { here, tree: self }
    }

    /// Past-the-end cursor. It holds no value.
    pub fn end(&self) -> Cursor<'_, T, D> {
        Cursor { here: self.null, tree: self }
    }

    pub fn begin_mut(&mut self) -> CursorMut<'_, T, D> {
        let here = if self.root == self.null {
            self.null
        } else {
            unsafe { self.minimum(self.root) }
        };
        CursorMut { here, tree: self }
    }

    fn alloc_node(&self, value: T) -> Link<T> {
        Box::into_raw(Box::new(Node {
            val: AlignedMemory::new(value),
            parent: self.null,
            left: self.null,
            right: self.null,
            color: Color::Red,
        }))
    }

    /// Releases node memory. The value must already be moved out or destroyed.
    unsafe fn free_node(node: Link<T>) {
        drop(Box::from_raw(node));
    }

    unsafe fn minimum(&self, mut node: Link<T>) -> Link<T> {
        while (*node).left != self.null {
            node = (*node).left;
        }
        node
    }

    unsafe fn maximum(&self, mut node: Link<T>) -> Link<T> {
        while (*node).right != self.null {
            node = (*node).right;
        }
        node
    }

    unsafe fn rotate_left(&mut self, node: Link<T>) {
        let right = (*node).right;
        debug_assert!(right != self.null, "rotate_left: missing right child");

        (*node).right = (*right).left;
        if (*right).left != self.null {
            (*(*right).left).parent = node;
        }

        let parent = (*node).parent;
        (*right).parent = parent;
        if parent == self.null {
            self.root = right;
        } else if node == (*parent).left {
            (*parent).left = right;
        } else {
            (*parent).right = right;
        }
        (*right).left = node;
        (*node).parent = right;
    }

    unsafe fn rotate_right(&mut self, node: Link<T>) {
        let left = (*node).left;
        debug_assert!(left != self.null, "rotate_right: missing left child");

        (*node).left = (*left).right;
        if (*left).right != self.null {
            (*(*left).right).parent = node;
        }

        let parent = (*node).parent;
        (*left).parent = parent;
        if parent == self.null {
            self.root = left;
        } else if node == (*parent).right {
            (*parent).right = left;
        } else {
            (*parent).left = left;
        }
        (*left).right = node;
        (*node).parent = left;
    }

    unsafe fn insert_fixup(&mut self, mut node: Link<T>) {
        while (*(*node).parent).color == Color::Red {
            let mut parent = (*node).parent;
            let grand = (*parent).parent;

            if parent == (*grand).left {
                let uncle = (*grand).right;
                if (*uncle).color == Color::Red {
                    (*parent).color = Color::Black;
                    (*uncle).color = Color::Black;
                    (*grand).color = Color::Red;
                    node = grand;
                    continue;
                }
                if node == (*parent).right {
                    self.rotate_left(parent);
                    parent = node;
                }
                self.rotate_right(grand);
            } else {
                let uncle = (*grand).left;
                if (*uncle).color == Color::Red {
                    (*parent).color = Color::Black;
                    (*uncle).color = Color::Black;
                    (*grand).color = Color::Red;
                    node = grand;
                    continue;
                }
                if node == (*parent).left {
                    self.rotate_right(parent);
                    parent = node;
                }
                self.rotate_left(grand);
            }
            (*parent).color = Color::Black;
            (*grand).color = Color::Red;
            break;
        }
        (*self.root).color = Color::Black;
    }

    /// Unlinks `node`, frees one tree node and returns the value `node` held.
    ///
    /// A node with two children takes over its in-order successor's value and
    /// the successor node is spliced out instead.
    unsafe fn remove_node(&mut self, node: Link<T>) -> T {
        debug_assert!(node != self.null, "remove_node: sentinel");
        let removed = (*node).val.read();
        self.size -= 1;

        let mut target = node;
        if (*node).left != self.null && (*node).right != self.null {
            let next = self.minimum((*node).right);
            (*node).val.write((*next).val.read());
            target = next;
        }

        let child = if (*target).left != self.null { (*target).left } else { (*target).right };
        let parent = (*target).parent;
        (*child).parent = parent;
        if parent == self.null {
            self.root = child;
        } else if target == (*parent).left {
            (*parent).left = child;
        } else {
            (*parent).right = child;
        }

        if (*target).color == Color::Black {
            self.remove_fixup(child);
        }
        Self::free_node(target);
        removed
    }

    /// Restores the black height after a black node was spliced out above `node`.
    unsafe fn remove_fixup(&mut self, mut node: Link<T>) {
        while node != self.root && (*node).color == Color::Black {
            let parent = (*node).parent;
            if node == (*parent).left {
                let mut sibling = (*parent).right;
                if (*sibling).color == Color::Red {
                    (*sibling).color = Color::Black;
                    (*parent).color = Color::Red;
                    self.rotate_left(parent);
                    sibling = (*parent).right;
                }
                if (*(*sibling).left).color == Color::Black && (*(*sibling).right).color == Color::Black {
                    // no local fix, push the missing black one level up
                    (*sibling).color = Color::Red;
                    node = parent;
                    continue;
                }
                if (*(*sibling).right).color == Color::Black {
                    (*(*sibling).left).color = Color::Black;
                    (*sibling).color = Color::Red;
                    self.rotate_right(sibling);
                    sibling = (*parent).right;
                }
                (*sibling).color = (*parent).color;
                (*parent).color = Color::Black;
                (*(*sibling).right).color = Color::Black;
                self.rotate_left(parent);
            } else {
                let mut sibling = (*parent).left;
                if (*sibling).color == Color::Red {
                    (*sibling).color = Color::Black;
                    (*parent).color = Color::Red;
                    self.rotate_right(parent);
                    sibling = (*parent).left;
                }
                if (*(*sibling).right).color == Color::Black && (*(*sibling).left).color == Color::Black {
                    (*sibling).color = Color::Red;
                    node = parent;
                    continue;
                }
                if (*(*sibling).left).color == Color::Black {
                    (*(*sibling).right).color = Color::Black;
                    (*sibling).color = Color::Red;
                    self.rotate_left(sibling);
                    sibling = (*parent).left;
                }
                (*sibling).color = (*parent).color;
                (*parent).color = Color::Black;
                (*(*sibling).left).color = Color::Black;
                self.rotate_right(parent);
            }
            node = self.root;
        }
        (*node).color = Color::Black;
    }

    unsafe fn find_node<Q>(&self, probe: &Q) -> Link<T> where T: Borrow<Q>, Q: Ord + ?Sized {
        let mut iter = self.root;
        while iter != self.null {
            match probe.cmp((*iter).val.get_ref().borrow()) {
                Ordering::Equal => return iter,
                Ordering::Less => iter = (*iter).left,
                Ordering::Greater => iter = (*iter).right,
            }
        }
        self.null
    }
}

impl<T: Ord, D: DuplicatePolicy> RBTree<T, D> {
    /// Adds `value`.
    ///
    /// With [`Unique`], an equal stored value is replaced in place and returned;
    /// the tree shape does not change. With [`Duplicates`], equal values go after
    /// the ones already stored.
    pub fn insert(&mut self, value: T) -> D::InsertResult<T> {
        let mut parent = self.null;
        let mut iter = self.root;
        let mut go_left = false;
        unsafe {
            while iter != self.null {
                parent = iter;
                match value.cmp((*iter).val.get_ref()) {
                    Ordering::Less => {
                        go_left = true;
                        iter = (*iter).left;
                    },
                    Ordering::Equal if !D::ALLOW_DUPLICATES => {
                        let previous = (*iter).val.replace(value);
                        return D::replaced(previous);
                    },
                    _ => {
                        go_left = false;
                        iter = (*iter).right;
                    },
                }
            }

            let node = self.alloc_node(value);
            self.size += 1;
            (*node).parent = parent;
            if parent == self.null {
                (*node).color = Color::Black;
                self.root = node;
                return D::inserted();
            }
            if go_left {
                (*parent).left = node;
            } else {
                (*parent).right = node;
            }
            self.insert_fixup(node);
        }
        D::inserted()
    }

    /// Cursor at a value equal to `probe`, or [`RBTree::end`] if there is none.
    ///
    /// The probe can be any type the stored values borrow as, so a map can be
    /// searched by key alone.
    pub fn try_find<Q>(&self, probe: &Q) -> Cursor<'_, T, D> where T: Borrow<Q>, Q: Ord + ?Sized {
        Cursor {
            here: unsafe { self.find_node(probe) },
            tree: self,
        }
    }

    pub fn get<Q>(&self, probe: &Q) -> Option<&T> where T: Borrow<Q>, Q: Ord + ?Sized {
        self.try_find(probe).get()
    }

    pub fn contains<Q>(&self, probe: &Q) -> bool where T: Borrow<Q>, Q: Ord + ?Sized {
        !self.try_find(probe).is_end()
    }

    /// Number of stored values equal to `probe`.
    pub fn count<Q>(&self, probe: &Q) -> usize where T: Borrow<Q>, Q: Ord + ?Sized {
        unsafe {
            let found = self.find_node(probe);
            if found == self.null {
                return 0;
            }
            if !D::ALLOW_DUPLICATES {
                return 1;
            }

            let equal = |node: Link<T>| node != self.null && probe.cmp((*node).val.get_ref().borrow()) == Ordering::Equal;
            let mut count = 1;
            let mut iter = successor(found, self.null);
            while equal(iter) {
                count += 1;
                iter = successor(iter, self.null);
            }
            iter = predecessor(found, self.null);
            while equal(iter) {
                count += 1;
                iter = predecessor(iter, self.null);
            }
            count
        }
    }

    /// Removes one value equal to `probe`.
    pub fn remove<Q>(&mut self, probe: &Q) -> Optional<T> where T: Borrow<Q>, Q: Ord + ?Sized {
        unsafe {
            let node = self.find_node(probe);
            if node == self.null {
                return Optional::none();
            }
            Optional::new(self.remove_node(node))
        }
    }

    /// Mutable cursor at a value equal to `probe`, or at the end.
    pub fn cursor_mut<Q>(&mut self, probe: &Q) -> CursorMut<'_, T, D> where T: Borrow<Q>, Q: Ord + ?Sized {
        let here = unsafe { self.find_node(probe) };
        CursorMut { here, tree: self }
    }

    /// Mutable access to a stored value. The caller must not change how the
    /// value orders against the others.
    pub(crate) fn find_mut<Q>(&mut self, probe: &Q) -> Option<&mut T> where T: Borrow<Q>, Q: Ord + ?Sized {
        unsafe {
            let node = self.find_node(probe);
            if node == self.null {
                None
            } else {
                Some((*node).val.get_mut())
            }
        }
    }

    /// Asserts every red-black invariant, the parent links and the ordering.
    #[cfg(test)]
    pub(crate) fn validate(&self) {
        unsafe {
            assert_eq!(Color::Black, (*self.null).color, "sentinel is black");
            assert_eq!(self.null, (*self.null).left, "sentinel links to itself");
            assert_eq!(self.null, (*self.null).right, "sentinel links to itself");
            if self.root == self.null {
                assert_eq!(0, self.size);
                return;
            }
            assert_eq!(Color::Black, (*self.root).color, "root is black");
            assert_eq!(self.null, (*self.root).parent, "root has no parent");

            let mut count = 0;
            self.black_height(self.root, &mut count);
            assert_eq!(self.size, count, "size matches node count");
        }

        let values: Vec<&T> = self.iter().collect();
        assert_eq!(self.size, values.len());
        for pair in values.windows(2) {
            if D::ALLOW_DUPLICATES {
                assert!(pair[0] <= pair[1], "in-order traversal is sorted");
            } else {
                assert!(pair[0] < pair[1], "in-order traversal is strictly sorted");
            }
        }
    }

    #[cfg(test)]
    unsafe fn black_height(&self, node: Link<T>, count: &mut usize) -> usize {
        if node == self.null {
            return 1;
        }
        *count += 1;
        let left = (*node).left;
        let right = (*node).right;
        if left != self.null {
            assert_eq!(node, (*left).parent, "left child links back");
        }
        if right != self.null {
            assert_eq!(node, (*right).parent, "right child links back");
        }
        if (*node).color == Color::Red {
            assert_eq!(Color::Black, (*left).color, "red node with red child");
            assert_eq!(Color::Black, (*right).color, "red node with red child");
        }
        let left_height = self.black_height(left, count);
        let right_height = self.black_height(right, count);
        assert_eq!(left_height, right_height, "black height differs");
        left_height + if (*node).color == Color::Black { 1 } else { 0 }
    }
}

impl<T, D: DuplicatePolicy> Drop for RBTree<T, D> {
    fn drop(&mut self) {
        self.clear();
        unsafe { Self::free_node(self.null) };
    }
}

impl<T, D: DuplicatePolicy> Default for RBTree<T, D> {
    fn default() -> Self {
        RBTree::new()
    }
}

impl<T: Ord + Clone, D: DuplicatePolicy> Clone for RBTree<T, D> {
    fn clone(&self) -> Self {
        let mut tree = RBTree::new();
        for value in self.iter() {
            let _ = tree.insert(value.clone());
        }
        tree
    }
}

impl<T: PartialEq, D: DuplicatePolicy> PartialEq for RBTree<T, D> {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.iter().eq(other.iter())
    }
}

impl<T: Eq, D: DuplicatePolicy> Eq for RBTree<T, D> {}

impl<T: Debug, D: DuplicatePolicy> Debug for RBTree<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Ord, D: DuplicatePolicy> FromIterator<T> for RBTree<T, D> {
    fn from_iter<I: IntoIterator<Item=T>>(iter: I) -> Self {
        let mut tree = RBTree::new();
        tree.extend(iter);
        tree
    }
}

impl<T: Ord, D: DuplicatePolicy> Extend<T> for RBTree<T, D> {
    fn extend<I: IntoIterator<Item=T>>(&mut self, iter: I) {
        for value in iter {
            let _ = self.insert(value);
        }
    }
}

impl<T: Ord, D: DuplicatePolicy, const N: usize> From<[T; N]> for RBTree<T, D> {
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<'a, T, D: DuplicatePolicy> IntoIterator for &'a RBTree<T, D> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, D: DuplicatePolicy> IntoIterator for RBTree<T, D> {
    type Item = T;
    type IntoIter = IntoIter<T, D>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { tree: self }
    }
}

/// In-order iterator over a tree.
pub struct Iter<'a, T> {
    front: Link<T>,
    back: Link<T>,
    remaining: usize,
    null: Link<T>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Clone for Iter<'a, T> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        unsafe {
            let node = self.front;
            self.front = successor(node, self.null);
            Some((*node).val.get_ref())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        unsafe {
            let node = self.back;
            self.back = predecessor(node, self.null);
            Some((*node).val.get_ref())
        }
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

impl<'a, T> FusedIterator for Iter<'a, T> {}

unsafe impl<'a, T: Sync> Send for Iter<'a, T> {}
unsafe impl<'a, T: Sync> Sync for Iter<'a, T> {}

/// Owning in-order iterator.
pub struct IntoIter<T, D: DuplicatePolicy = Duplicates> {
    tree: RBTree<T, D>,
}

impl<T, D: DuplicatePolicy> Iterator for IntoIter<T, D> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.tree.pop_first().into_option()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.size, Some(self.tree.size))
    }
}

impl<T, D: DuplicatePolicy> DoubleEndedIterator for IntoIter<T, D> {
    fn next_back(&mut self) -> Option<T> {
        self.tree.pop_last().into_option()
    }
}

impl<T, D: DuplicatePolicy> ExactSizeIterator for IntoIter<T, D> {}

/// Position in a tree: a value or the end.
///
/// Moving forward from the last value, or backward from the first, reaches the
/// end; moving in either direction from the end stays there.
pub struct Cursor<'a, T, D: DuplicatePolicy = Duplicates> {
    here: Link<T>,
    tree: &'a RBTree<T, D>,
}

impl<'a, T, D: DuplicatePolicy> Clone for Cursor<'a, T, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T, D: DuplicatePolicy> Copy for Cursor<'a, T, D> {}

impl<'a, T, D: DuplicatePolicy> Cursor<'a, T, D> {
    /// The value here, `None` at the end.
    #[inline]
    pub fn get(&self) -> Option<&'a T> {
        if self.here == self.tree.null {
            None
        } else {
            Some(unsafe { (*self.here).val.get_ref() })
        }
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.here == self.tree.null
    }

    pub fn move_next(&mut self) {
        self.here = unsafe { successor(self.here, self.tree.null) };
    }

    pub fn move_prev(&mut self) {
        self.here = unsafe { predecessor(self.here, self.tree.null) };
    }
}

impl<'a, T, D: DuplicatePolicy> PartialEq for Cursor<'a, T, D> {
    fn eq(&self, other: &Self) -> bool {
        self.here == other.here && std::ptr::eq(self.tree, other.tree)
    }
}

impl<'a, T, D: DuplicatePolicy> Eq for Cursor<'a, T, D> {}

impl<'a, T: Debug, D: DuplicatePolicy> Debug for Cursor<'a, T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Cursor").field(&self.get()).finish()
    }
}

/// Position in a tree that can remove the value it points at.
pub struct CursorMut<'a, T, D: DuplicatePolicy = Duplicates> {
    here: Link<T>,
    tree: &'a mut RBTree<T, D>,
}

impl<'a, T, D: DuplicatePolicy> CursorMut<'a, T, D> {
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.here == self.tree.null {
            None
        } else {
            Some(unsafe { (*self.here).val.get_ref() })
        }
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.here == self.tree.null
    }

    pub fn move_next(&mut self) {
        self.here = unsafe { successor(self.here, self.tree.null) };
    }

    pub fn move_prev(&mut self) {
        self.here = unsafe { predecessor(self.here, self.tree.null) };
    }

    /// Removes the value here and moves to the next one. At the end this does
    /// nothing and returns an absent value.
    pub fn remove_current(&mut self) -> Optional<T> {
        let null = self.tree.null;
        if self.here == null {
            return Optional::none();
        }
        unsafe {
            // a node with two children keeps its place and receives the successor's value
            let next = if (*self.here).left != null && (*self.here).right != null {
                self.here
            } else {
                successor(self.here, null)
            };
            let removed = self.tree.remove_node(self.here);
            self.here = next;
            Optional::new(removed)
        }
    }

    pub fn as_cursor(&self) -> Cursor<'_, T, D> {
        Cursor { here: self.here, tree: &*self.tree }
    }
}

#[cfg(test)]
mod rbtree_tests {
    use crate::{Array, MultiSet, Set};
    use crate::dropflag::{self, Tracked};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;
    use std::cmp::Ordering;
    use std::collections::{BTreeMap, BTreeSet};

    #[test]
    fn construct_empty() {
        let set = Set::<i32>::new();
        let multi_set = MultiSet::<i32>::new();
        assert!(set.is_empty());
        assert!(multi_set.is_empty());
        assert_eq!(None, set.first());
        assert_eq!(set.begin(), set.end());
        set.validate();
    }

    #[test]
    fn set_insert_replaces_equal() {
        let mut set = Set::new();
        let val_none = set.insert(0);
        set.insert(1);
        let mut val_some = set.insert(0);
        assert_eq!(2, set.size());
        assert!(!val_none.is_valid());
        assert_eq!(0, val_some.unwrap());
        assert_eq!(1, set.count(&0));
        assert_eq!(1, set.count(&1));
        assert_eq!(0, set.count(&2));
        set.validate();
    }

    #[test]
    fn multi_set_insert_keeps_equal() {
        let mut multi_set = MultiSet::new();
        multi_set.insert(0);
        multi_set.insert(1);
        multi_set.insert(0);
        assert_eq!(3, multi_set.size());
        assert_eq!(2, multi_set.count(&0));
        assert_eq!(1, multi_set.count(&1));
        assert_eq!(0, multi_set.count(&2));
        multi_set.validate();
    }

    #[test]
    fn remove() {
        let mut set: Set<i32> = [0, 1, 0, 2].into();
        assert_eq!(3, set.size());
        assert_eq!(0, set.remove(&0).unwrap());
        assert_eq!(0, set.count(&0));
        assert_eq!(2, set.size());
        assert!(!set.remove(&-1).is_valid());
        set.validate();

        let mut multi_set: MultiSet<i32> = [0, 1, 0, 2].into();
        assert_eq!(4, multi_set.size());
        assert_eq!(2, multi_set.count(&0));
        assert_eq!(0, multi_set.remove(&0).unwrap());
        assert_eq!(1, multi_set.count(&0));
        assert_eq!(3, multi_set.size());
        assert!(!multi_set.remove(&-1).is_valid());
        multi_set.validate();
    }

    fn assert_send_sync<T: Send + Sync>(_: &T) {}

    #[test]
    fn iterators_cross_threads() {
        let set: Set<i32> = [2, 1, 3].into();
        assert_send_sync(&set.iter());
        let iter = set.iter();
        let sum = std::thread::scope(|scope| scope.spawn(move || iter.sum::<i32>()).join().unwrap());
        assert_eq!(6, sum);
    }

    #[test]
    fn iterate_in_order() {
        let set: Set<i32> = [0, 3, 2, 1, 5, 4].into();
        let expected = Array::from([0, 1, 2, 3, 4, 5]);
        let mut actual = Array::new();
        for num in &set {
            actual.push(*num);
        }
        assert_eq!(expected, actual);
        assert_eq!(vec![5, 4, 3, 2, 1, 0], set.iter().rev().copied().collect::<Vec<_>>());
        assert_eq!(6, set.iter().len());
    }

    #[test]
    fn remove_boundary() {
        let mut set: Set<i32> = [0].into();
        let removed = set.remove(&0).unwrap();
        let remove_again = set.remove(&0);
        assert_eq!(0, set.size());
        assert_eq!(0, removed);
        assert!(!remove_again.is_valid());
        set.validate();
    }

    #[test]
    fn remove_scenario() {
        let mut set: Set<i32> = [5, 3, 8, 1, 4].into();
        assert_eq!(vec![1, 3, 4, 5, 8], set.iter().copied().collect::<Vec<_>>());
        let mut removed = set.remove(&3);
        assert!(removed.is_valid());
        assert_eq!(3, removed.unwrap());
        assert_eq!(4, set.size());
        assert_eq!(0, set.count(&3));
        assert_eq!(vec![1, 4, 5, 8], set.iter().copied().collect::<Vec<_>>());
        set.validate();
    }

    #[test]
    fn cursor_navigation() {
        let set: Set<i32> = [10, 20, 30].into();
        let mut cursor = set.begin();
        assert_eq!(Some(&10), cursor.get());
        cursor.move_prev();
        assert!(cursor.is_end());
        assert_eq!(set.end(), cursor);
        cursor.move_next();
        assert!(cursor.is_end(), "end is sticky");

        let mut cursor = set.try_find(&20);
        assert_eq!(Some(&20), cursor.get());
        cursor.move_next();
        assert_eq!(Some(&30), cursor.get());
        cursor.move_next();
        assert_eq!(None, cursor.get());

        let mut cursor = set.try_find(&30);
        cursor.move_prev();
        cursor.move_prev();
        assert_eq!(set.begin(), cursor);
        assert!(set.try_find(&25).is_end());
        assert!(set.contains(&10));
        assert_eq!(Some(&30), set.get(&30));
    }

    #[test]
    fn cursor_mut_removes_and_advances() {
        let mut set: Set<i32> = (0..100).collect();
        let mut cursor = set.begin_mut();
        while let Some(&value) = cursor.get() {
            if value % 2 == 0 {
                assert_eq!(value, cursor.remove_current().unwrap());
            } else {
                cursor.move_next();
            }
        }
        assert!(!cursor.remove_current().is_valid());
        assert_eq!(50, set.size());
        assert!(set.iter().all(|v| v % 2 == 1));
        set.validate();

        let mut cursor = set.cursor_mut(&51);
        assert_eq!(51, cursor.remove_current().unwrap());
        assert_eq!(Some(&53), cursor.get());
        assert_eq!(Some(&53), cursor.as_cursor().get());
        cursor.move_prev();
        assert_eq!(Some(&49), cursor.get());
    }

    #[test]
    fn first_last_and_pops() {
        let mut set: MultiSet<i32> = [4, 1, 9, 1].into();
        assert_eq!(Some(&1), set.first());
        assert_eq!(Some(&9), set.last());
        assert_eq!(1, set.pop_first().unwrap());
        assert_eq!(9, set.pop_last().unwrap());
        assert_eq!(vec![1, 4], set.into_iter().collect::<Vec<_>>());

        let mut empty = Set::<i32>::new();
        assert!(!empty.pop_first().is_valid());
        assert!(!empty.pop_last().is_valid());
    }

    #[test]
    fn clone_eq_and_debug() {
        let set: Set<i32> = [3, 1, 2].into();
        let copy = set.clone();
        assert_eq!(set, copy);
        copy.validate();
        assert_eq!("{1, 2, 3}", format!("{:?}", set));
        assert_ne!(set, Set::from([1, 2]));
    }

    #[test]
    fn clear_large_tree() {
        let mut set: Set<u32> = (0..100_000).collect();
        assert_eq!(100_000, set.size());
        set.validate();
        set.clear();
        assert!(set.is_empty());
        assert_eq!(None, set.first());
        set.insert(1);
        assert_eq!(1, set.size());
        set.validate();
    }

    #[test]
    fn every_value_dropped_once() {
        let drops = dropflag::counter();
        {
            let mut set = Set::new();
            for i in 0..50 {
                set.insert(Tracked::new(i, &drops));
            }
            let replaced = set.insert(Tracked::new(7, &drops));
            assert_eq!(0, *drops.borrow());
            drop(replaced);
            assert_eq!(1, *drops.borrow());

            let removed = set.remove(&Tracked::new(10, &drops));
            assert_eq!(2, *drops.borrow(), "probe dropped");
            drop(removed);
            assert_eq!(3, *drops.borrow());

            set.clear();
            assert_eq!(3 + 49, *drops.borrow());
            for i in 0..10 {
                set.insert(Tracked::new(i, &drops));
            }
        }
        assert_eq!(3 + 49 + 10, *drops.borrow());
    }

    #[derive(Debug)]
    struct Keyed {
        key: u8,
        seq: usize,
    }

    impl PartialEq for Keyed {
        fn eq(&self, other: &Self) -> bool {
            self.key == other.key
        }
    }

    impl Eq for Keyed {}

    impl PartialOrd for Keyed {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for Keyed {
        fn cmp(&self, other: &Self) -> Ordering {
            self.key.cmp(&other.key)
        }
    }

    #[test]
    fn duplicates_stay_adjacent_in_insertion_order() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let mut set = MultiSet::new();
        for seq in 0..2000 {
            set.insert(Keyed { key: rng.gen_range(0..16), seq });
        }
        for _ in 0..500 {
            let key = rng.gen_range(0..16);
            set.remove(&Keyed { key, seq: 0 });
        }
        set.validate();

        let values: Vec<&Keyed> = set.iter().collect();
        for pair in values.windows(2) {
            if pair[0].key == pair[1].key {
                assert!(pair[0].seq < pair[1].seq, "{:?} before {:?}", pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn random_operations_keep_invariants() {
        let mut rng = ChaCha20Rng::seed_from_u64(0x5EED);
        let mut set = Set::new();
        let mut expected = BTreeSet::new();
        for _ in 0..4000 {
            let value: i32 = rng.gen_range(0..256);
            if rng.gen_bool(0.6) {
                let mut replaced = set.insert(value);
                assert_eq!(!expected.insert(value), replaced.is_valid());
                if replaced.is_valid() {
                    assert_eq!(value, replaced.unwrap());
                }
            } else {
                let mut removed = set.remove(&value);
                assert_eq!(expected.remove(&value), removed.is_valid());
                if removed.is_valid() {
                    assert_eq!(value, removed.unwrap());
                }
            }
            set.validate();
            assert_eq!(expected.len(), set.size());
            assert_eq!(expected.is_empty(), set.is_empty());
        }
        assert!(set.iter().eq(expected.iter()));
    }

    #[test]
    fn random_operations_on_multi_set() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let mut set = MultiSet::new();
        let mut expected: BTreeMap<i32, usize> = BTreeMap::new();
        let mut inserted = 0;
        let mut removed = 0;
        for _ in 0..4000 {
            let value: i32 = rng.gen_range(0..64);
            if rng.gen_bool(0.55) {
                set.insert(value);
                *expected.entry(value).or_default() += 1;
                inserted += 1;
            } else if set.remove(&value).is_valid() {
                let count = expected.get_mut(&value).unwrap();
                *count -= 1;
                if *count == 0 {
                    expected.remove(&value);
                }
                removed += 1;
            }
            set.validate();
            assert_eq!(inserted - removed, set.size());
            assert_eq!(expected.get(&value).copied().unwrap_or(0), set.count(&value));
        }
    }
}
