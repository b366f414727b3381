//! Containers with explicit object lifetimes.
//!
//! Values live in [`AlignedMemory`] cells and are constructed and destroyed
//! only by the owning container. Operations that may or may not produce a
//! value return an [`Optional`].

#[macro_use]
mod logging;

mod aligned;
mod error;
mod optional;
mod array;
mod rbtree;
mod map;
mod list;
mod owned;
mod lock;
mod ref_count;

pub use aligned::AlignedMemory;
pub use error::ReserveError;
pub use optional::Optional;
pub use array::{Array, IntoIter as ArrayIntoIter};
pub use rbtree::{RBTree, Set, MultiSet, DuplicatePolicy, Unique, Duplicates, Cursor, CursorMut, Iter as TreeIter, IntoIter as TreeIntoIter};
pub use map::{Entry, MapBase, Map, MultiMap, Iter as MapIter};
pub use list::{SinglyLinkedList, CursorMut as ListCursorMut, Iter as ListIter, IterMut as ListIterMut, IntoIter as ListIntoIter};
pub use owned::Owned;
pub use lock::{Lock, LockGuard};
pub use ref_count::{RefCount, RefCountLocal, RefCountAsync};

#[cfg(test)]
pub mod dropflag;
