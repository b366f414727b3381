//! This module is for testing only

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

pub type DropFlag<T> = Rc<RefCell<T>>;

pub fn counter() -> DropFlag<usize> {
    DropFlag::new(RefCell::new(0))
}

pub struct Droppable {
    pub dropflag: DropFlag<bool>,
}

impl Drop for Droppable {
    fn drop(&mut self) {
        *self.dropflag.borrow_mut() = true;
    }
}

/// Counts its own drops into a shared flag. Compared and ordered by `value` only,
/// so it can live in ordered containers.
#[derive(Debug)]
pub struct Tracked {
    pub value: i32,
    pub drops: DropFlag<usize>,
}

impl Tracked {
    pub fn new(value: i32, drops: &DropFlag<usize>) -> Tracked {
        Tracked { value, drops: drops.clone() }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        Tracked::new(self.value, &self.drops)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        *self.drops.borrow_mut() += 1;
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Tracked {}

impl PartialOrd for Tracked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tracked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

#[test]
fn dropflag() {
    let flag = DropFlag::new(RefCell::new(false));
    let droppable = Droppable { dropflag: flag.clone() };
    assert_eq!(false, *flag.borrow());
    std::mem::drop(droppable);
    assert_eq!(true, *flag.borrow());
}

#[test]
fn tracked_counts_every_drop() {
    let drops = counter();
    let a = Tracked::new(1, &drops);
    let b = a.clone();
    assert_eq!(a, b);
    drop(a);
    drop(b);
    assert_eq!(2, *drops.borrow());
}
