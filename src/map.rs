use crate::optional::Optional;
use crate::rbtree::{self, Duplicates, DuplicatePolicy, RBTree, Unique};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::iter::FusedIterator;

/// Key and value stored together in a map's tree. Ordered and compared by key only.
#[derive(Debug, Clone)]
pub struct Entry<K, V> {
    pub key: K,
    pub val: V,
}

impl<K, V> Entry<K, V> {
    #[inline]
    pub fn new(key: K, val: V) -> Entry<K, V> {
        Entry { key, val }
    }
}

impl<K, V> Borrow<K> for Entry<K, V> {
    #[inline(always)]
    fn borrow(&self) -> &K {
        &self.key
    }
}

impl<K: PartialEq, V> PartialEq for Entry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Eq, V> Eq for Entry<K, V> {}

impl<K: Ord, V> PartialOrd for Entry<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, V> Ord for Entry<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// Ordered key-value container over [`RBTree`].
///
/// ```
/// use stowage::Map;
///
/// let mut ages = Map::new();
/// ages.insert("ann", 31);
/// let mut previous = ages.insert("ann", 32);
/// assert_eq!(31, previous.unwrap());
/// assert_eq!(Some(&32), ages.get(&"ann"));
/// ```
pub struct MapBase<K, V, D: DuplicatePolicy = Unique> {
    tree: RBTree<Entry<K, V>, D>,
}

/// One value per key; inserting an existing key replaces its value.
pub type Map<K, V> = MapBase<K, V, Unique>;

/// Any number of values per key, kept in insertion order.
pub type MultiMap<K, V> = MapBase<K, V, Duplicates>;

impl<K, V, D: DuplicatePolicy> MapBase<K, V, D> {
    pub fn new() -> MapBase<K, V, D> {
        MapBase { tree: RBTree::new() }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.tree.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Entries in key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { inner: self.tree.iter() }
    }
}

impl<K: Ord, V, D: DuplicatePolicy> MapBase<K, V, D> {
    pub fn insert(&mut self, key: K, val: V) -> D::InsertResult<V> {
        D::map_result(self.tree.insert(Entry { key, val }), |entry| entry.val)
    }

    /// Removes one entry with this key and returns its value.
    pub fn remove(&mut self, key: &K) -> Optional<V> {
        let mut removed = self.tree.remove(key);
        if removed.is_valid() {
            Optional::new(removed.unwrap().val)
        } else {
            Optional::none()
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.get(key).map(|entry| &entry.val)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.tree.find_mut(key).map(|entry| &mut entry.val)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains(key)
    }

    pub fn count(&self, key: &K) -> usize {
        self.tree.count(key)
    }
}

impl<K, V, D: DuplicatePolicy> Default for MapBase<K, V, D> {
    fn default() -> Self {
        MapBase::new()
    }
}

impl<K: Ord + Clone, V: Clone, D: DuplicatePolicy> Clone for MapBase<K, V, D> {
    fn clone(&self) -> Self {
        MapBase { tree: self.tree.clone() }
    }
}

impl<K: PartialEq, V: PartialEq, D: DuplicatePolicy> PartialEq for MapBase<K, V, D> {
    fn eq(&self, other: &Self) -> bool {
        self.size() == other.size() && self.iter().eq(other.iter())
    }
}

impl<K: Debug, V: Debug, D: DuplicatePolicy> Debug for MapBase<K, V, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V, D: DuplicatePolicy> FromIterator<(K, V)> for MapBase<K, V, D> {
    fn from_iter<I: IntoIterator<Item=(K, V)>>(iter: I) -> Self {
        let mut map = MapBase::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V, D: DuplicatePolicy> Extend<(K, V)> for MapBase<K, V, D> {
    fn extend<I: IntoIterator<Item=(K, V)>>(&mut self, iter: I) {
        for (key, val) in iter {
            let _ = self.insert(key, val);
        }
    }
}

impl<'a, K, V, D: DuplicatePolicy> IntoIterator for &'a MapBase<K, V, D> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, K, V> {
    inner: rbtree::Iter<'a, Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| (&entry.key, &entry.val))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|entry| (&entry.key, &entry.val))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}
