//! Collection cells: observable sequences and maps.
//!
//! These wrap a plain `Vec`/`HashMap` in the same read/notify contract a
//! [`Cell`](crate::reactive::Cell) has, applied per-operation instead of
//! per-field: every read registers the current derivation as an observer,
//! every mutation notifies. There is no new propagation algorithm here;
//! both types delegate to the cell's tracking primitive.
//!
//! Mutations notify unconditionally (a mutation is a change); there is no
//! equality dedup like the scalar cell's. Mutations also do not take the
//! cross-thread marshal hop; that is reserved for `Cell::set`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::reactive::{NodeId, Tracked};

/// An observable ordered sequence.
///
/// Read operations track, mutations notify.
pub struct ObservableVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    node: Tracked,
    items: Arc<RwLock<Vec<T>>>,
}

impl<T> ObservableVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            node: Tracked::new(),
            items: Arc::new(RwLock::new(items)),
        }
    }

    /// This collection's node id.
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    // --- Read operations (track) ---

    pub fn len(&self) -> usize {
        self.node.track();
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.track();
        self.items.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.node.track();
        self.items.read().get(index).cloned()
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.node.track();
        self.items.read().contains(item)
    }

    /// A tracked copy of the current contents.
    pub fn snapshot(&self) -> Vec<T> {
        self.node.track();
        self.items.read().clone()
    }

    // --- Write operations (notify) ---

    pub fn push(&self, item: T) {
        self.items.write().push(item);
        self.node.notify();
    }

    pub fn pop(&self) -> Option<T> {
        let popped = self.items.write().pop();
        self.node.notify();
        popped
    }

    pub fn insert(&self, index: usize, item: T) {
        self.items.write().insert(index, item);
        self.node.notify();
    }

    /// Remove and return the element at `index`. Panics if out of bounds,
    /// like `Vec::remove`.
    pub fn remove(&self, index: usize) -> T {
        let removed = self.items.write().remove(index);
        self.node.notify();
        removed
    }

    /// Replace the element at `index`. Panics if out of bounds.
    pub fn set(&self, index: usize, item: T) {
        self.items.write()[index] = item;
        self.node.notify();
    }

    pub fn clear(&self) {
        self.items.write().clear();
        self.node.notify();
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.items.write().extend(items);
        self.node.notify();
    }

    pub fn retain(&self, keep: impl FnMut(&T) -> bool) {
        self.items.write().retain(keep);
        self.node.notify();
    }
}

impl<T> Default for ObservableVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ObservableVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> From<Vec<T>> for ObservableVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T> Debug for ObservableVec<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ObservableVec").field(&*self.items.read()).finish()
    }
}

/// An observable key-value map.
pub struct ObservableMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    node: Tracked,
    entries: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> ObservableMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            node: Tracked::new(),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// This collection's node id.
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    // --- Read operations (track) ---

    pub fn get(&self, key: &K) -> Option<V> {
        self.node.track();
        self.entries.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.node.track();
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.node.track();
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.track();
        self.entries.read().is_empty()
    }

    pub fn keys(&self) -> Vec<K> {
        self.node.track();
        self.entries.read().keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<V> {
        self.node.track();
        self.entries.read().values().cloned().collect()
    }

    /// A tracked copy of the current entries.
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.node.track();
        self.entries.read().clone()
    }

    // --- Write operations (notify) ---

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let previous = self.entries.write().insert(key, value);
        self.node.notify();
        previous
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = self.entries.write().remove(key);
        self.node.notify();
        removed
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        self.node.notify();
    }

    pub fn extend(&self, entries: impl IntoIterator<Item = (K, V)>) {
        self.entries.write().extend(entries);
        self.node.notify();
    }
}

impl<K, V> Default for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> From<HashMap<K, V>> for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn from(entries: HashMap<K, V>) -> Self {
        let map = Self::new();
        *map.entries.write() = entries;
        map
    }
}

impl<K, V> Debug for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + Debug + 'static,
    V: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ObservableMap").field(&*self.entries.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::autorun;
    use parking_lot::Mutex;

    #[test]
    fn vec_basic_operations() {
        let list = ObservableVec::from_vec(vec![1, 2, 3]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(0), Some(1));
        assert_eq!(list.snapshot(), vec![1, 2, 3]);
        assert!(list.contains(&2));
        assert!(!list.is_empty());
    }

    #[test]
    fn vec_mutations_notify() {
        let list = ObservableVec::from_vec(vec![1, 2]);
        let log = Arc::new(Mutex::new(Vec::new()));

        let (list_inner, log_inner) = (list.clone(), Arc::clone(&log));
        let _r = autorun(move || log_inner.lock().push(list_inner.snapshot()));
        assert_eq!(*log.lock(), vec![vec![1, 2]]);

        list.push(3);
        assert_eq!(*log.lock(), vec![vec![1, 2], vec![1, 2, 3]]);

        list.pop();
        assert_eq!(log.lock().len(), 3);
        assert_eq!(log.lock()[2], vec![1, 2]);
    }

    #[test]
    fn vec_insert_remove_set_clear() {
        let list = ObservableVec::from_vec(vec![1, 2, 3]);

        list.insert(1, 99);
        assert_eq!(list.snapshot(), vec![1, 99, 2, 3]);

        assert_eq!(list.remove(1), 99);
        assert_eq!(list.snapshot(), vec![1, 2, 3]);

        list.set(1, 20);
        assert_eq!(list.snapshot(), vec![1, 20, 3]);

        list.retain(|v| *v != 20);
        assert_eq!(list.snapshot(), vec![1, 3]);

        list.clear();
        assert!(list.snapshot().is_empty());
    }

    #[test]
    fn vec_extend_notifies_once() {
        let list: ObservableVec<i32> = ObservableVec::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let (list_inner, log_inner) = (list.clone(), Arc::clone(&log));
        let _r = autorun(move || log_inner.lock().push(list_inner.snapshot()));

        list.extend([1, 2, 3]);
        assert_eq!(*log.lock(), vec![vec![], vec![1, 2, 3]]);
    }

    #[test]
    fn map_basic_operations() {
        let map = ObservableMap::new();
        map.insert("a", 1);
        map.insert("b", 2);

        assert_eq!(map.get(&"a"), Some(1));
        assert_eq!(map.get(&"c"), None);
        assert!(map.contains_key(&"b"));
        assert_eq!(map.len(), 2);

        let mut keys = map.keys();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn map_mutations_notify() {
        let map = ObservableMap::new();
        map.insert("a", 1);

        let log = Arc::new(Mutex::new(Vec::new()));
        let (map_inner, log_inner) = (map.clone(), Arc::clone(&log));
        let _r = autorun(move || log_inner.lock().push(map_inner.len()));
        assert_eq!(*log.lock(), vec![1]);

        map.insert("b", 2);
        assert_eq!(*log.lock(), vec![1, 2]);

        map.remove(&"a");
        assert_eq!(*log.lock(), vec![1, 2, 1]);

        map.clear();
        assert_eq!(*log.lock(), vec![1, 2, 1, 0]);
    }

    #[test]
    fn map_extend() {
        let map = ObservableMap::new();
        map.extend([("a", 1), ("b", 2)]);
        assert_eq!(map.get(&"a"), Some(1));
        assert_eq!(map.get(&"b"), Some(2));
    }
}
