//! Store: key-named cell container with derivation lifecycle.
//!
//! A Store wraps a schema of named [`Cell`]s and owns the disposers of the
//! derivations set up against them. `reconcile` supports schema evolution:
//! new keys are added with their defaults, existing values are untouched,
//! and the registered derivations are torn down and re-registered.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::reactive::{action, Cell, Disposable};

/// Derivations owned by a store, disposed as a unit.
pub type Disposers = Vec<Box<dyn Disposable + Send + Sync>>;

/// Key-named cell container.
///
/// ```ignore
/// let store = Store::new([("count", 0), ("limit", 10)]);
/// store.set("count", 5);
/// assert_eq!(store.get("count"), Some(5));
/// assert_eq!(store.get("missing"), None);
/// ```
pub struct Store<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    cells: RwLock<HashMap<String, Cell<V>>>,
    disposers: Mutex<Disposers>,
}

impl<V> Store<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Build a store from (name, default) pairs.
    pub fn new<K>(schema: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
    {
        let cells = schema
            .into_iter()
            .map(|(key, default)| (key.into(), Cell::new(default)))
            .collect();
        Self {
            cells: RwLock::new(cells),
            disposers: Mutex::new(Vec::new()),
        }
    }

    /// Build a store from a schema plus initial overrides. Keys in
    /// `initial` that are not in the schema are ignored.
    pub fn with_initial<K, K2>(
        schema: impl IntoIterator<Item = (K, V)>,
        initial: impl IntoIterator<Item = (K2, V)>,
    ) -> Self
    where
        K: Into<String>,
        K2: Into<String>,
    {
        let store = Self::new(schema);
        {
            let cells = store.cells.read();
            for (key, value) in initial {
                if let Some(cell) = cells.get(&key.into()) {
                    cell.set(value);
                }
            }
        }
        store
    }

    /// Tracked read of a named cell. Unknown keys read as `None`.
    pub fn get(&self, key: &str) -> Option<V> {
        let cells = self.cells.read();
        cells.get(key).map(|cell| cell.get())
    }

    /// Write a named cell. Unknown keys are ignored.
    pub fn set(&self, key: &str, value: V) {
        let cell = {
            let cells = self.cells.read();
            cells.get(key).cloned()
        };
        if let Some(cell) = cell {
            cell.set(value);
        }
    }

    /// Apply several writes inside one batch, so derivations reading more
    /// than one of the keys observe them atomically.
    pub fn update<K>(&self, values: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
    {
        action(|| {
            for (key, value) in values {
                self.set(&key.into(), value);
            }
        });
    }

    /// The handle for a named cell, for callers that want to observe or
    /// derive from it directly.
    pub fn cell(&self, key: &str) -> Option<Cell<V>> {
        self.cells.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.cells.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.cells.read().keys().cloned().collect()
    }

    /// Schema evolution: add cells for keys this store does not have yet
    /// (existing values untouched), dispose the previously registered
    /// derivations, and install the fresh set built by `setup`.
    pub fn reconcile<K, F>(&self, schema: impl IntoIterator<Item = (K, V)>, setup: F)
    where
        K: Into<String>,
        F: FnOnce(&Self) -> Disposers,
    {
        {
            let mut cells = self.cells.write();
            for (key, default) in schema {
                cells.entry(key.into()).or_insert_with(|| Cell::new(default));
            }
        }
        self.dispose_derivations();
        *self.disposers.lock() = setup(self);
    }

    fn dispose_derivations(&self) {
        let old = std::mem::take(&mut *self.disposers.lock());
        for disposer in &old {
            disposer.dispose();
        }
    }
}

impl<V> Disposable for Store<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Dispose every registered derivation. Cells and their values stay.
    fn dispose(&self) {
        self.dispose_derivations();
    }
}

/// Convenience for handing arbitrary disposables to [`Store::reconcile`].
pub fn disposer(d: impl Disposable + Send + Sync + 'static) -> Box<dyn Disposable + Send + Sync> {
    Box::new(d)
}

// Arc'd disposables forward naturally, which lets stores share ownership
// of a derivation with other holders.
impl<D: Disposable + ?Sized> Disposable for Arc<D> {
    fn dispose(&self) {
        (**self).dispose();
    }
}

impl<D: Disposable + ?Sized> Disposable for Box<D> {
    fn dispose(&self) {
        (**self).dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::autorun;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn get_and_set_by_key() {
        let store = Store::new([("count", 0), ("limit", 10)]);

        assert_eq!(store.get("count"), Some(0));
        assert_eq!(store.get("limit"), Some(10));
        assert_eq!(store.get("missing"), None);

        store.set("count", 5);
        assert_eq!(store.get("count"), Some(5));

        // Unknown key: silently ignored.
        store.set("missing", 1);
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn with_initial_overrides_defaults() {
        let store = Store::with_initial([("a", 1), ("b", 2)], [("b", 20), ("ghost", 99)]);
        assert_eq!(store.get("a"), Some(1));
        assert_eq!(store.get("b"), Some(20));
        assert_eq!(store.get("ghost"), None);
    }

    #[test]
    fn update_is_batched() {
        let store = Store::new([("a", 0), ("b", 0)]);
        let log = Arc::new(Mutex::new(Vec::new()));

        let a = store.cell("a").unwrap();
        let b = store.cell("b").unwrap();
        let log_inner = Arc::clone(&log);
        let _r = autorun(move || log_inner.lock().push((a.get(), b.get())));
        assert_eq!(*log.lock(), vec![(0, 0)]);

        store.update([("a", 1), ("b", 2)]);

        // One atomic step, no (1, 0) glitch.
        assert_eq!(*log.lock(), vec![(0, 0), (1, 2)]);
    }

    #[test]
    fn reconcile_adds_keys_and_keeps_values() {
        let store = Store::new([("count", 0)]);
        store.set("count", 7);

        store.reconcile([("count", 0), ("extra", 100)], |_| Vec::new());

        assert_eq!(store.get("count"), Some(7));
        assert_eq!(store.get("extra"), Some(100));
    }

    #[test]
    fn reconcile_swaps_derivations() {
        let store = Store::new([("count", 0)]);
        let log = Arc::new(Mutex::new(Vec::new()));

        let cell = store.cell("count").unwrap();
        let log_inner = Arc::clone(&log);
        store.reconcile([("count", 0)], move |_| {
            vec![disposer(autorun(move || {
                log_inner.lock().push(cell.get());
            }))]
        });
        assert_eq!(*log.lock(), vec![0]);

        store.set("count", 1);
        assert_eq!(*log.lock(), vec![0, 1]);

        // Reconciling again disposes the old reaction.
        store.reconcile([("count", 0)], |_| Vec::new());
        store.set("count", 2);
        assert_eq!(*log.lock(), vec![0, 1]);
    }

    #[test]
    fn dispose_stops_registered_derivations() {
        let store = Store::new([("count", 0)]);
        let log = Arc::new(Mutex::new(Vec::new()));

        let cell = store.cell("count").unwrap();
        let log_inner = Arc::clone(&log);
        store.reconcile([("count", 0)], move |_| {
            vec![disposer(autorun(move || {
                log_inner.lock().push(cell.get());
            }))]
        });

        store.dispose();
        store.set("count", 1);
        assert_eq!(*log.lock(), vec![0]);
        assert_eq!(store.get("count"), Some(1));
    }
}
