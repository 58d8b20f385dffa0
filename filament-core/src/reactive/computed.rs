//! Computed: lazy cached derivations.
//!
//! A Computed wraps a function and caches its result. Reading it inside
//! another derivation registers an edge, exactly like reading a cell.
//!
//! # How Computeds Work
//!
//! 1. Construction runs nothing. The node starts dirty.
//!
//! 2. `get()` on a dirty node drops the previous dependency edges, enters
//!    the evaluation context, runs the function (whose reads rebuild the
//!    edges), caches the result and clears the dirty flag.
//!
//! 3. `get()` on a clean node returns the cache. No recomputation, no
//!    re-tracking of its own dependencies.
//!
//! 4. When a dependency changes, the node does NOT recompute. It flips to
//!    dirty and forwards the trigger to its own observers, so dirtiness
//!    cascades through lazy chains while all actual work waits for the
//!    next read. A node that is already dirty swallows the trigger, which
//!    keeps diamond-shaped graphs from propagating twice.
//!
//! # Disposal
//!
//! `dispose()` severs every edge, drops the cache and forces the dirty
//! flag. The node is then inert (upstream changes no longer reach it),
//! but a later `get()` still works and rebuilds dependencies from scratch.
//! Callers may rely on that.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::arena::{self, NodeId, NodeKind, Registration};
use super::context::EvalScope;
use super::Disposable;

/// A derived value that auto-tracks dependencies and caches the result.
///
/// # Example
///
/// ```ignore
/// let count = Cell::new(2);
/// let count_for_double = count.clone();
/// let doubled = Computed::new(move || count_for_double.get() * 2);
///
/// assert_eq!(doubled.get(), 4); // runs the function
/// assert_eq!(doubled.get(), 4); // cached
/// count.set(5);                 // doubled is now dirty
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    id: NodeId,
    compute: Arc<dyn Fn() -> T + Send + Sync>,
    cache: Arc<RwLock<Option<T>>>,
    _registration: Arc<Registration>,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new computed. The function does not run until the first
    /// `get()`.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let id = NodeId::next();
        arena::insert(id, NodeKind::Computed { dirty: true });
        Self {
            id,
            compute: Arc::new(compute),
            cache: Arc::new(RwLock::new(None)),
            _registration: Registration::new(id),
        }
    }

    /// This derivation's node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Read the value, recomputing first if a dependency changed since the
    /// last evaluation.
    ///
    /// If another derivation is currently evaluating, it becomes an
    /// observer of this one.
    pub fn get(&self) -> T {
        arena::track_read(self.id);
        if arena::is_dirty(self.id) {
            self.refresh();
        }
        self.cache
            .read()
            .clone()
            .expect("refreshed computed holds a value")
    }

    /// Re-evaluate: detach stale edges, run the function under a fresh
    /// evaluation scope, cache, mark clean.
    fn refresh(&self) {
        arena::detach_dependencies(self.id);
        let value = {
            let _scope = EvalScope::enter(self.id);
            (self.compute)()
        };
        *self.cache.write() = Some(value);
        arena::set_dirty(self.id, false);
    }

    /// Whether the cache is stale. Diagnostic.
    pub fn is_dirty(&self) -> bool {
        arena::is_dirty(self.id)
    }

    /// Whether the function has produced a value yet.
    pub fn has_value(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Number of derivations currently observing this one.
    pub fn observer_count(&self) -> usize {
        arena::observer_count(self.id)
    }
}

impl<T> Disposable for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Disconnect from the graph and drop the cache.
    ///
    /// A later `get()` recomputes from an empty dependency set.
    fn dispose(&self) {
        arena::sever(self.id);
        arena::set_dirty(self.id, true);
        *self.cache.write() = None;
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            compute: Arc::clone(&self.compute),
            cache: Arc::clone(&self.cache),
            _registration: Arc::clone(&self._registration),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id.raw())
            .field("dirty", &self.is_dirty())
            .field("has_value", &self.has_value())
            .finish()
    }
}
