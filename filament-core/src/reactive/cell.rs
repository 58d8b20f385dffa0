//! Observable Cell
//!
//! A Cell is the fundamental reactive value. It holds state and knows which
//! derivations read it.
//!
//! # How Cells Work
//!
//! 1. When a cell is read while a derivation is evaluating, the read
//!    registers a bidirectional edge in the arena.
//!
//! 2. When a cell's value changes, every observing derivation is handed to
//!    the batch scheduler, which runs it now or at the batch boundary.
//!
//! 3. A write that leaves the value equal (by `PartialEq`) does nothing:
//!    no notification, no scheduling.
//!
//! # Thread Safety
//!
//! Handles are cheap clones sharing the same underlying value and can move
//! across threads freely. Writes from a non-owner thread are routed through
//! the marshal when one is configured (see the `marshal` module); reads are
//! always direct.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::arena::{self, NodeId, NodeKind, Registration};
use super::{marshal, scheduler};

/// The read/notify primitive shared by cells and collection cells.
///
/// Owns the arena record (reclaimed when the last clone drops) and exposes
/// exactly the two operations the notify contract needs: register the
/// current derivation as an observer, and schedule all observers.
#[derive(Clone)]
pub(crate) struct Tracked {
    id: NodeId,
    _registration: Arc<Registration>,
}

impl Tracked {
    pub(crate) fn new() -> Self {
        let id = NodeId::next();
        arena::insert(id, NodeKind::Cell);
        Self {
            id,
            _registration: Registration::new(id),
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    /// Register the currently evaluating derivation (if any) as an
    /// observer of this node.
    pub(crate) fn track(&self) {
        arena::track_read(self.id);
    }

    /// Hand every observer to the scheduler. The observer set is
    /// snapshotted first, since running a derivation rewrites its edges.
    pub(crate) fn notify(&self) {
        for observer in arena::observers_snapshot(self.id) {
            scheduler::schedule(observer);
        }
    }
}

type WatcherFn = Arc<dyn Fn() + Send + Sync>;
type WatcherList = Arc<RwLock<Vec<(u64, WatcherFn)>>>;

static WATCHER_KEYS: AtomicU64 = AtomicU64::new(0);

/// Teardown handle returned by [`Cell::subscribe`].
///
/// `unsubscribe` removes the callback and is idempotent. Dropping the
/// handle does NOT unsubscribe; teardown is explicit.
pub struct Subscription {
    watchers: Weak<RwLock<Vec<(u64, WatcherFn)>>>,
    key: u64,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(watchers) = self.watchers.upgrade() {
            watchers.write().retain(|(key, _)| *key != self.key);
        }
    }
}

/// A single reactive value with automatic dependency tracking.
///
/// # Example
///
/// ```ignore
/// let count = Cell::new(0);
///
/// // Read the value (registers an edge when a derivation is evaluating)
/// let value = count.get();
///
/// // Update the value (schedules observers if it changed)
/// count.set(5);
/// ```
pub struct Cell<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    node: Tracked,
    value: Arc<RwLock<T>>,
    watchers: WatcherList,
}

impl<T> Cell<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new cell with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            node: Tracked::new(),
            value: Arc::new(RwLock::new(value)),
            watchers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// This cell's node id.
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Read the value. If a derivation is currently evaluating, it becomes
    /// an observer of this cell.
    pub fn get(&self) -> T {
        self.node.track();
        self.value.read().clone()
    }

    /// Read the value without registering a dependency.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Write a new value.
    ///
    /// From the owner thread (or with no marshal configured) this applies
    /// synchronously: unchanged values are dropped, changed values are
    /// stored and observers scheduled. From any other thread with a marshal
    /// configured, the write is forwarded as a deferred closure and this
    /// call returns without waiting for it to land.
    pub fn set(&self, value: T) {
        let this = self.clone();
        if let Some(apply) = marshal::route(move || this.apply(value)) {
            apply();
        }
    }

    /// Compute a new value from the current one and write it.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let guard = self.value.read();
            f(&*guard)
        };
        self.set(next);
    }

    /// Store and notify. Always runs on the thread that owns the graph.
    fn apply(&self, value: T) {
        let changed = {
            let mut slot = self.value.write();
            if *slot == value {
                false
            } else {
                *slot = value;
                true
            }
        };
        if !changed {
            return;
        }
        self.notify_watchers();
        self.node.notify();
    }

    /// Register a plain callback invoked after every value change.
    ///
    /// This is the teardown-style hook for external observers that are not
    /// derivations (no dependency tracking is involved). The callback runs
    /// synchronously on the writing thread, before graph propagation.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let key = WATCHER_KEYS.fetch_add(1, Ordering::Relaxed);
        self.watchers.write().push((key, Arc::new(callback)));
        Subscription {
            watchers: Arc::downgrade(&self.watchers),
            key,
        }
    }

    fn notify_watchers(&self) {
        let snapshot: SmallVec<[WatcherFn; 4]> = self
            .watchers
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback();
        }
    }

    /// Number of derivations currently observing this cell.
    pub fn observer_count(&self) -> usize {
        arena::observer_count(self.node.id())
    }
}

impl<T> Clone for Cell<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            value: Arc::clone(&self.value),
            watchers: Arc::clone(&self.watchers),
        }
    }
}

impl<T> Debug for Cell<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.node.id().raw())
            .field("value", &self.get_untracked())
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn cell_get_and_set() {
        let cell = Cell::new(0);
        assert_eq!(cell.get(), 0);

        cell.set(42);
        assert_eq!(cell.get(), 42);
    }

    #[test]
    fn cell_update() {
        let cell = Cell::new(10);
        cell.update(|v| v + 5);
        assert_eq!(cell.get(), 15);
    }

    #[test]
    fn cell_clone_shares_state() {
        let first = Cell::new(0);
        let second = first.clone();

        first.set(42);
        assert_eq!(second.get(), 42);

        second.set(100);
        assert_eq!(first.get(), 100);
    }

    #[test]
    fn cell_ids_are_unique() {
        let a = Cell::new(0);
        let b = Cell::new(0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn subscribe_fires_on_change_only() {
        let cell = Cell::new(0);
        let calls = Arc::new(AtomicI32::new(0));
        let calls_watcher = Arc::clone(&calls);

        let subscription = cell.subscribe(move || {
            calls_watcher.fetch_add(1, Ordering::SeqCst);
        });

        cell.set(1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Equal value: suppressed.
        cell.set(1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cell.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        subscription.unsubscribe();
        cell.set(3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Idempotent.
        subscription.unsubscribe();
    }

    #[test]
    fn dropping_last_handle_reclaims_the_record() {
        let cell = Cell::new(5);
        let id = cell.id();
        assert!(arena::contains(id));

        let clone = cell.clone();
        drop(cell);
        assert!(arena::contains(id));

        drop(clone);
        assert!(!arena::contains(id));
    }
}
