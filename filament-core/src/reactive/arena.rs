//! State Arena
//!
//! All reactive node records live in one process-wide registry, keyed by a
//! monotonically assigned [`NodeId`]. Cells and derivations are thin,
//! copyable handles holding an id; the arena holds the graph itself:
//! observer/dependency edge sets, the dirty flag for lazy derivations, and
//! a type-erased trigger closure for eager ones.
//!
//! # Why an arena
//!
//! Dependency edges are bidirectional (a cell knows its observers, a
//! derivation knows its dependencies). Owning pointers in both directions
//! would form reference cycles; index sets do not. Handles stay `Clone` +
//! `Send` + `Sync` because they carry nothing but an id and a couple of
//! `Arc`s.
//!
//! # Lifetime policy
//!
//! Ids are never reused. Cell and computed records are removed when the
//! last handle drops (see [`Registration`]); reaction records are owned by
//! the arena and removed by `dispose()`. A stale id left behind in an edge
//! set or in the scheduler's pending set resolves to a silent no-op.
//!
//! # Locking
//!
//! One `RwLock` guards the registry. Every operation here takes the lock
//! for a short, non-reentrant critical section; user functions are never
//! invoked while it is held.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use smallvec::SmallVec;

/// Unique identifier for a node in the reactive graph.
///
/// Minted once per cell or derivation, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Mint a fresh id.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A type-erased trigger body for an eager derivation.
///
/// The closure owns the user function plus everything its re-evaluation
/// needs (detach, context entry, the gate state for gated reactions).
pub(crate) type RunFn = Arc<dyn Fn() + Send + Sync>;

/// The closed set of node variants, dispatched through one trigger
/// operation.
pub(crate) enum NodeKind {
    /// A mutable value source. Cells are never triggered themselves; only
    /// their observers are.
    Cell,
    /// A lazy cached derivation. Triggering marks it dirty and forwards the
    /// dirtiness; recomputation waits for the next read.
    Computed { dirty: bool },
    /// An eager side-effecting derivation. Triggering re-runs it.
    Reaction { run: RunFn },
    /// An eager derivation whose downstream effect is gated on a value
    /// change. Trigger dispatch is identical to `Reaction`; the gate lives
    /// inside the closure.
    GatedReaction { run: RunFn },
}

/// One record in the registry.
pub(crate) struct NodeRecord {
    kind: NodeKind,
    /// Nodes that read this node during their last evaluation.
    observers: HashSet<NodeId>,
    /// Nodes this node read during its last evaluation.
    dependencies: HashSet<NodeId>,
}

static REGISTRY: LazyLock<RwLock<HashMap<NodeId, NodeRecord>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// What the scheduler should do for a triggered node. Resolved under the
/// registry lock, executed after it is released.
pub(crate) enum Triggered {
    /// Lazy derivation went clean -> dirty; schedule these observers.
    Propagate(SmallVec<[NodeId; 8]>),
    /// Eager derivation; invoke its run closure.
    Run(RunFn),
    /// Already dirty, a cell, or a reclaimed id.
    Ignore,
}

/// Insert a freshly minted node.
pub(crate) fn insert(id: NodeId, kind: NodeKind) {
    let record = NodeRecord {
        kind,
        observers: HashSet::new(),
        dependencies: HashSet::new(),
    };
    REGISTRY.write().insert(id, record);
}

/// Register a read edge: `source` was read while some derivation was
/// current. Adds the edge in both directions, preserving symmetry.
pub(crate) fn track_read(source: NodeId) {
    let Some(current) = super::context::current() else {
        return;
    };
    let mut registry = REGISTRY.write();
    if !registry.contains_key(&source) || !registry.contains_key(&current) {
        return;
    }
    if let Some(record) = registry.get_mut(&source) {
        record.observers.insert(current);
    }
    if let Some(record) = registry.get_mut(&current) {
        record.dependencies.insert(source);
    }
}

/// Snapshot a node's observers.
///
/// Callers iterate the snapshot after the lock is gone, since triggering an
/// observer may mutate the live set.
pub(crate) fn observers_snapshot(id: NodeId) -> SmallVec<[NodeId; 8]> {
    let registry = REGISTRY.read();
    registry
        .get(&id)
        .map(|record| record.observers.iter().copied().collect())
        .unwrap_or_default()
}

/// Remove a node's outgoing dependency edges (both directions).
///
/// Called at the start of every re-evaluation so the dependency set ends up
/// reflecting exactly the reads of the newest run.
pub(crate) fn detach_dependencies(id: NodeId) {
    let mut registry = REGISTRY.write();
    let dependencies = match registry.get_mut(&id) {
        Some(record) => mem::take(&mut record.dependencies),
        None => return,
    };
    for dep in &dependencies {
        if let Some(record) = registry.get_mut(dep) {
            record.observers.remove(&id);
        }
    }
}

/// Sever a node from the graph in both directions, keeping its record.
///
/// Used by computed disposal: the node becomes edge-free but can still be
/// evaluated again later.
pub(crate) fn sever(id: NodeId) {
    let mut registry = REGISTRY.write();
    let (dependencies, observers) = match registry.get_mut(&id) {
        Some(record) => (
            mem::take(&mut record.dependencies),
            mem::take(&mut record.observers),
        ),
        None => return,
    };
    for dep in &dependencies {
        if let Some(record) = registry.get_mut(dep) {
            record.observers.remove(&id);
        }
    }
    for obs in &observers {
        if let Some(record) = registry.get_mut(obs) {
            record.dependencies.remove(&id);
        }
    }
}

/// Sever a node and remove its record entirely.
pub(crate) fn release(id: NodeId) {
    let removed = {
        let mut registry = REGISTRY.write();
        let Some(record) = registry.remove(&id) else {
            return;
        };
        for dep in &record.dependencies {
            if let Some(other) = registry.get_mut(dep) {
                other.observers.remove(&id);
            }
        }
        for obs in &record.observers {
            if let Some(other) = registry.get_mut(obs) {
                other.dependencies.remove(&id);
            }
        }
        record
    };
    // The record may own a run closure whose captured handles release
    // further nodes on drop; that must happen with the lock released.
    drop(removed);
}

/// Read the dirty flag of a lazy derivation. Reclaimed or non-computed ids
/// report dirty, which at worst forces a recompute.
pub(crate) fn is_dirty(id: NodeId) -> bool {
    let registry = REGISTRY.read();
    match registry.get(&id) {
        Some(NodeRecord {
            kind: NodeKind::Computed { dirty },
            ..
        }) => *dirty,
        _ => true,
    }
}

/// Set the dirty flag of a lazy derivation.
pub(crate) fn set_dirty(id: NodeId, value: bool) {
    let mut registry = REGISTRY.write();
    if let Some(NodeRecord {
        kind: NodeKind::Computed { dirty },
        ..
    }) = registry.get_mut(&id)
    {
        *dirty = value;
    }
}

/// Resolve what triggering `id` means, without executing it.
pub(crate) fn resolve_trigger(id: NodeId) -> Triggered {
    let mut registry = REGISTRY.write();
    let Some(record) = registry.get_mut(&id) else {
        return Triggered::Ignore;
    };
    match &mut record.kind {
        NodeKind::Cell => Triggered::Ignore,
        NodeKind::Computed { dirty } => {
            if *dirty {
                // Already propagated once; re-propagating would double the
                // work on diamond-shaped graphs.
                Triggered::Ignore
            } else {
                *dirty = true;
                Triggered::Propagate(record.observers.iter().copied().collect())
            }
        }
        NodeKind::Reaction { run } | NodeKind::GatedReaction { run } => {
            Triggered::Run(Arc::clone(run))
        }
    }
}

/// Number of observers currently attached to a node.
pub(crate) fn observer_count(id: NodeId) -> usize {
    let registry = REGISTRY.read();
    registry.get(&id).map(|r| r.observers.len()).unwrap_or(0)
}

/// Number of dependencies currently attached to a node.
pub(crate) fn dependency_count(id: NodeId) -> usize {
    let registry = REGISTRY.read();
    registry.get(&id).map(|r| r.dependencies.len()).unwrap_or(0)
}

/// Whether a record exists for this id.
pub(crate) fn contains(id: NodeId) -> bool {
    REGISTRY.read().contains_key(&id)
}

/// Removes the arena record when the last handle drops.
///
/// Cell and computed handles share one of these through an `Arc`; handles
/// captured inside derivation closures count, so a cell read by a live
/// reaction stays registered even after the original handle is gone.
pub(crate) struct Registration {
    id: NodeId,
}

impl Registration {
    pub(crate) fn new(id: NodeId) -> Arc<Self> {
        Arc::new(Self { id })
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        release(self.id);
    }
}
