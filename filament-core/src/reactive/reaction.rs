//! Reactions: eager side effects driven by the graph.
//!
//! Unlike a Computed (lazy, evaluated on read), a reaction re-runs as soon
//! as the scheduler delivers a trigger. Two flavors:
//!
//! - [`Reaction`] / [`autorun`]: runs the function immediately on
//!   construction, then again whenever anything it read changes.
//! - [`GatedReaction`] / [`reaction`]: tracks a data function; forwards to
//!   a separate effect function only when the data function's *result*
//!   changes, not on every upstream notification.
//!
//! The run closure (user function plus the detach/re-track choreography)
//! is owned by the arena, not the handle: dropping a handle leaves the
//! reaction running. Only `dispose()` stops it.
//!
//! Cell writes inside a reaction go through the scheduler like any other
//! write, so reactions can feed further reactions; batching still settles
//! everything at the outermost boundary. Panics inside the function
//! propagate to whoever triggered the run.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::arena::{self, NodeId, NodeKind, RunFn};
use super::context::EvalScope;
use super::Disposable;

/// A reactive side effect that re-runs when its dependencies change.
pub struct Reaction {
    id: NodeId,
    disposed: Arc<AtomicBool>,
}

impl Reaction {
    /// Create the reaction and run it once, synchronously, to establish
    /// its initial dependencies.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = NodeId::next();
        let disposed = Arc::new(AtomicBool::new(false));

        let run: RunFn = {
            let disposed = Arc::clone(&disposed);
            Arc::new(move || {
                if disposed.load(Ordering::SeqCst) {
                    return;
                }
                arena::detach_dependencies(id);
                let _scope = EvalScope::enter(id);
                f();
            })
        };

        arena::insert(id, NodeKind::Reaction { run: Arc::clone(&run) });
        run();

        Self { id, disposed }
    }

    /// This derivation's node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Number of nodes this reaction currently depends on.
    pub fn dependency_count(&self) -> usize {
        arena::dependency_count(self.id)
    }
}

impl Disposable for Reaction {
    /// Stop the reaction: sever all edges and reclaim the arena record.
    /// Triggers already queued for it become no-ops.
    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            arena::release(self.id);
            debug!(node = self.id.raw(), "reaction disposed");
        }
    }
}

impl Debug for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaction")
            .field("id", &self.id.raw())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Run `f` immediately, then re-run it whenever any cell or computed it
/// read changes. Keep the returned handle to `dispose()` later; dropping
/// it leaves the reaction running.
///
/// ```ignore
/// let count = Cell::new(0);
/// let count_inner = count.clone();
/// let logger = autorun(move || println!("count = {}", count_inner.get()));
/// // prints "count = 0"
/// count.set(1); // prints "count = 1"
/// logger.dispose();
/// count.set(2); // silent
/// ```
pub fn autorun<F>(f: F) -> Reaction
where
    F: Fn() + Send + Sync + 'static,
{
    Reaction::new(f)
}

/// An eager derivation split into a tracked data function and an untracked
/// effect, with the effect gated on the data value actually changing.
pub struct GatedReaction {
    id: NodeId,
    disposed: Arc<AtomicBool>,
}

impl GatedReaction {
    /// This derivation's node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Disposable for GatedReaction {
    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            arena::release(self.id);
            debug!(node = self.id.raw(), "gated reaction disposed");
        }
    }
}

impl Debug for GatedReaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatedReaction")
            .field("id", &self.id.raw())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Track `data_fn`'s reads; call `effect_fn` with the fresh result when it
/// differs (by `PartialEq`) from the previous one.
///
/// With `fire_immediately` the effect also runs for the initial value.
/// Otherwise the initial evaluation only establishes dependencies and
/// seeds the comparison value, and the effect stays quiet until the result
/// first changes.
///
/// The effect runs outside the evaluation context: its reads are not
/// tracked.
///
/// ```ignore
/// let word = Cell::new("alpha");
/// let word_inner = word.clone();
/// let r = reaction(
///     move || word_inner.get().len(),
///     |len| println!("length changed: {len}"),
///     false,
/// );
/// word.set("omega"); // same length, effect stays quiet
/// word.set("om");    // prints "length changed: 2"
/// r.dispose();
/// ```
pub fn reaction<T, F, E>(data_fn: F, effect_fn: E, fire_immediately: bool) -> GatedReaction
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
    E: Fn(T) + Send + Sync + 'static,
{
    let id = NodeId::next();
    let disposed = Arc::new(AtomicBool::new(false));
    let last: Arc<RwLock<Option<T>>> = Arc::new(RwLock::new(None));
    let data_fn = Arc::new(data_fn);

    let run: RunFn = {
        let disposed = Arc::clone(&disposed);
        let last = Arc::clone(&last);
        let data_fn = Arc::clone(&data_fn);
        Arc::new(move || {
            if disposed.load(Ordering::SeqCst) {
                return;
            }
            arena::detach_dependencies(id);
            let next = {
                let _scope = EvalScope::enter(id);
                data_fn()
            };
            let fire = {
                let mut slot = last.write();
                let fire = slot.as_ref() != Some(&next);
                *slot = Some(next.clone());
                fire
            };
            if fire {
                effect_fn(next);
            }
        })
    };

    arena::insert(id, NodeKind::GatedReaction { run: Arc::clone(&run) });

    if fire_immediately {
        run();
    } else {
        // Establish dependencies and seed the comparison value, but keep
        // the effect quiet.
        let initial = {
            let _scope = EvalScope::enter(id);
            data_fn()
        };
        *last.write() = Some(initial);
    }

    GatedReaction { id, disposed }
}
