//! Reactive Primitives
//!
//! This module implements the dependency-tracking engine: cells, computed
//! values, reactions, and the batching protocol that ties them together.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`Cell`] is a container for mutable state. Reading it inside a
//! tracked evaluation (a computed or a reaction) registers the reader as
//! an observer; writing a different value schedules every observer.
//!
//! ## Computeds
//!
//! A [`Computed`] is a derived value with a cache. It is pull-based: a
//! dependency change only marks it stale, and the recomputation happens on
//! the next read.
//!
//! ## Reactions
//!
//! A [`Reaction`] is push-based: it re-runs its side effect as soon as the
//! scheduler delivers a trigger. The gated form ([`reaction`]) splits
//! tracking from effect and fires the effect only when the tracked value
//! actually changes.
//!
//! ## Batching
//!
//! [`action`] and [`transaction`] defer all eager re-runs to the outermost
//! scope boundary, so related writes are observed atomically.
//!
//! # Implementation Notes
//!
//! Dependency discovery is dynamic: each evaluation re-records exactly the
//! reads it performs, so an `if`-guarded read tracks only the branch that
//! actually ran. The discovery mechanism is a thread-local evaluation
//! stack (this approach is used by MobX, SolidJS, Vue and Leptos alike);
//! graph state lives in an id-keyed arena so that handles stay small and
//! the mutual cell/derivation edges never form ownership cycles.

mod action;
mod arena;
mod cell;
mod computed;
mod context;
mod marshal;
mod reaction;
mod scheduler;

pub use action::{action, transaction, Transaction};
pub use arena::NodeId;
pub use cell::{Cell, Subscription};
pub use computed::Computed;
pub use context::is_tracking;
pub use marshal::{set_marshal, MarshalTask};
pub use reaction::{autorun, reaction, GatedReaction, Reaction};
pub use scheduler::{begin_batch, end_batch, pending_count};

pub(crate) use cell::Tracked;

/// Capability shared by everything that can be permanently shut down:
/// reactions, gated reactions, computeds and watch handles.
///
/// `Store::reconcile` collects these to manage derivation lifecycles
/// uniformly.
pub trait Disposable {
    /// Stop the unit of work. Implementations are idempotent.
    fn dispose(&self);
}
