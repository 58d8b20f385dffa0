//! Filament Core
//!
//! This crate provides the core runtime for Filament's fine-grained
//! reactive state. It implements:
//!
//! - Reactive primitives (cells, computeds, reactions)
//! - Automatic, per-evaluation dependency tracking
//! - Batched, glitch-free propagation (actions / transactions)
//! - A cross-thread marshal for writes from background threads
//! - Observable collections, event streams, a keyed store and a managed
//!   worker helper built on top of the same primitives
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: the dependency-tracking engine (arena, evaluation
//!   context, cells, derivations, scheduler, batching, marshal)
//! - `collections`: observable sequence and map wrappers
//! - `stream`: push-based event streams with operator chaining
//! - `store`: key-named cell container with schema evolution
//! - `watch`: background worker threads with cooperative shutdown
//!
//! # Example
//!
//! ```ignore
//! use filament_core::{Cell, Computed, autorun, action};
//!
//! let count = Cell::new(0);
//!
//! let count_for_double = count.clone();
//! let doubled = Computed::new(move || count_for_double.get() * 2);
//!
//! let count_for_log = count.clone();
//! let doubled_for_log = doubled.clone();
//! let logger = autorun(move || {
//!     println!("count = {}, doubled = {}",
//!         count_for_log.get(), doubled_for_log.get());
//! });
//!
//! count.set(5);
//! // Reaction runs once, prints: "count = 5, doubled = 10"
//! logger.dispose();
//! ```

pub mod collections;
pub mod reactive;
pub mod store;
pub mod stream;
pub mod watch;

pub use collections::{ObservableMap, ObservableVec};
pub use reactive::{
    action, autorun, begin_batch, end_batch, is_tracking, pending_count, reaction, set_marshal,
    transaction, Cell, Computed, Disposable, GatedReaction, MarshalTask, NodeId, Reaction,
    Subscription, Transaction,
};
pub use store::{disposer, Disposers, Store};
pub use stream::{EventStream, StreamSubscription};
pub use watch::{watch, WatchHandle};
