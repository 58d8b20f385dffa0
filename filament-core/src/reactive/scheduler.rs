//! Batch Scheduler
//!
//! Decides whether a triggered derivation runs now or later. Outside a
//! batch, triggers run synchronously. Inside a batch, they accumulate in a
//! pending set and run once at the outermost batch boundary, which is what
//! makes several related writes observable atomically: an eager derivation
//! reading two cells written in one batch sees both old values or both new
//! values, never a mix.
//!
//! # How It Works
//!
//! 1. `begin_batch` increments a nesting depth; `end_batch` decrements it.
//!
//! 2. `schedule` either runs a node's trigger logic immediately (depth 0)
//!    or inserts its id into the pending set (deduplicated: a derivation
//!    triggered twice in one batch runs once).
//!
//! 3. When the outermost batch ends, the pending set is drained one entry
//!    at a time. Running an entry may schedule further entries; the drain
//!    keeps going until the set is empty, so all transitively affected
//!    derivations settle before the batch is considered complete.
//!
//! Draining one entry at a time (rather than snapshotting) means a panic
//! inside a running derivation leaves every not-yet-run entry queued; they
//! run at the next outermost batch boundary.
//!
//! All scheduler state is thread-local: graph mutation is confined to the
//! owning thread (cross-thread writes hop through the marshal first).

use std::cell::{Cell, RefCell};

use indexmap::IndexSet;
use tracing::trace;

use super::arena::{self, NodeId, Triggered};

thread_local! {
    static BATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
    static PENDING: RefCell<IndexSet<NodeId>> = RefCell::new(IndexSet::new());
}

/// Enter a batching scope. Nested batches are supported; only the
/// outermost boundary flushes.
pub fn begin_batch() {
    BATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
}

/// Exit a batching scope. When the outermost scope exits, run everything
/// that accumulated.
pub fn end_batch() {
    let depth = BATCH_DEPTH.with(|depth| {
        let value = depth.get().saturating_sub(1);
        depth.set(value);
        value
    });
    if depth == 0 {
        flush();
    }
}

/// Schedule a derivation whose dependency changed.
///
/// Inside a batch the id is queued (deduplicated); otherwise its trigger
/// logic runs immediately.
pub(crate) fn schedule(id: NodeId) {
    let batching = BATCH_DEPTH.with(|depth| depth.get()) > 0;
    if batching {
        let fresh = PENDING.with(|pending| pending.borrow_mut().insert(id));
        if fresh {
            trace!(node = id.raw(), "trigger deferred to batch flush");
        }
    } else {
        run_trigger(id);
    }
}

/// Execute one node's trigger logic.
///
/// Lazy derivations transition to dirty and forward the trigger to their
/// own observers; eager derivations re-run; everything else (cells,
/// reclaimed ids, already-dirty nodes) is a no-op.
fn run_trigger(id: NodeId) {
    match arena::resolve_trigger(id) {
        Triggered::Propagate(observers) => {
            for observer in observers {
                schedule(observer);
            }
        }
        Triggered::Run(run) => run(),
        Triggered::Ignore => {}
    }
}

/// Drain the pending set until no entries remain.
fn flush() {
    let mut ran = 0usize;
    loop {
        let next = PENDING.with(|pending| {
            let mut pending = pending.borrow_mut();
            if pending.is_empty() {
                None
            } else {
                pending.shift_remove_index(0)
            }
        });
        let Some(id) = next else { break };
        ran += 1;
        run_trigger(id);
    }
    if ran > 0 {
        trace!(count = ran, "batch flush complete");
    }
}

/// Number of derivations waiting for the current batch to end.
///
/// Useful for test assertions about batching behavior.
pub fn pending_count() -> usize {
    PENDING.with(|pending| pending.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::arena::NodeKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_reaction() -> (NodeId, Arc<AtomicUsize>) {
        let id = NodeId::next();
        let count = Arc::new(AtomicUsize::new(0));
        let run_count = Arc::clone(&count);
        arena::insert(
            id,
            NodeKind::Reaction {
                run: Arc::new(move || {
                    run_count.fetch_add(1, Ordering::SeqCst);
                }),
            },
        );
        (id, count)
    }

    #[test]
    fn trigger_outside_batch_runs_immediately() {
        let (id, count) = counting_reaction();

        schedule(id);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        arena::release(id);
    }

    #[test]
    fn batch_defers_and_deduplicates() {
        let (id, count) = counting_reaction();

        begin_batch();
        schedule(id);
        schedule(id);
        schedule(id);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(pending_count(), 1);
        end_batch();

        // Triggered three times inside the batch, ran once.
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(pending_count(), 0);

        arena::release(id);
    }

    #[test]
    fn nested_batches_flush_only_at_outermost() {
        let (id, count) = counting_reaction();

        begin_batch();
        begin_batch();
        schedule(id);
        end_batch();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        end_batch();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        arena::release(id);
    }

    #[test]
    fn entries_scheduled_during_flush_are_drained() {
        let first = NodeId::next();
        let (second, second_count) = counting_reaction();

        // The first reaction schedules the second from inside the flush,
        // wrapped in its own batch.
        arena::insert(
            first,
            NodeKind::Reaction {
                run: Arc::new(move || {
                    begin_batch();
                    schedule(second);
                    end_batch();
                }),
            },
        );

        begin_batch();
        schedule(first);
        end_batch();

        assert_eq!(second_count.load(Ordering::SeqCst), 1);

        arena::release(first);
        arena::release(second);
    }

    #[test]
    fn disposed_entries_are_silent_during_flush() {
        let (id, count) = counting_reaction();

        begin_batch();
        schedule(id);
        // Reclaimed before the flush reaches it.
        arena::release(id);
        end_batch();

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
