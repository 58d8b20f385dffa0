//! Actions and transactions: scoped batching.
//!
//! Both forms are nothing more than `begin_batch` on entry and `end_batch`
//! on every exit path, so derivations triggered by the wrapped writes run
//! once, at the outermost boundary, instead of after each individual write.
//!
//! `action` wraps a closure; `transaction` returns a guard for block-scoped
//! use. The guard ends the batch on drop, which also covers panics: the
//! depth counter is always restored, and whatever was already pending runs
//! at the boundary.

use super::scheduler::{begin_batch, end_batch};

/// Guard holding one level of batch nesting. Ends the batch when dropped.
#[must_use = "the batch ends when the guard drops; binding it to `_` ends it immediately"]
pub struct Transaction {
    _private: (),
}

impl Transaction {
    fn enter() -> Self {
        begin_batch();
        Self { _private: () }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        end_batch();
    }
}

/// Run `f` inside a batch. The return value passes through unchanged.
///
/// Writes performed inside `f` (directly or transitively) are observed
/// atomically: dependent derivations run once, after `f` returns.
///
/// ```ignore
/// let a = Cell::new(0);
/// let b = Cell::new(0);
///
/// action(|| {
///     a.set(1);
///     b.set(2);
///     // observers see (1, 2) here, never (1, 0)
/// });
/// ```
pub fn action<R>(f: impl FnOnce() -> R) -> R {
    let _guard = Transaction::enter();
    f()
}

/// Begin a block-scoped batch.
///
/// ```ignore
/// {
///     let _tx = transaction();
///     a.set(1);
///     b.set(2);
/// } // flush happens here
/// ```
pub fn transaction() -> Transaction {
    Transaction::enter()
}
