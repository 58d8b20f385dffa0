//! watch(): run a function on a managed background thread.
//!
//! `Cell::set` already marshals cross-thread mutations (see
//! `reactive::set_marshal`), so this helper is purely about thread
//! lifecycle: spawn the worker, hand it a stop flag, never interrupt it
//! forcibly. Long-running workers poll [`WatchHandle::is_disposed`] and
//! exit on their own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::reactive::Disposable;

/// Cooperative stop flag for a watched background thread.
#[derive(Clone, Debug)]
pub struct WatchHandle {
    disposed: Arc<AtomicBool>,
}

impl WatchHandle {
    /// Whether `dispose()` has been called. Workers poll this in their
    /// loop.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Disposable for WatchHandle {
    /// Signal the worker to stop. The thread is not interrupted; it exits
    /// the next time it checks the flag.
    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

/// Run `work` on a detached background thread.
///
/// The worker receives its own clone of the handle; mutate cells from it
/// freely; writes hop through the marshal when one is configured.
///
/// ```ignore
/// let alive = Cell::new(true);
/// let alive_inner = alive.clone();
/// let handle = watch(move |handle| {
///     while !handle.is_disposed() && probe() {
///         std::thread::sleep(Duration::from_secs(2));
///     }
///     alive_inner.set(false);
/// });
/// ```
pub fn watch<F>(work: F) -> WatchHandle
where
    F: FnOnce(WatchHandle) + Send + 'static,
{
    let handle = WatchHandle {
        disposed: Arc::new(AtomicBool::new(false)),
    };
    let worker = handle.clone();
    thread::spawn(move || work(worker));
    handle
}
