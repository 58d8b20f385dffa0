//! Cross-thread Marshal
//!
//! The reactive graph is mutated from exactly one logical owner thread.
//! Other threads are still allowed to call `Cell::set`; when a marshal is
//! configured, such writes are packaged as closures and handed to the
//! marshal callback, which is responsible for executing them on the owner
//! thread (for example by posting to an event loop or draining a channel).
//!
//! Configuration is a one-time global: `set_marshal` implicitly captures
//! the calling thread as the owner. Until it is called, writes from any
//! thread apply directly and synchronization is the caller's problem.
//!
//! The hop is fire-and-forget: a marshaled write is not guaranteed to be
//! visible before `set` returns. Closures posted from one source thread
//! are expected to run in submission order; no order is promised across
//! different source threads.

use std::sync::{Arc, LazyLock};
use std::thread::{self, ThreadId};

use parking_lot::RwLock;
use tracing::{debug, trace};

/// A deferred cell mutation, ready to run on the owner thread.
pub type MarshalTask = Box<dyn FnOnce() + Send + 'static>;

struct MarshalConfig {
    post: Arc<dyn Fn(MarshalTask) + Send + Sync>,
    owner: ThreadId,
}

static MARSHAL: LazyLock<RwLock<Option<MarshalConfig>>> = LazyLock::new(|| RwLock::new(None));

/// Install the global marshal callback.
///
/// The calling thread becomes the owner thread: writes from any other
/// thread are routed through `post` from now on. Calling this again
/// replaces the callback and re-captures the owner.
pub fn set_marshal<F>(post: F)
where
    F: Fn(MarshalTask) + Send + Sync + 'static,
{
    let owner = thread::current().id();
    *MARSHAL.write() = Some(MarshalConfig {
        post: Arc::new(post),
        owner,
    });
    debug!("cross-thread marshal configured");
}

/// Route a mutation through the marshal if one is configured and we are
/// off the owner thread. Returns the task back to the caller for inline
/// execution otherwise.
pub(crate) fn route<F>(task: F) -> Option<F>
where
    F: FnOnce() + Send + 'static,
{
    let guard = MARSHAL.read();
    match &*guard {
        Some(config) if thread::current().id() != config.owner => {
            let post = Arc::clone(&config.post);
            drop(guard);
            trace!("routing cell write to owner thread");
            post(Box::new(task));
            None
        }
        _ => Some(task),
    }
}
