//! Push-based event streams with operator chaining.
//!
//! A minimal eventing layer, independent of the tracked graph: emit
//! values, subscribe callbacks, compose with `map`/`filter`/`debounce`.
//! Each operator returns a new downstream stream; `dispose()` tears down
//! the whole downstream tree.
//!
//! A disposed stream goes inert rather than detaching its upstream feed:
//! the parent may keep pushing, and the dead child silently drops the
//! events. Disposal also unlinks the child from its parent's teardown
//! list, so the tree never double-disposes.

use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::reactive::Disposable;

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;
type Teardown = Box<dyn Fn() + Send + Sync>;
type Unlink = Box<dyn FnOnce() + Send + Sync>;

static STREAM_KEYS: AtomicU64 = AtomicU64::new(0);

struct StreamInner<T> {
    subscribers: RwLock<Vec<(u64, Callback<T>)>>,
    /// Dispose hooks for downstream streams created by operators.
    children: RwLock<Vec<(u64, Teardown)>>,
    /// Removes this stream from its parent's children list.
    unlink: RwLock<Option<Unlink>>,
    disposed: AtomicBool,
}

/// Teardown handle for one subscriber. `unsubscribe` is idempotent;
/// dropping the handle does not unsubscribe.
pub struct StreamSubscription {
    cancel: Box<dyn Fn() + Send + Sync>,
}

impl StreamSubscription {
    pub fn unsubscribe(&self) {
        (self.cancel)();
    }
}

/// A push-based event stream.
///
/// ```ignore
/// let clicks: EventStream<u32> = EventStream::new();
/// let evens = clicks.filter(|n| n % 2 == 0);
/// let labels = evens.map(|n| format!("#{n}"));
/// let sub = labels.subscribe(|label| println!("{label}"));
///
/// clicks.emit(1); // filtered out
/// clicks.emit(2); // prints "#2"
/// sub.unsubscribe();
/// clicks.dispose(); // tears down evens and labels too
/// ```
pub struct EventStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<StreamInner<T>>,
}

impl<T> EventStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StreamInner {
                subscribers: RwLock::new(Vec::new()),
                children: RwLock::new(Vec::new()),
                unlink: RwLock::new(None),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Push a value to all subscribers, in subscription order. A disposed
    /// stream drops the value silently.
    pub fn emit(&self, value: T) {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return;
        }
        let snapshot: SmallVec<[Callback<T>; 4]> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(value.clone());
        }
    }

    /// Register a callback for every emitted value.
    pub fn subscribe<F>(&self, callback: F) -> StreamSubscription
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let key = STREAM_KEYS.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.write().push((key, Arc::new(callback)));

        let weak: Weak<StreamInner<T>> = Arc::downgrade(&self.inner);
        StreamSubscription {
            cancel: Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.subscribers.write().retain(|(k, _)| *k != key);
                }
            }),
        }
    }

    /// Transform each event through `f`.
    pub fn map<U, F>(&self, f: F) -> EventStream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let child = EventStream::new();
        self.adopt(&child);
        let downstream = child.clone();
        self.feed(move |value| downstream.emit(f(value)));
        child
    }

    /// Pass through only events for which `keep` returns true.
    pub fn filter<F>(&self, keep: F) -> EventStream<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let child = EventStream::new();
        self.adopt(&child);
        let downstream = child.clone();
        self.feed(move |value| {
            if keep(&value) {
                downstream.emit(value);
            }
        });
        child
    }

    /// Coalesce bursts: deliver an event only after `quiet` elapses with
    /// no newer event. Each event re-arms the timer, so only the last
    /// event of a burst comes through. Delivery happens on a timer thread.
    pub fn debounce(&self, quiet: Duration) -> EventStream<T> {
        let child = EventStream::new();
        self.adopt(&child);
        let generation = Arc::new(AtomicU64::new(0));
        let downstream = child.clone();
        self.feed(move |value| {
            let armed = generation.fetch_add(1, Ordering::SeqCst) + 1;
            let generation = Arc::clone(&generation);
            let downstream = downstream.clone();
            thread::spawn(move || {
                thread::sleep(quiet);
                if generation.load(Ordering::SeqCst) == armed {
                    downstream.emit(value);
                }
            });
        });
        child
    }

    /// Tear down this stream and every stream derived from it.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.subscribers.write().clear();
        let children = mem::take(&mut *self.inner.children.write());
        for (_, teardown) in children {
            teardown();
        }
        let unlink = self.inner.unlink.write().take();
        if let Some(unlink) = unlink {
            unlink();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Internal subscribe used by operators; the feed stays attached for
    /// the parent's lifetime (a disposed child just ignores the events).
    fn feed<F>(&self, callback: F)
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let key = STREAM_KEYS.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.write().push((key, Arc::new(callback)));
    }

    /// Register `child` for dispose propagation and give it an unlink hook
    /// pointing back here.
    fn adopt<U>(&self, child: &EventStream<U>)
    where
        U: Clone + Send + Sync + 'static,
    {
        let key = STREAM_KEYS.fetch_add(1, Ordering::Relaxed);
        let downstream = child.clone();
        self.inner
            .children
            .write()
            .push((key, Box::new(move || downstream.dispose())));

        let parent: Weak<StreamInner<T>> = Arc::downgrade(&self.inner);
        *child.inner.unlink.write() = Some(Box::new(move || {
            if let Some(parent) = parent.upgrade() {
                parent.children.write().retain(|(k, _)| *k != key);
            }
        }));
    }
}

impl<T> Disposable for EventStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn dispose(&self) {
        EventStream::dispose(self);
    }
}

impl<T> Default for EventStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EventStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
