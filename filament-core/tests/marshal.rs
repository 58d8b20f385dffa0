//! Cross-thread Marshal Tests
//!
//! The marshal is configured once per process and captures the configuring
//! thread as the owner, so everything that exercises it lives in this one
//! test function: parallel test threads in the same binary would otherwise
//! race on who the owner is.
//!
//! The harness is a plain channel: routed writes land in the receiver as
//! closures, and the owner thread applies them by draining it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use filament_core::{autorun, set_marshal, watch, Cell, Disposable, MarshalTask};

fn wait_for(flag: &AtomicBool) {
    for _ in 0..400 {
        if flag.load(Ordering::SeqCst) {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("background worker never finished");
}

#[test]
fn marshal_routes_background_writes_to_the_owner_thread() {
    let (sender, receiver) = mpsc::channel::<MarshalTask>();
    let sender = Mutex::new(sender);
    set_marshal(move |task| {
        sender.lock().send(task).expect("owner thread receiver gone");
    });
    let drain = |receiver: &mpsc::Receiver<MarshalTask>| {
        while let Ok(task) = receiver.try_recv() {
            task();
        }
    };

    let cell = Cell::new(0);
    let log = Arc::new(Mutex::new(Vec::new()));

    let (cell_inner, log_inner) = (cell.clone(), Arc::clone(&log));
    let _r = autorun(move || log_inner.lock().push(cell_inner.get()));
    assert_eq!(*log.lock(), vec![0]);

    // Owner-thread writes stay synchronous.
    cell.set(1);
    assert_eq!(*log.lock(), vec![0, 1]);

    // Background writes are deferred: nothing lands until the owner
    // drains, and the caller does not block.
    let writer = cell.clone();
    let handle = thread::spawn(move || {
        writer.set(2);
        writer.set(3);
        writer.set(4);
    });
    handle.join().expect("background writer panicked");

    assert_eq!(cell.get_untracked(), 1);
    assert_eq!(*log.lock(), vec![0, 1]);

    // Draining applies them in submission order.
    drain(&receiver);
    assert_eq!(cell.get_untracked(), 4);
    assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);

    // Equality dedup still applies after the hop.
    let writer = cell.clone();
    thread::spawn(move || writer.set(4))
        .join()
        .expect("background writer panicked");
    drain(&receiver);
    assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);

    // A watched worker mutates cells the same way.
    let status = Cell::new("running");
    let finished = Arc::new(AtomicBool::new(false));

    let (status_inner, finished_inner) = (status.clone(), Arc::clone(&finished));
    let worker = watch(move |handle| {
        while !handle.is_disposed() {
            thread::sleep(Duration::from_millis(2));
        }
        status_inner.set("stopped");
        finished_inner.store(true, Ordering::SeqCst);
    });

    worker.dispose();
    wait_for(&finished);

    // The write is parked in the channel until the owner applies it.
    assert_eq!(status.get_untracked(), "running");
    drain(&receiver);
    assert_eq!(status.get_untracked(), "stopped");
}
