//! ResolveGate Tests
//!
//! Tests verify:
//! - Tickets are counted while held
//! - A waiter blocks on tickets entered before it
//! - A waiter ignores tickets entered after it, and never blocks entry

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use atlasblob::sync::ResolveGate;
use crossbeam::channel;

/// Poll until `flag` is set or `timeout` passes
fn wait_for(flag: &AtomicBool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if flag.load(Ordering::SeqCst) {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    flag.load(Ordering::SeqCst)
}

/// Run `wait_for_resolving` on another thread, flagging when it returns
fn spawn_waiter(gate: &Arc<ResolveGate>) -> (thread::JoinHandle<()>, Arc<AtomicBool>) {
    let finished = Arc::new(AtomicBool::new(false));
    let handle = {
        let gate = Arc::clone(gate);
        let finished = Arc::clone(&finished);
        thread::spawn(move || {
            gate.wait_for_resolving();
            finished.store(true, Ordering::SeqCst);
        })
    };
    (handle, finished)
}

#[test]
fn test_tickets_are_counted() {
    let gate = ResolveGate::new();
    assert_eq!(gate.resolving(), 0);

    let a = gate.enter();
    let b = gate.enter();
    assert_eq!(gate.resolving(), 2);

    drop(a);
    drop(b);
    assert_eq!(gate.resolving(), 0);
}

#[test]
fn test_wait_without_tickets_returns() {
    let gate = ResolveGate::new();
    gate.wait_for_resolving();
    gate.wait_for_resolving();

    let _ticket = gate.enter();
    assert_eq!(gate.resolving(), 1);
}

#[test]
fn test_waiter_blocks_on_earlier_ticket() {
    let gate = Arc::new(ResolveGate::new());
    let ticket = gate.enter();

    let (waiter, finished) = spawn_waiter(&gate);

    thread::sleep(Duration::from_millis(50));
    assert!(!finished.load(Ordering::SeqCst));

    drop(ticket);
    assert!(wait_for(&finished, Duration::from_secs(5)));
    waiter.join().unwrap();
}

#[test]
fn test_waiter_ignores_later_tickets() {
    let gate = Arc::new(ResolveGate::new());
    let early = gate.enter();

    let (waiter, finished) = spawn_waiter(&gate);
    let deadline = Instant::now() + Duration::from_secs(5);
    while gate.epoch() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(gate.epoch(), 1);

    // Entering never blocks, even while a waiter is parked
    let (entered_tx, entered_rx) = channel::bounded(1);
    let late_gate = Arc::clone(&gate);
    let (release_tx, release_rx) = channel::bounded::<()>(1);
    let late = thread::spawn(move || {
        let _ticket = late_gate.enter();
        entered_tx.send(()).unwrap();
        release_rx.recv().unwrap();
    });
    entered_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("enter blocked behind a waiter");

    // The waiter only cares about the early ticket
    drop(early);
    assert!(wait_for(&finished, Duration::from_secs(5)));
    assert_eq!(gate.resolving(), 1);

    release_tx.send(()).unwrap();
    late.join().unwrap();
    waiter.join().unwrap();
    assert_eq!(gate.resolving(), 0);
}

#[test]
fn test_concurrent_waiters_and_tickets() {
    let gate = Arc::new(ResolveGate::new());
    let stop = Arc::new(AtomicBool::new(false));

    let mut entrants = vec![];
    for _ in 0..4 {
        let gate = Arc::clone(&gate);
        let stop = Arc::clone(&stop);
        entrants.push(thread::spawn(move || {
            let mut entered = 0u64;
            loop {
                let _ticket = gate.enter();
                entered += 1;
                if stop.load(Ordering::SeqCst) {
                    break entered;
                }
            }
        }));
    }

    let mut waiters = vec![];
    for _ in 0..2 {
        let gate = Arc::clone(&gate);
        waiters.push(thread::spawn(move || {
            for _ in 0..200 {
                gate.wait_for_resolving();
            }
        }));
    }

    for waiter in waiters {
        waiter.join().unwrap();
    }
    stop.store(true, Ordering::SeqCst);

    let total: u64 = entrants.into_iter().map(|h| h.join().unwrap()).sum();
    assert!(total >= 4);
    assert_eq!(gate.epoch(), 400);
    assert_eq!(gate.resolving(), 0);
}
