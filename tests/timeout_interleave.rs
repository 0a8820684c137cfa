//! S1: two timeouts of different durations interleave through the
//! scheduler rather than blocking each other.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use fiberio::awaitable::{Awaitable, Timeout};
use fiberio::scheduler;

#[test]
fn two_timeouts_interleave_in_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let start = Instant::now();

    let a = log.clone();
    scheduler::spawn(move || {
        a.borrow_mut().push("A-start");
        Timeout::new(Duration::from_millis(100)).await_();
        a.borrow_mut().push("A-end");
    });

    let b = log.clone();
    scheduler::spawn(move || {
        b.borrow_mut().push("B-start");
        Timeout::new(Duration::from_millis(50)).await_();
        b.borrow_mut().push("B-end");
    });

    scheduler::run();

    assert_eq!(
        *log.borrow(),
        vec!["A-start", "B-start", "B-end", "A-end"]
    );
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(100), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(500), "elapsed {:?}", elapsed);
}
