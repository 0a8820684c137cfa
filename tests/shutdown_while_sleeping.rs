//! S6: `request_shutdown` cuts the loop short instead of waiting out a
//! long-sleeping fiber.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fiberio::awaitable::{Awaitable, Timeout};
use fiberio::scheduler;

#[test]
fn shutdown_cuts_loop_short() {
    let resumed = Arc::new(AtomicBool::new(false));
    let resumed2 = resumed.clone();

    scheduler::spawn(move || {
        Timeout::new(Duration::from_secs(10)).await_();
        resumed2.store(true, Ordering::SeqCst);
    });

    thread::spawn(|| {
        thread::sleep(Duration::from_millis(100));
        scheduler::request_shutdown();
    });

    let start = Instant::now();
    scheduler::run();
    let elapsed = start.elapsed();

    assert!(
        elapsed < Duration::from_secs(2),
        "loop should exit near t=100ms, not wait out the 10s sleep; took {:?}",
        elapsed
    );
    assert!(
        !resumed.load(Ordering::SeqCst),
        "the sleeping fiber must not get a chance to resume"
    );
}
