use std::time::{Duration, Instant};

use super::PollingAwaitable;
use crate::scheduler;

/// Suspends the current fiber until a fixed duration has elapsed.
///
/// The deadline is computed at construction time, not at the first
/// `await_` — a `Timeout` built now and awaited later still measures
/// from now.
pub struct Timeout {
    deadline: Instant,
    fired: bool,
}

impl Timeout {
    pub fn new(duration: Duration) -> Timeout {
        Timeout {
            deadline: Instant::now() + duration,
            fired: false,
        }
    }
}

impl PollingAwaitable for Timeout {
    type Output = ();

    fn is_done(&mut self) -> bool {
        if self.fired {
            return true;
        }
        // Whatever reason we're resumed for, there is no alternate
        // readiness to check: the registration itself *is* the wait.
        scheduler::register_timeout(self.deadline);
        self.fired = true;
        true
    }

    fn get_value(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awaitable::Awaitable;

    #[test]
    fn resumes_after_deadline() {
        std::thread::spawn(|| {
            let start = Instant::now();
            crate::scheduler::spawn(move || {
                Timeout::new(Duration::from_millis(20)).await_();
                assert!(start.elapsed() >= Duration::from_millis(20));
            });
            crate::scheduler::run();
        })
        .join()
        .unwrap();
    }
}
