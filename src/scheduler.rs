//! The ready queue and main loop.
//!
//! The scheduler lives behind a thread-local handle rather than a
//! process-wide singleton (the runtime is single-threaded by contract,
//! but a process may still want independent runtimes per thread).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::SchedulerConfig;
use crate::fiber::{Fiber, FiberState};
use crate::reactor::{InterestMask, Reactor, ResumeReason};

pub(crate) struct Task {
    fiber: Box<Fiber>,
    reason: ResumeReason,
}

impl Task {
    pub(crate) fn new(fiber: Box<Fiber>, reason: ResumeReason) -> Task {
        Task { fiber, reason }
    }
}

/// Owns the ready queue, the reactor, and the recycle list for one
/// thread's runtime.
pub(crate) struct Scheduler {
    config: SchedulerConfig,
    ready_queue: VecDeque<Task>,
    reactor: Reactor,
    recycle_list: Vec<Box<Fiber>>,
    current_resume_reason: ResumeReason,
    /// The fiber the loop is currently resuming, temporarily parked here
    /// so that code running on its stack (register_io, yield_now) can
    /// claim ownership of it without the scheduler itself holding a
    /// borrow across the `resume()` call.
    in_flight: Option<Box<Fiber>>,
}

impl Scheduler {
    fn new(config: SchedulerConfig) -> Scheduler {
        let reactor = Reactor::new(&config.reactor).expect("failed to initialize reactor");
        Scheduler {
            config,
            ready_queue: VecDeque::new(),
            reactor,
            recycle_list: Vec::new(),
            current_resume_reason: ResumeReason::Normal,
            in_flight: None,
        }
    }

    fn recycle(&mut self, fiber: Box<Fiber>) {
        if self.recycle_list.len() < self.config.recycle_list_cap {
            self.recycle_list.push(fiber);
        }
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Scheduler>> = RefCell::new(None);
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Runs `f` with exclusive access to this thread's scheduler,
/// lazily creating one with default configuration on first use.
///
/// Must not be called reentrantly (i.e. from within another `with_current`
/// call on the same thread) — code running on a fiber's stack during
/// `Scheduler::run`'s call to `resume()` is fine, since that call is made
/// outside of any `with_current` borrow; see `run` below.
///
/// Crate-private: the scheduler's public surface is the free functions
/// below (`spawn`, `yield_now`, `register_io*`, `run`, `request_shutdown`),
/// not the `Scheduler` type itself.
pub(crate) fn with_current<F, R>(f: F) -> R
where
    F: FnOnce(&mut Scheduler) -> R,
{
    CURRENT.with(|cell| {
        let mut guard = cell.borrow_mut();
        if guard.is_none() {
            *guard = Some(Scheduler::new(SchedulerConfig::default()));
        }
        f(guard.as_mut().unwrap())
    })
}

/// Configures this thread's scheduler before first use. Panics if the
/// scheduler has already been created (by a prior `with_current` call).
pub fn init_current(config: SchedulerConfig) {
    CURRENT.with(|cell| {
        let mut guard = cell.borrow_mut();
        assert!(guard.is_none(), "scheduler already initialized on this thread");
        *guard = Some(Scheduler::new(config));
    });
}

/// Acquires a fiber (recycled or freshly allocated), binds `entry` to
/// it, and enqueues it to run with reason `Normal`.
pub fn spawn<F>(entry: F)
where
    F: FnOnce() + 'static,
{
    with_current(|s| {
        let fiber = match s.recycle_list.pop() {
            Some(mut fiber) => {
                fiber.reset(entry);
                fiber
            }
            None => Fiber::new(entry, s.config.fiber_stack_size)
                .expect("failed to allocate fiber stack"),
        };
        s.ready_queue.push_back(Task::new(fiber, ResumeReason::Normal));
    })
}

/// The reason the currently running fiber was most recently resumed.
pub fn current_resume_reason() -> ResumeReason {
    with_current(|s| s.current_resume_reason)
}

/// Self-enqueues the current fiber (reason `Normal`) and yields. The
/// fiber is guaranteed to run again only after every fiber already in
/// the ready queue and after one round of I/O polling.
pub fn yield_now() {
    with_current(|s| {
        let fiber = s
            .in_flight
            .take()
            .expect("yield_now called outside of a running fiber");
        s.ready_queue.push_back(Task::new(fiber, ResumeReason::Normal));
    });
    Fiber::yield_now();
}

/// Registers the current fiber's interest in `fd`, without a timeout.
/// Yields, then returns the resume reason.
pub fn register_io(fd: RawFd, interest: InterestMask) -> ResumeReason {
    register_io_impl(fd, interest, None)
}

/// As [`register_io`], but also arms a timer for `timeout` from now;
/// expiry surfaces as `IoTimeout`.
pub fn register_io_timeout(fd: RawFd, interest: InterestMask, timeout: Duration) -> ResumeReason {
    register_io_impl(fd, interest, Some(timeout))
}

fn register_io_impl(fd: RawFd, interest: InterestMask, timeout: Option<Duration>) -> ResumeReason {
    with_current(|s| {
        let fiber = s
            .in_flight
            .take()
            .expect("register_io called outside of a running fiber");
        trace!("register_io fd={} interest={:?} timeout={:?}", fd, interest, timeout);
        s.reactor
            .register_io(fd, interest, fiber, timeout)
            .expect("reactor registration failed");
    });
    Fiber::yield_now();
    current_resume_reason()
}

/// Registers the current fiber for a pure timeout at `deadline` (no I/O
/// descriptor). Yields, then returns the resume reason (always
/// `IoTimeout` in practice, since there is no alternate readiness).
pub fn register_timeout(deadline: Instant) -> ResumeReason {
    with_current(|s| {
        let fiber = s
            .in_flight
            .take()
            .expect("register_timeout called outside of a running fiber");
        trace!("register_timeout deadline={:?}", deadline);
        s.reactor
            .register_timeout(deadline, fiber)
            .expect("reactor registration failed");
    });
    Fiber::yield_now();
    current_resume_reason()
}

/// Sets the shutdown flag and interrupts a blocked poll, if any. Safe to
/// call from a signal handler or another thread: the flag store and the
/// wakeup write are each a single syscall-level operation with no lock.
/// The loop exits after the currently running fiber next yields or
/// terminates, without draining the ready queue.
pub fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
    crate::reactor::wake();
}

/// Runs the main loop on the current thread until the runtime becomes
/// idle (ready queue empty and no outstanding waiters) or shutdown is
/// requested.
///
/// Clears any pending shutdown request on entry, so a shutdown only ever
/// bounds the `run()` call it was requested during — not every `run()`
/// call made afterwards, on this thread or any other (the flag is
/// process-wide, like `reactor::WAKE_FD`).
pub fn run() {
    SHUTDOWN_REQUESTED.store(false, Ordering::SeqCst);
    loop {
        let active = with_current(|s| !s.ready_queue.is_empty() || s.reactor.waiter_count() > 0);
        if !active {
            debug!("runtime idle, exiting run loop");
            break;
        }

        let popped = with_current(|s| s.ready_queue.pop_front());
        if let Some(task) = popped {
            if task.fiber.state() != FiberState::Terminated {
                trace!("resuming fiber, reason={:?}", task.reason);
                let fiber_ptr: *mut Fiber = with_current(|s| {
                    s.current_resume_reason = task.reason;
                    s.in_flight = Some(task.fiber);
                    s.in_flight.as_deref_mut().unwrap() as *mut Fiber
                });

                // SAFETY: `fiber_ptr` points at the heap allocation just
                // stashed in `in_flight`. Nothing else touches that slot
                // while `resume` runs except code executing on the
                // fiber's own stack (via register_io/yield_now), which
                // only ever moves the `Box` out of the slot -- it never
                // frees or relocates the `Fiber` this pointer addresses.
                unsafe {
                    (*fiber_ptr).resume();
                }

                with_current(|s| {
                    if let Some(fiber) = s.in_flight.take() {
                        if fiber.state() == FiberState::Terminated {
                            s.recycle(fiber);
                        } else {
                            panic!(
                                "fiber suspended without registering with the reactor \
                                 (liveness contract violation)"
                            );
                        }
                    }
                });
            }
        }

        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            debug!("shutdown requested, exiting run loop");
            break;
        }

        let timeout_ms = with_current(|s| {
            if s.ready_queue.is_empty() && s.reactor.waiter_count() > 0 {
                -1
            } else {
                0
            }
        });
        with_current(|s| s.reactor.poll(timeout_ms, &mut s.ready_queue));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    // Each test runs on its own thread so the thread-local scheduler
    // starts fresh.
    fn run_isolated<F: FnOnce() + Send + 'static>(f: F) {
        std::thread::spawn(f).join().unwrap();
    }

    #[test]
    fn fifo_fairness() {
        run_isolated(|| {
            let log = Rc::new(RefCell::new(Vec::new()));
            let a = log.clone();
            let b = log.clone();
            spawn(move || a.borrow_mut().push("A"));
            spawn(move || b.borrow_mut().push("B"));
            run();
            assert_eq!(*log.borrow(), vec!["A", "B"]);
        });
    }

    #[test]
    fn yield_now_runs_after_queued_fibers() {
        run_isolated(|| {
            let log = Rc::new(RefCell::new(Vec::new()));
            let a = log.clone();
            spawn(move || {
                a.borrow_mut().push("A-start");
                yield_now();
                a.borrow_mut().push("A-end");
            });
            let b = log.clone();
            spawn(move || {
                b.borrow_mut().push("B");
            });
            run();
            assert_eq!(*log.borrow(), vec!["A-start", "B", "A-end"]);
        });
    }

    #[test]
    fn fiber_recycling_reuses_stacks() {
        run_isolated(|| {
            let mut seen = Vec::new();
            for i in 0..10 {
                spawn(move || {
                    let _ = i;
                });
                run();
                with_current(|s| {
                    if let Some(fiber) = s.recycle_list.last() {
                        seen.push(fiber.stack_identity());
                    }
                });
            }
            let unique: std::collections::HashSet<_> = seen.iter().collect();
            assert!(
                unique.len() < seen.len(),
                "expected at least one stack reused across 10 short-lived fibers, \
                 saw {} unique addresses out of {}",
                unique.len(),
                seen.len()
            );
        });
    }
}
