//! The I/O reactor: owns the epoll selector and the waiter table, and
//! translates kernel readiness into [`ResumeReason`]s handed back to the
//! scheduler.

mod payload;
mod selector;
mod timerfd;
mod waker;

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::io;
use std::ops;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};

use crate::config::ReactorConfig;
use crate::fiber::Fiber;
use crate::scheduler::Task;

use self::payload::{DescriptorTag, EventPayload};
use self::selector::{Events, Selector};
use self::timerfd::TimerFd;
use self::waker::Waker;

/// The wakeup descriptor of whichever `Reactor` was constructed most
/// recently, so [`crate::scheduler::request_shutdown`] can interrupt a
/// blocked `epoll_wait` even when called from another thread (or a
/// signal handler). Last-writer-wins: this crate's contract is one
/// scheduler loop per process, matching the "global scheduler" shape
/// discussed in the design notes, just thread-local instead of
/// process-global.
static WAKE_FD: AtomicI32 = AtomicI32::new(-1);

/// Interrupts whichever thread's reactor most recently registered a
/// waker. A no-op if no reactor has been constructed yet.
pub(crate) fn wake() {
    let fd = WAKE_FD.load(Ordering::SeqCst);
    if fd >= 0 {
        Waker::wake(fd);
    }
}

/// Readiness interest registered for a descriptor.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct InterestMask(u8);

impl InterestMask {
    pub const READ: InterestMask = InterestMask(0b01);
    pub const WRITE: InterestMask = InterestMask(0b10);

    pub const fn is_readable(self) -> bool {
        self.0 & Self::READ.0 != 0
    }

    pub const fn is_writable(self) -> bool {
        self.0 & Self::WRITE.0 != 0
    }
}

impl ops::BitOr for InterestMask {
    type Output = InterestMask;
    fn bitor(self, rhs: InterestMask) -> InterestMask {
        InterestMask(self.0 | rhs.0)
    }
}

impl fmt::Debug for InterestMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.is_readable() {
            parts.push("READ");
        }
        if self.is_writable() {
            parts.push("WRITE");
        }
        write!(f, "{}", parts.join("|"))
    }
}

/// The reason a fiber is being resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeReason {
    /// Not resumed by the reactor (spawned, or self re-enqueued).
    Normal,
    /// The registered descriptor (or one side of a paired registration)
    /// reported read or write readiness.
    IoReady,
    /// The registration's timer fired before the I/O descriptor did.
    IoTimeout,
    /// The kernel reported an error condition on the descriptor.
    IoError,
    /// The peer hung up.
    IoHup,
}

struct WaiterEntry {
    fiber: Box<Fiber>,
    timer: Option<TimerFd>,
}

pub(crate) struct Reactor {
    selector: Selector,
    waiters: HashMap<RawFd, WaiterEntry>,
    /// timer fd -> the fd it is keyed under in `waiters`.
    aliases: HashMap<RawFd, RawFd>,
    events: Events,
    /// This reactor's own waker descriptor: registered with the selector
    /// but deliberately never given a waiter-table entry, so dispatch
    /// must recognize it by value rather than treat its absence from the
    /// waiter table as a programmer error.
    waker_fd: RawFd,
    /// Kept alive for as long as the reactor is; never looked up again
    /// after registration (its fd is also published to `WAKE_FD`).
    _waker: Waker,
}

impl Reactor {
    pub(crate) fn new(config: &ReactorConfig) -> io::Result<Reactor> {
        let selector = Selector::new()?;
        let waker = Waker::new()?;
        let waker_fd = waker.as_raw_fd();
        let tag = DescriptorTag { fd: waker_fd, is_timer: false };
        selector.register(waker_fd, InterestMask::READ, EventPayload::new(tag, None).raw())?;
        WAKE_FD.store(waker_fd, Ordering::SeqCst);

        Ok(Reactor {
            selector,
            waiters: HashMap::new(),
            aliases: HashMap::new(),
            events: Events::with_capacity(config.event_batch_capacity),
            waker_fd,
            _waker: waker,
        })
    }

    pub(crate) fn waiter_count(&self) -> usize {
        self.waiters.len()
    }

    /// Associates the current fiber with `fd`, optionally pairing it with
    /// a timer armed for `timeout` from now.
    pub(crate) fn register_io(
        &mut self,
        fd: RawFd,
        interest: InterestMask,
        fiber: Box<Fiber>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        assert!(
            !self.waiters.contains_key(&fd) && !self.aliases.contains_key(&fd),
            "descriptor {} is already registered with the reactor",
            fd
        );

        let timer = match timeout {
            Some(d) => Some(TimerFd::new(Instant::now() + d)?),
            None => None,
        };

        let io_tag = DescriptorTag { fd, is_timer: false };
        let timer_tag = timer
            .as_ref()
            .map(|t| DescriptorTag { fd: t.as_raw_fd(), is_timer: true });

        let io_payload = EventPayload::new(io_tag, timer_tag);
        if let Err(e) = self.selector.register(fd, interest, io_payload.raw()) {
            return Err(e);
        }

        if let Some(t) = &timer {
            let timer_fd = t.as_raw_fd();
            let timer_payload = EventPayload::new(timer_tag.unwrap(), Some(io_tag));
            if let Err(e) = self.selector.register(timer_fd, InterestMask::READ, timer_payload.raw()) {
                let _ = self.selector.deregister(fd);
                return Err(e);
            }
            self.aliases.insert(timer_fd, fd);
        }

        self.waiters.insert(fd, WaiterEntry { fiber, timer });
        Ok(())
    }

    /// Associates the current fiber with a pure timeout: a timer
    /// descriptor registered as if it were the primary I/O descriptor.
    pub(crate) fn register_timeout(&mut self, deadline: Instant, fiber: Box<Fiber>) -> io::Result<()> {
        let timer = TimerFd::new(deadline)?;
        let fd = timer.as_raw_fd();
        let tag = DescriptorTag { fd, is_timer: true };
        let payload = EventPayload::new(tag, None);
        self.selector.register(fd, InterestMask::READ, payload.raw())?;
        self.waiters.insert(fd, WaiterEntry { fiber, timer: Some(timer) });
        Ok(())
    }

    /// Drains one batch of ready events and enqueues each waiter's fiber
    /// into `ready_queue` with the resume reason it earned.
    pub(crate) fn poll(&mut self, timeout_ms: i32, ready_queue: &mut VecDeque<Task>) {
        let timeout = if timeout_ms < 0 {
            None
        } else {
            Some(Duration::from_millis(timeout_ms as u64))
        };

        if let Err(e) = self.selector.select(&mut self.events, timeout) {
            panic!(
                "epoll_wait failed: {} (errno {:?})",
                e,
                e.raw_os_error()
            );
        }

        let dispatched: Vec<(DescriptorTag, ResumeReason)> = self
            .events
            .iter()
            .map(|event| {
                let payload = EventPayload::from_raw(selector::payload_of(event));
                let primary = payload.primary();
                (primary, classify(event, primary.is_timer))
            })
            .collect();

        // Descriptors already resolved earlier in this same batch (an I/O
        // descriptor and its paired timer can both report readiness in one
        // `epoll_wait`): tracked so the fallback below can tell "already
        // handled via its pair a moment ago" apart from a genuinely
        // unknown descriptor.
        let mut retired: HashSet<RawFd> = HashSet::new();

        for (primary, reason) in dispatched {
            let owner_fd = if self.waiters.contains_key(&primary.fd) {
                primary.fd
            } else if let Some(&owner) = self.aliases.get(&primary.fd) {
                owner
            } else if primary.fd == self.waker_fd {
                // The waker has no waiter-table entry by design; its
                // event carries no fiber to wake, just the interrupt.
                continue;
            } else if retired.contains(&primary.fd) {
                // Already dispatched via its paired descriptor earlier in
                // this same batch.
                continue;
            } else {
                panic!(
                    "reactor dispatched an unknown descriptor {} (not a waiter, \
                     alias, the waker, or already retired this batch) -- \
                     this indicates registration bookkeeping has diverged \
                     from the kernel's interest set",
                    primary.fd
                );
            };

            let entry = match self.waiters.remove(&owner_fd) {
                Some(e) => e,
                None => continue,
            };

            retired.insert(owner_fd);
            let _ = self.selector.deregister(owner_fd);
            if let Some(timer) = &entry.timer {
                let timer_fd = timer.as_raw_fd();
                if timer_fd != owner_fd {
                    retired.insert(timer_fd);
                    let _ = self.selector.deregister(timer_fd);
                    self.aliases.remove(&timer_fd);
                }
            }

            ready_queue.push_back(Task::new(entry.fiber, reason));
        }
    }
}

fn classify(event: &libc::epoll_event, timer_origin: bool) -> ResumeReason {
    if selector::is_hup(event) {
        ResumeReason::IoHup
    } else if selector::is_error(event) {
        ResumeReason::IoError
    } else if selector::is_readable(event) {
        if timer_origin {
            ResumeReason::IoTimeout
        } else {
            ResumeReason::IoReady
        }
    } else {
        ResumeReason::IoReady
    }
}
