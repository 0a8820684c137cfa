//! A Linux `timerfd` that becomes readable when an absolute monotonic
//! deadline elapses.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Instant;

pub(crate) struct TimerFd {
    fd: OwnedFd,
}

impl TimerFd {
    /// Creates a timer descriptor armed to fire once `deadline` elapses.
    pub(crate) fn new(deadline: Instant) -> io::Result<TimerFd> {
        // SAFETY: `timerfd_create` returns a valid owned fd or -1.
        let fd = unsafe {
            OwnedFd::from_raw_fd(syscall!(timerfd_create(
                libc::CLOCK_MONOTONIC,
                libc::TFD_NONBLOCK | libc::TFD_CLOEXEC,
            ))?)
        };
        let timer = TimerFd { fd };
        timer.arm(deadline)?;
        Ok(timer)
    }

    fn arm(&self, deadline: Instant) -> io::Result<()> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let spec = libc::itimerspec {
            it_interval: libc::timespec {
                tv_sec: 0,
                tv_nsec: 0,
            },
            it_value: libc::timespec {
                tv_sec: remaining.as_secs() as libc::time_t,
                // A zero-valued `it_value` disarms the timer instead of
                // firing immediately; clamp to 1ns so an already-elapsed
                // deadline still fires on the next poll.
                tv_nsec: (remaining.subsec_nanos().max(1)) as i64,
            },
        };
        syscall!(timerfd_settime(self.fd.as_raw_fd(), 0, &spec, std::ptr::null_mut())).map(|_| ())
    }

    pub(crate) fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
