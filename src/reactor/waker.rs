//! Cross-thread wakeup for a blocked `epoll_wait`, the way `mio`'s own
//! `Awakener` uses an `eventfd` on Linux.
//!
//! [`crate::scheduler::request_shutdown`] is documented async-signal-safe
//! (a single atomic store), but a loop parked in an infinite-timeout
//! `poll` has no other way to notice that store until its next kernel
//! event. `Waker::wake` bridges that gap: `eventfd_write` is itself just
//! a `write(2)` and is async-signal-safe, so firing it from a signal
//! handler or another thread is sound.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

pub(crate) struct Waker {
    fd: OwnedFd,
}

impl Waker {
    pub(crate) fn new() -> io::Result<Waker> {
        // SAFETY: `eventfd` returns either a valid owned fd or -1.
        let fd = unsafe {
            OwnedFd::from_raw_fd(syscall!(eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC))?)
        };
        Ok(Waker { fd })
    }

    pub(crate) fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Wakes a thread blocked in `epoll_wait` on this waker's descriptor.
    /// Only the side effect matters; the written value is never read
    /// back (the fd is never drained), since a wakeup is only ever
    /// needed to interrupt at most one blocking wait before the loop
    /// re-checks the shutdown flag and exits.
    pub(crate) fn wake(fd: RawFd) {
        let value: u64 = 1;
        // SAFETY: `fd` is expected to be a live eventfd; a write to a fd
        // that has already been closed merely fails with `EBADF`, which
        // we ignore (the loop it would have woken is already gone).
        unsafe {
            libc::write(fd, &value as *const u64 as *const libc::c_void, 8);
        }
    }
}
