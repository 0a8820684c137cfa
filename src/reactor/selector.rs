//! Thin wrapper around Linux `epoll`.
//!
//! Structurally this mirrors `mio`'s own `sys::unix::epoll::Selector`: an
//! owned epoll file descriptor, `register`/`reregister`/`deregister` by
//! raw descriptor, and a `select` that fills a reusable event buffer.
//! What differs is the user-data payload: instead of a `Token` newtype
//! this crate stores a raw [`EventPayload`](super::payload::EventPayload)
//! encoding the (possibly timer-paired) descriptors.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

use libc::{EPOLLET, EPOLLIN, EPOLLOUT, EPOLLPRI, EPOLLRDHUP};

use crate::reactor::InterestMask;

#[derive(Debug)]
pub(crate) struct Selector {
    ep: OwnedFd,
}

impl Selector {
    pub(crate) fn new() -> io::Result<Selector> {
        // SAFETY: `epoll_create1` returns either a valid owned fd or -1.
        let ep = unsafe { OwnedFd::from_raw_fd(syscall!(epoll_create1(libc::EPOLL_CLOEXEC))?) };
        Ok(Selector { ep })
    }

    pub(crate) fn register(&self, fd: RawFd, interest: InterestMask, payload: u64) -> io::Result<()> {
        let mut event = libc::epoll_event {
            events: interests_to_epoll(interest),
            u64: payload,
        };
        let ep = self.ep.as_raw_fd();
        syscall!(epoll_ctl(ep, libc::EPOLL_CTL_ADD, fd, &mut event)).map(|_| ())
    }

    pub(crate) fn deregister(&self, fd: RawFd) -> io::Result<()> {
        let ep = self.ep.as_raw_fd();
        syscall!(epoll_ctl(ep, libc::EPOLL_CTL_DEL, fd, std::ptr::null_mut())).map(|_| ())
    }

    pub(crate) fn select(&self, events: &mut Events, timeout: Option<Duration>) -> io::Result<()> {
        let timeout_ms = timeout
            .map(|to| {
                to.checked_add(Duration::from_nanos(999_999))
                    .unwrap_or(to)
                    .as_millis() as libc::c_int
            })
            .unwrap_or(-1);

        events.buf.clear();
        loop {
            let ep = self.ep.as_raw_fd();
            match syscall!(epoll_wait(
                ep,
                events.buf.as_mut_ptr(),
                events.buf.capacity() as i32,
                timeout_ms,
            )) {
                Ok(n) => {
                    // SAFETY: `epoll_wait` initialized the first `n`
                    // elements of the buffer.
                    unsafe { events.buf.set_len(n as usize) };
                    return Ok(());
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

fn interests_to_epoll(interest: InterestMask) -> u32 {
    let mut kind = EPOLLET;
    if interest.is_readable() {
        kind |= EPOLLIN | EPOLLRDHUP;
    }
    if interest.is_writable() {
        kind |= EPOLLOUT;
    }
    kind as u32
}

/// A reusable batch of raw epoll events.
#[derive(Debug)]
pub(crate) struct Events {
    buf: Vec<libc::epoll_event>,
}

impl Events {
    pub(crate) fn with_capacity(capacity: usize) -> Events {
        Events {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &libc::epoll_event> {
        self.buf.iter()
    }
}

pub(crate) fn payload_of(event: &libc::epoll_event) -> u64 {
    event.u64
}

pub(crate) fn is_readable(event: &libc::epoll_event) -> bool {
    (event.events as libc::c_int & (EPOLLIN | EPOLLPRI)) != 0
}

pub(crate) fn is_writable(event: &libc::epoll_event) -> bool {
    (event.events as libc::c_int & EPOLLOUT) != 0
}

pub(crate) fn is_error(event: &libc::epoll_event) -> bool {
    (event.events as libc::c_int & libc::EPOLLERR) != 0
}

pub(crate) fn is_hup(event: &libc::epoll_event) -> bool {
    (event.events as libc::c_int & libc::EPOLLHUP) != 0
        || (event.events as libc::c_int & EPOLLRDHUP) != 0
}
