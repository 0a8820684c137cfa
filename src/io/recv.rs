use std::os::fd::RawFd;
use std::time::Duration;

use crate::awaitable::Awaitable;
use crate::error::{Result, RuntimeError};
use crate::reactor::{InterestMask, ResumeReason};
use crate::scheduler;

use super::socket;

/// Receives into `buf`, suspending on `EAGAIN` until the socket is
/// readable or `timeout` elapses.
///
/// Whether a timeout is an error depends on `strict`: lenient (the
/// default) returns `Ok(0)`, matching "no data arrived"; strict raises
/// [`RuntimeError::TimedOut`].
pub struct Recv<'a> {
    fd: RawFd,
    buf: &'a mut [u8],
    timeout: Option<Duration>,
    strict: bool,
}

impl<'a> Recv<'a> {
    pub fn new(fd: RawFd, buf: &'a mut [u8]) -> Recv<'a> {
        Recv {
            fd,
            buf,
            timeout: None,
            strict: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Recv<'a> {
        self.timeout = Some(timeout);
        self
    }

    pub fn strict(mut self) -> Recv<'a> {
        self.strict = true;
        self
    }
}

impl<'a> Awaitable for Recv<'a> {
    type Output = Result<usize>;

    fn await_(self) -> Self::Output {
        let Recv { fd, buf, timeout, strict } = self;
        loop {
            match socket::recv(fd, buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(RuntimeError::Io(e)),
            }

            let reason = match timeout {
                Some(d) => scheduler::register_io_timeout(fd, InterestMask::READ, d),
                None => scheduler::register_io(fd, InterestMask::READ),
            };
            match reason {
                ResumeReason::IoReady | ResumeReason::Normal => continue,
                ResumeReason::IoTimeout => {
                    if strict {
                        return Err(RuntimeError::TimedOut);
                    }
                    return Ok(0);
                }
                ResumeReason::IoHup => return Err(RuntimeError::Hup),
                ResumeReason::IoError => return Err(socket::take_error(fd)),
            }
        }
    }
}
