use std::os::fd::RawFd;
use std::time::Duration;

use crate::awaitable::Awaitable;
use crate::error::{Result, RuntimeError};
use crate::reactor::{InterestMask, ResumeReason};
use crate::scheduler;

use super::socket;

/// Sends the entirety of `buf`, suspending on `EAGAIN` until the socket
/// is writable. Unlike [`super::Recv`] there is no lenient timeout mode:
/// a timeout always raises [`RuntimeError::TimedOut`], since a partial
/// send with no way to report how much went out is not useful to a
/// caller.
pub struct Send<'a> {
    fd: RawFd,
    buf: &'a [u8],
    timeout: Option<Duration>,
}

impl<'a> Send<'a> {
    pub fn new(fd: RawFd, buf: &'a [u8]) -> Send<'a> {
        Send {
            fd,
            buf,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Send<'a> {
        self.timeout = Some(timeout);
        self
    }
}

impl<'a> Awaitable for Send<'a> {
    type Output = Result<()>;

    fn await_(self) -> Self::Output {
        let Send { fd, buf, timeout } = self;
        let mut offset = 0;
        while offset < buf.len() {
            match socket::send(fd, &buf[offset..]) {
                Ok(n) => {
                    offset += n;
                    continue;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(RuntimeError::Io(e)),
            }

            let reason = match timeout {
                Some(d) => scheduler::register_io_timeout(fd, InterestMask::WRITE, d),
                None => scheduler::register_io(fd, InterestMask::WRITE),
            };
            match reason {
                ResumeReason::IoReady | ResumeReason::Normal => continue,
                ResumeReason::IoTimeout => return Err(RuntimeError::TimedOut),
                ResumeReason::IoHup => return Err(RuntimeError::Hup),
                ResumeReason::IoError => return Err(socket::take_error(fd)),
            }
        }
        Ok(())
    }
}
