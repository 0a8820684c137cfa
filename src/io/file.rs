use std::os::fd::RawFd;
use std::time::Duration;

use crate::awaitable::Awaitable;
use crate::error::{Result, RuntimeError};
use crate::reactor::{InterestMask, ResumeReason};
use crate::scheduler;

use super::socket;

/// Reads into `buf` from a non-blocking file descriptor.
///
/// Follows the same retry-on-`EAGAIN`/register/yield/retry shape as
/// [`super::Recv`], parameterized by `READ` interest instead of
/// socket-specific flags. A regular disk file never returns `EAGAIN`, so
/// against one this future completes on its first attempt without
/// suspending — correct, but it forfeits the no-block guarantee. The
/// protocol earns its keep against pipes, FIFOs, and `O_NONBLOCK`-capable
/// character devices.
pub struct FileRead<'a> {
    fd: RawFd,
    buf: &'a mut [u8],
    timeout: Option<Duration>,
}

impl<'a> FileRead<'a> {
    pub fn new(fd: RawFd, buf: &'a mut [u8]) -> FileRead<'a> {
        FileRead {
            fd,
            buf,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> FileRead<'a> {
        self.timeout = Some(timeout);
        self
    }
}

impl<'a> Awaitable for FileRead<'a> {
    type Output = Result<usize>;

    fn await_(self) -> Self::Output {
        let FileRead { fd, buf, timeout } = self;
        loop {
            match socket::read(fd, buf) {
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
                ResumeReason::IoTimeout => return Err(RuntimeError::TimedOut),
                ResumeReason::IoHup => return Err(RuntimeError::Hup),
                ResumeReason::IoError => return Err(socket::take_error(fd)),
            }
        }
    }
}

/// Writes the entirety of `buf` to a non-blocking file descriptor.
///
/// The write-side counterpart to [`FileRead`]; see its docs for the
/// regular-file degradation caveat.
pub struct FileWrite<'a> {
    fd: RawFd,
    buf: &'a [u8],
    timeout: Option<Duration>,
}

impl<'a> FileWrite<'a> {
    pub fn new(fd: RawFd, buf: &'a [u8]) -> FileWrite<'a> {
        FileWrite {
            fd,
            buf,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> FileWrite<'a> {
        self.timeout = Some(timeout);
        self
    }
}

impl<'a> Awaitable for FileWrite<'a> {
    type Output = Result<()>;

    fn await_(self) -> Self::Output {
        let FileWrite { fd, buf, timeout } = self;
        let mut offset = 0;
        while offset < buf.len() {
            match socket::write(fd, &buf[offset..]) {
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
