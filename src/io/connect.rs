use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::time::Duration;

use crate::awaitable::Awaitable;
use crate::error::{Result, RuntimeError};
use crate::reactor::{InterestMask, ResumeReason};
use crate::scheduler;

use super::socket;

/// Connects `fd` to `addr`.
///
/// `connect()` is issued immediately in non-blocking mode; `EINPROGRESS`
/// is not an error. A writable non-blocking connecting socket is not, by
/// itself, proof the connect succeeded, so on `IO_READY` this consults
/// `SO_ERROR` via `getsockopt` to tell a successful connect apart from a
/// refused/failed one.
pub struct Connect {
    fd: RawFd,
    addr: SocketAddr,
    timeout: Option<Duration>,
}

impl Connect {
    pub fn new(fd: RawFd, addr: SocketAddr) -> Connect {
        Connect {
            fd,
            addr,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Connect {
        self.timeout = Some(timeout);
        self
    }
}

impl Awaitable for Connect {
    type Output = Result<()>;

    fn await_(self) -> Self::Output {
        let Connect { fd, addr, timeout } = self;

        match socket::connect(fd, &addr) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => return Err(RuntimeError::Io(e)),
        }

        let reason = match timeout {
            Some(d) => scheduler::register_io_timeout(fd, InterestMask::WRITE, d),
            None => scheduler::register_io(fd, InterestMask::WRITE),
        };
        match reason {
            ResumeReason::IoReady | ResumeReason::Normal => {
                socket::take_socket_error(fd).map_err(RuntimeError::Io)
            }
            ResumeReason::IoTimeout => Err(RuntimeError::TimedOut),
            ResumeReason::IoHup => Err(RuntimeError::Hup),
            ResumeReason::IoError => Err(socket::take_error(fd)),
        }
    }
}
