use std::net::SocketAddr;
use std::os::fd::RawFd;

use crate::awaitable::Awaitable;
use crate::error::{Result, RuntimeError};
use crate::reactor::{InterestMask, ResumeReason};
use crate::scheduler;

use super::socket;

/// Accepts one connection on a listening socket.
pub struct Accept {
    fd: RawFd,
}

impl Accept {
    pub fn new(listener_fd: RawFd) -> Accept {
        Accept { fd: listener_fd }
    }
}

impl Awaitable for Accept {
    type Output = Result<(RawFd, SocketAddr)>;

    fn await_(self) -> Self::Output {
        loop {
            match socket::accept4(self.fd) {
                Ok(accepted) => return Ok(accepted),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(RuntimeError::Io(e)),
            }

            match scheduler::register_io(self.fd, InterestMask::READ) {
                ResumeReason::IoReady => continue,
                ResumeReason::IoHup => return Err(RuntimeError::Hup),
                ResumeReason::IoError => return Err(socket::take_error(self.fd)),
                ResumeReason::IoTimeout | ResumeReason::Normal => continue,
            }
        }
    }
}
