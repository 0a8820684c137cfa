use std::os::fd::RawFd;
use std::time::Duration;

use crate::awaitable::Awaitable;
use crate::error::{Result, RuntimeError};
use crate::reactor::{InterestMask, ResumeReason};
use crate::scheduler;

use super::socket;

/// Waits until `fd` has data to read, or `timeout` elapses.
///
/// Short-circuits via a `FIONREAD` peek: if bytes are already queued, no
/// registration happens at all. A hangup is treated as "no activity"
/// (`Ok(false)`), not an error — intentionally inconsistent with
/// [`super::Recv`], which raises on hangup. Both are documented, chosen
/// behaviors: a hangup genuinely means "nothing more will ever arrive",
/// which for a `recv` caller expecting bytes is exceptional, but for an
/// activity check just resolves the question being asked.
pub struct WaitForActivity {
    fd: RawFd,
    timeout: Option<Duration>,
}

impl WaitForActivity {
    pub fn new(fd: RawFd) -> WaitForActivity {
        WaitForActivity { fd, timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> WaitForActivity {
        self.timeout = Some(timeout);
        self
    }
}

impl Awaitable for WaitForActivity {
    type Output = Result<bool>;

    fn await_(self) -> Self::Output {
        let WaitForActivity { fd, timeout } = self;

        match socket::readable_bytes(fd) {
            Ok(n) if n > 0 => return Ok(true),
            Ok(_) => {}
            Err(e) => return Err(RuntimeError::Io(e)),
        }

        let reason = match timeout {
            Some(d) => scheduler::register_io_timeout(fd, InterestMask::READ, d),
            None => scheduler::register_io(fd, InterestMask::READ),
        };
        match reason {
            ResumeReason::IoReady | ResumeReason::Normal => Ok(true),
            ResumeReason::IoTimeout => Ok(false),
            ResumeReason::IoHup => Ok(false),
            ResumeReason::IoError => Err(socket::take_error(fd)),
        }
    }
}
