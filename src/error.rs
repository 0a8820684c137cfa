use std::io;

/// Errors surfaced at the awaitable boundary.
///
/// Programmer errors (double registration, resuming a terminated fiber,
/// a descriptor that overflows the event payload's tag bit) are not part
/// of this taxonomy; they are `assert!`/`panic!` failures, since a caller
/// has no sensible way to recover from them.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The peer closed its end of the connection.
    #[error("peer hung up")]
    Hup,

    /// A registration's deadline elapsed before the descriptor became
    /// ready.
    #[error("operation timed out")]
    TimedOut,

    /// An I/O error reported by the kernel or a syscall.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl RuntimeError {
    pub(crate) fn from_last_os_error() -> RuntimeError {
        RuntimeError::Io(io::Error::last_os_error())
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
