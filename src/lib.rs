//! A single-threaded cooperative fiber scheduler with an epoll-backed
//! I/O reactor.
//!
//! User code written in straight-line style can perform network and
//! file I/O without blocking an OS thread: a [`Fiber`](fiber::Fiber)
//! suspends when an operation would block and the scheduler resumes it
//! once the kernel reports readiness.
//!
//! ```no_run
//! use fiberio::awaitable::Awaitable;
//! use fiberio::scheduler;
//!
//! scheduler::spawn(|| {
//!     println!("A-start");
//!     fiberio::awaitable::Timeout::new(std::time::Duration::from_millis(100)).await_();
//!     println!("A-end");
//! });
//! scheduler::run();
//! ```
//!
//! See [`runtime::run_main`] for an opt-in process entry point with
//! signal handling wired up.

#[macro_use]
mod macros;

pub mod awaitable;
pub mod config;
pub mod error;
pub mod fiber;
pub mod io;
pub mod reactor;
pub mod runtime;
pub mod scheduler;

pub use crate::error::{Result, RuntimeError};
pub use crate::fiber::Fiber;
