//! Process-boundary glue: signal installation and a `main`-style entry
//! point that drives the scheduler loop.
//!
//! Lives at the edge of the crate rather than inside scheduler/reactor
//! internals, so the core stays embeddable (a host that wants its own
//! signal policy can call [`crate::scheduler::spawn`] and
//! [`crate::scheduler::run`] directly and skip this module entirely).

use crate::scheduler;

/// Installs `SIGPIPE` ignore and `SIGINT`/`SIGTERM` → [`scheduler::request_shutdown`]
/// handlers, spawns `entry` on this thread's scheduler, and drives the
/// loop to completion.
///
/// Returns `entry`'s return value once the loop exits, matching a plain
/// process exit status. Panics if signal installation fails (there is no
/// sensible recovery: the process would otherwise crash on the next
/// `SIGPIPE` from a peer that closed its read side).
pub fn run_main<F, R>(entry: F) -> R
where
    F: FnOnce() -> R + 'static,
    R: 'static,
{
    install_signal_handlers();

    let result = std::rc::Rc::new(std::cell::RefCell::new(None));
    let slot = result.clone();
    scheduler::spawn(move || {
        *slot.borrow_mut() = Some(entry());
    });
    scheduler::run();

    std::rc::Rc::try_unwrap(result)
        .unwrap_or_else(|_| panic!("entry fiber's result slot still shared after run() returned"))
        .into_inner()
        .expect("entry fiber did not run to completion")
}

fn install_signal_handlers() {
    // SAFETY: `SIG_IGN` is a valid disposition; ignoring `SIGPIPE` only
    // changes what happens to `write`/`send` on a broken pipe (they
    // return `EPIPE` instead of killing the process), which is exactly
    // the behavior non-blocking socket/file futures expect.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }

    // SAFETY: `request_shutdown` is documented async-signal-safe (an
    // atomic store plus a single `write(2)` to wake a blocked poll),
    // satisfying `signal_hook::low_level::register`'s contract on what
    // the handler closure may do.
    for sig in [libc::SIGINT, libc::SIGTERM] {
        unsafe {
            signal_hook::low_level::register(sig, scheduler::request_shutdown)
                .unwrap_or_else(|e| panic!("failed to install handler for signal {}: {}", sig, e));
        }
    }
}
