/// Helper macro to execute a system call that returns an `io::Result`.
//
// Macro must be defined before any modules that use it.
#[allow(unused_macros)]
macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)* ) ) => {{
        let res = unsafe { libc::$fn($($arg, )*) };
        if res == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(res)
        }
    }};
}

// Thin pass-throughs to the `log` crate, compiled out entirely when the
// optional `log` feature is disabled (matching the teacher crate's own
// default-on `log` feature).
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        { log::trace!($($arg)*); }
    }};
}

#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        { log::debug!($($arg)*); }
    }};
}

#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        { log::warn!($($arg)*); }
    }};
}
