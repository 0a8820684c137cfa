//! Sizing knobs for the scheduler and reactor.
//!
//! Mirrors the shape of `mio`'s `Events::with_capacity`: small,
//! `Default`-able structs passed to a constructor rather than global
//! state.

/// Default stack size for a freshly allocated fiber: 16 MiB on 64-bit
/// hosts, 512 KiB on 32-bit hosts.
#[cfg(target_pointer_width = "64")]
pub const DEFAULT_STACK_SIZE: usize = 16 * 1024 * 1024;
#[cfg(not(target_pointer_width = "64"))]
pub const DEFAULT_STACK_SIZE: usize = 512 * 1024;

/// Configuration for a [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Stack size handed to newly allocated fibers.
    pub fiber_stack_size: usize,
    /// Maximum number of terminated fibers retained on the recycle list
    /// for reuse by `spawn`. Fibers terminating beyond this cap have
    /// their stacks released instead.
    pub recycle_list_cap: usize,
    /// Reactor configuration used by the scheduler's embedded reactor.
    pub reactor: ReactorConfig,
}

impl Default for SchedulerConfig {
    fn default() -> SchedulerConfig {
        SchedulerConfig {
            fiber_stack_size: DEFAULT_STACK_SIZE,
            recycle_list_cap: 64,
            reactor: ReactorConfig::default(),
        }
    }
}

/// Configuration for a [`Reactor`](crate::reactor::Reactor).
#[derive(Debug, Clone)]
pub struct ReactorConfig {
    /// Number of events drained per call to `epoll_wait`.
    pub event_batch_capacity: usize,
}

impl Default for ReactorConfig {
    fn default() -> ReactorConfig {
        ReactorConfig {
            event_batch_capacity: 1024,
        }
    }
}
