//! The awaitable contract: polling-style and direct-style futures, and
//! the sequential combinators built on top of them.

mod callback;
mod timeout;

pub use self::callback::{do_async, do_async_void, CallbackFuture, CallbackVoidFuture};
pub use self::timeout::Timeout;

/// A value with an `await_` operation that suspends the current fiber
/// until it can produce `Output`.
///
/// Two ways to get one: implement [`PollingAwaitable`] (is-done/get-value,
/// re-enqueue-and-yield-in-a-loop) and receive `Awaitable` for free, or
/// implement `Awaitable` directly to register with the reactor and yield
/// exactly once (the shape every I/O future in [`crate::io`] uses).
///
/// Whichever style, the rule is the same: a call to `yield` must be
/// immediately preceded by something that guarantees the fiber is
/// eventually re-enqueued (a self re-enqueue, or an I/O/timer
/// registration). Skipping that is a liveness bug — the fiber is lost.
pub trait Awaitable {
    type Output;

    fn await_(self) -> Self::Output;
}

/// The "spin-lock-like" style: each `is_done` call may mutate internal
/// state (including suspending the fiber itself, as [`Timeout`] does),
/// but termination ultimately depends on state the reactor mutates from
/// outside.
pub trait PollingAwaitable: Sized {
    type Output;

    fn is_done(&mut self) -> bool;

    fn get_value(self) -> Self::Output;
}

impl<T: PollingAwaitable> Awaitable for T {
    type Output = T::Output;

    fn await_(self) -> Self::Output {
        let mut this = self;
        while !this.is_done() {
            crate::scheduler::yield_now();
        }
        this.get_value()
    }
}

/// Awaits every item in `items`, in order, discarding results.
pub fn await_all<A, I>(items: I)
where
    A: Awaitable,
    I: IntoIterator<Item = A>,
{
    for item in items {
        item.await_();
    }
}

/// Awaits every item in `items`, in order, collecting the results.
pub fn capture_all<A, I>(items: I) -> Vec<A::Output>
where
    A: Awaitable,
    I: IntoIterator<Item = A>,
{
    items.into_iter().map(Awaitable::await_).collect()
}

/// Awaits two (possibly differently-typed) awaitables in order,
/// discarding results.
pub fn await_all2<A, B>(a: A, b: B)
where
    A: Awaitable,
    B: Awaitable,
{
    a.await_();
    b.await_();
}

/// Awaits three (possibly differently-typed) awaitables in order,
/// discarding results.
pub fn await_all3<A, B, C>(a: A, b: B, c: C)
where
    A: Awaitable,
    B: Awaitable,
    C: Awaitable,
{
    a.await_();
    b.await_();
    c.await_();
}

/// Awaits two (possibly differently-typed) awaitables in order,
/// returning both results.
pub fn capture_all2<A, B>(a: A, b: B) -> (A::Output, B::Output)
where
    A: Awaitable,
    B: Awaitable,
{
    let a = a.await_();
    let b = b.await_();
    (a, b)
}

/// Awaits three (possibly differently-typed) awaitables in order,
/// returning all three results.
pub fn capture_all3<A, B, C>(a: A, b: B, c: C) -> (A::Output, B::Output, C::Output)
where
    A: Awaitable,
    B: Awaitable,
    C: Awaitable,
{
    let a = a.await_();
    let b = b.await_();
    let c = c.await_();
    (a, b, c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_all_preserves_order() {
        std::thread::spawn(|| {
            crate::scheduler::spawn(move || {
                let values = capture_all(vec![
                    do_async(|| 1),
                    do_async(|| 2),
                    do_async(|| 3),
                ]);
                assert_eq!(values, vec![1, 2, 3]);
            });
            crate::scheduler::run();
        })
        .join()
        .unwrap();
    }
}
