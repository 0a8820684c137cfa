use super::PollingAwaitable;

/// Polling-style future driven by a user callback: `None` means not yet
/// ready, `Some(v)` latches `v` as the final value.
pub struct CallbackFuture<T> {
    callback: Box<dyn FnMut() -> Option<T>>,
    value: Option<T>,
}

impl<T> CallbackFuture<T> {
    pub fn new<F>(callback: F) -> CallbackFuture<T>
    where
        F: FnMut() -> Option<T> + 'static,
    {
        CallbackFuture {
            callback: Box::new(callback),
            value: None,
        }
    }
}

impl<T> PollingAwaitable for CallbackFuture<T> {
    type Output = T;

    fn is_done(&mut self) -> bool {
        if self.value.is_some() {
            return true;
        }
        if let Some(v) = (self.callback)() {
            self.value = Some(v);
            true
        } else {
            false
        }
    }

    fn get_value(self) -> T {
        self.value.expect("get_value called before is_done latched a value")
    }
}

/// The void-returning sibling of [`CallbackFuture`]: the callback
/// returns `true` once it's done instead of an `Option<T>`.
pub struct CallbackVoidFuture {
    callback: Box<dyn FnMut() -> bool>,
    done: bool,
}

impl CallbackVoidFuture {
    pub fn new<F>(callback: F) -> CallbackVoidFuture
    where
        F: FnMut() -> bool + 'static,
    {
        CallbackVoidFuture {
            callback: Box::new(callback),
            done: false,
        }
    }
}

impl PollingAwaitable for CallbackVoidFuture {
    type Output = ();

    fn is_done(&mut self) -> bool {
        if self.done {
            return true;
        }
        if (self.callback)() {
            self.done = true;
            true
        } else {
            false
        }
    }

    fn get_value(self) {}
}

/// Wraps a plain function as a future whose first poll runs it and
/// latches the result. The function runs inline on the fiber that
/// awaits it, the moment the scheduler gets to it — not at construction
/// time. `F` is an owned `FnOnce`, captured by value, so there is no
/// deferred-argument/stale-binding pitfall to document: Rust closures
/// already capture what they close over explicitly.
pub fn do_async<T, F>(f: F) -> CallbackFuture<T>
where
    F: FnOnce() -> T + 'static,
{
    let mut f = Some(f);
    CallbackFuture::new(move || f.take().map(|f| f()))
}

/// The void-returning sibling of [`do_async`].
pub fn do_async_void<F>(f: F) -> CallbackVoidFuture
where
    F: FnOnce() + 'static,
{
    let mut f = Some(f);
    CallbackVoidFuture::new(move || {
        if let Some(f) = f.take() {
            f();
        }
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awaitable::Awaitable;

    #[test]
    fn do_async_defers_until_polled() {
        std::thread::spawn(|| {
            crate::scheduler::spawn(|| {
                let ran = std::rc::Rc::new(std::cell::Cell::new(false));
                let ran2 = ran.clone();
                let fut = do_async(move || {
                    ran2.set(true);
                    42
                });
                assert!(!ran.get(), "do_async must not run before its first poll");
                let value = fut.await_();
                assert!(ran.get());
                assert_eq!(value, 42);
            });
            crate::scheduler::run();
        })
        .join()
        .unwrap();
    }
}
