//! Stack growth for deeply nested evaluation
//!
//! Each nested `eval` adds its poll frames to the host stack. Polling through
//! `StackSafe` moves onto a fresh heap-allocated segment before the current
//! one runs out, so the call depth limit is reached before the host stack is.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{FutureExt, LocalBoxFuture};

/// Minimum stack space to keep available (256KB red zone)
const RED_ZONE: usize = 256 * 1024;

/// Stack space to allocate when growing (2MB)
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

/// Run `f`, growing the stack first if less than the red zone is left.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// A boxed future polled under `ensure_sufficient_stack`
pub struct StackSafe<'a, T> {
    inner: LocalBoxFuture<'a, T>,
}

impl<'a, T> StackSafe<'a, T> {
    pub fn new(future: impl Future<Output = T> + 'a) -> Self {
        Self { inner: future.boxed_local() }
    }
}

impl<T> Future for StackSafe<'_, T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let inner = self.inner.as_mut();
        ensure_sufficient_stack(|| inner.poll(cx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(n: usize) -> StackSafe<'static, usize> {
        StackSafe::new(async move {
            if n == 0 {
                0
            } else {
                depth(n - 1).await + 1
            }
        })
    }

    #[test]
    fn deep_recursion_survives_a_small_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| futures::executor::block_on(depth(5000)))
            .expect("spawn");
        assert_eq!(handle.join().expect("join"), 5000);
    }
}
