// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The suspended-execution-context seam of the scheduler. See [`Context`] and
//! [`ThreadContext`].

use std::sync::{Condvar, Mutex};

/// A process's suspended execution context.
///
/// The kernel is indifferent to how a context is realised; all it needs is a
/// pair of operations with hand-off semantics:
///
/// - [`resume()`] grants the context its run token, and
/// - [`suspend()`] blocks the caller until its run token arrives, consuming
///   it.
///
/// A "context switch" from process A to process B is then
/// `b.resume(); a.suspend();`. The token is a binary semaphore, so resuming a
/// context *before* it suspends is fine - the suspend returns immediately.
/// That ordering occurs routinely: a peer on another worker can push a parked
/// process back onto its run queue (and a later pop can resume it) in the
/// window between the process placing itself on a wait list and actually
/// suspending.
///
/// [`resume()`]: Context::resume
/// [`suspend()`]: Context::suspend
pub(crate) trait Context: Send + Sync {
    /// Grants the run token. Idempotent while the token is outstanding.
    fn resume(&self);

    /// Blocks until the run token arrives, then consumes it.
    fn suspend(&self);
}

/// The default context: the process is hosted on a dedicated OS thread gated
/// by a mutex/condvar token.
///
/// Exactly one context per worker holds the token at any moment, which is
/// what makes the worker's processes cooperative: everyone else's hosting
/// thread is parked inside [`suspend()`].
///
/// [`suspend()`]: Context::suspend
#[derive(Debug, Default)]
pub(crate) struct ThreadContext {
    token: Mutex<bool>,
    arrived: Condvar,
}

impl ThreadContext {
    pub(crate) fn new() -> Self { Self::default() }
}

impl Context for ThreadContext {
    fn resume(&self) {
        let mut token = self.token.lock().expect("context token lock");
        *token = true;
        self.arrived.notify_one();
    }

    fn suspend(&self) {
        let mut token = self.token.lock().expect("context token lock");
        while !*token {
            token = self.arrived.wait(token).expect("context token lock");
        }
        *token = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread, time::Duration};

    #[test]
    fn resume_before_suspend_does_not_lose_the_token() {
        let context = ThreadContext::new();
        context.resume();
        // Must return immediately; a lost token would hang the test.
        context.suspend();
    }

    #[test]
    fn suspend_blocks_until_resumed() {
        let context = Arc::new(ThreadContext::new());
        let resumer = Arc::clone(&context);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            resumer.resume();
        });

        let before = std::time::Instant::now();
        context.suspend();
        assert!(before.elapsed() >= Duration::from_millis(10));
        handle.join().unwrap();
    }
}
