// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The forking scope: start children now, and leave the scope only once
//! every one of them has finished. See [`forking`].

use super::{compose::ProcessBody,
            spawn::{Completion, spawn_fiber, spawn_worker}};
use crate::{barrier::{Barrier, BarrierEnd}, errors::SpawnError};

/// Runs `scope_body` with a [`ForkScope`] through which it can fork
/// processes, then blocks until every forked child has finished.
///
/// Forking differs from [`run`](super::run) in that the parent keeps going
/// after starting a child; the join is deferred to the end of the scope.
/// That final join is what makes it safe for children to borrow the
/// parent's resources (channel ends, barrier ends): the parent cannot
/// release them while a child still runs. The join happens even if
/// `scope_body` panics.
///
/// The scope must only be used by the process that created it - hand
/// channel ends to children, not the scope itself.
///
/// ```rust
/// let _runtime = weft::start_runtime();
/// let (tx, rx) = weft::one_to_one::<i32>();
///
/// weft::forking(|scope| {
///     scope.fork(move || tx.write(1).unwrap()).unwrap();
///     assert_eq!(rx.read(), Ok(1));
/// });
/// ```
pub fn forking<R>(scope_body: impl FnOnce(&ForkScope) -> R) -> R {
    let scope = ForkScope::new();
    scope_body(&scope)
    // `scope` drops here: sync with all forked children, then resign.
}

/// The handle a [`forking`] body forks through.
#[derive(Debug)]
pub struct ForkScope {
    barrier: Barrier,
    own: Option<BarrierEnd>,
}

impl ForkScope {
    fn new() -> Self {
        let barrier = Barrier::new();
        let mut own = barrier.end();
        own.enroll();
        Self {
            barrier,
            own: Some(own),
        }
    }

    /// Forks `body` as a new worker. Returns as soon as the child is
    /// started; the enclosing scope joins it on exit.
    ///
    /// # Errors
    ///
    /// [`SpawnError`] if the hosting worker could not be created; the scope
    /// then simply never waits for this child.
    pub fn fork(&self, body: impl FnOnce() + Send + 'static) -> Result<(), SpawnError> {
        spawn_worker(
            Box::new(body) as ProcessBody,
            Completion::new(self.barrier.enrolled_end()),
        )
    }

    /// Forks `body` as a fiber of the current worker.
    ///
    /// # Errors
    ///
    /// [`SpawnError`] if the fiber could not be created.
    pub fn fork_fiber(&self, body: impl FnOnce() + Send + 'static) -> Result<(), SpawnError> {
        spawn_fiber(
            Box::new(body) as ProcessBody,
            Completion::new(self.barrier.enrolled_end()),
        )
    }
}

impl Drop for ForkScope {
    fn drop(&mut self) {
        if let Some(mut own) = self.own.take() {
            // Block until every forked child has resigned, then leave.
            own.sync();
            own.resign();
        }
    }
}
