// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Running process compositions: one process, several in parallel, several
//! in sequence - each either in fresh workers or as fibers of the current
//! worker. See [`run`], [`run_parallel`] and [`run_sequential`].

use super::spawn::{Completion, spawn_fiber, spawn_worker};
use crate::{barrier::Barrier, errors::SpawnError};

/// A process body: the sequential code a process executes.
pub type ProcessBody = Box<dyn FnOnce() + Send + 'static>;

/// How a composition places its processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Each body becomes the initial process of a brand-new worker (true
    /// OS-level parallelism).
    NewWorker,
    /// Each body becomes a fiber of the calling process's worker
    /// (cooperative concurrency, no new preemption).
    CurrentWorker,
}

/// Runs one process in a new worker and waits for it to finish.
///
/// Larger structures nest through closures: a body may itself call
/// [`run_parallel`] / [`run_sequential`], which is how sequences of
/// parallels (and so on) are expressed.
///
/// # Errors
///
/// [`SpawnError`] if the hosting worker could not be created.
pub fn run(body: impl FnOnce() + Send + 'static) -> Result<(), SpawnError> {
    run_parallel(vec![Box::new(body)])
}

/// Runs every body at once, each in its own new worker, and waits for all
/// of them to finish.
///
/// # Errors
///
/// [`SpawnError`] if a worker could not be created. Children that already
/// started keep running (and are no longer waited for); the remaining bodies
/// are dropped unstarted.
pub fn run_parallel(bodies: Vec<ProcessBody>) -> Result<(), SpawnError> {
    run_group(bodies, Placement::NewWorker, Order::Parallel)
}

/// Runs the bodies one after another, each in its own new worker, waiting
/// for each to finish before starting the next.
///
/// # Errors
///
/// [`SpawnError`] if a worker could not be created; the remaining bodies are
/// dropped unstarted.
pub fn run_sequential(bodies: Vec<ProcessBody>) -> Result<(), SpawnError> {
    run_group(bodies, Placement::NewWorker, Order::Sequential)
}

/// Like [`run_parallel`], but the bodies run as fibers of the *current*
/// worker: cooperative interleaving with the caller instead of OS-level
/// parallelism.
///
/// # Errors
///
/// [`SpawnError`] if a fiber could not be created.
pub fn run_parallel_fibers(bodies: Vec<ProcessBody>) -> Result<(), SpawnError> {
    run_group(bodies, Placement::CurrentWorker, Order::Parallel)
}

/// Like [`run_sequential`], but the bodies run as fibers of the current
/// worker.
///
/// # Errors
///
/// [`SpawnError`] if a fiber could not be created.
pub fn run_sequential_fibers(bodies: Vec<ProcessBody>) -> Result<(), SpawnError> {
    run_group(bodies, Placement::CurrentWorker, Order::Sequential)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    Parallel,
    Sequential,
}

fn run_group(
    bodies: Vec<ProcessBody>,
    placement: Placement,
    order: Order,
) -> Result<(), SpawnError> {
    let barrier = Barrier::new();
    let mut own = barrier.end();
    own.enroll();

    for body in bodies {
        let completion = Completion::new(barrier.enrolled_end());
        let started = match placement {
            Placement::NewWorker => spawn_worker(body, completion),
            Placement::CurrentWorker => spawn_fiber(body, completion),
        };
        if let Err(error) = started {
            // Children that already started keep running; we stop waiting
            // for them. The barrier core stays alive through their ends, so
            // skip the drop-time membership check.
            own.resign();
            std::mem::forget(barrier);
            return Err(error);
        }
        if order == Order::Sequential {
            own.sync();
        }
    }
    if order == Order::Parallel {
        own.sync();
    }
    own.resign();
    Ok(())
}
