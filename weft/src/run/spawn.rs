// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Process start-up plumbing: hosting a body in a fresh worker or as a fiber
//! of the current one, the completion-barrier lifecycle, and panic
//! confinement.

use crate::{barrier::BarrierEnd,
            errors::SpawnError,
            kernel::{context::ThreadContext,
                     process::{ProcessCell, ProcessId},
                     runtime,
                     worker::{self, Seat, Worker}},
            run::compose::ProcessBody};
use std::{panic::{AssertUnwindSafe, catch_unwind},
          sync::Arc,
          thread};

/// A child's membership of its parent's completion barrier, wrapped so that
/// every exit path resigns exactly once and *quietly* - including the path
/// where the hosting thread never spawned and the wrapper is dropped,
/// unused, on the parent's thread.
#[derive(Debug)]
pub(crate) struct Completion {
    end: Option<BarrierEnd>,
}

impl Completion {
    pub(crate) fn new(end: BarrierEnd) -> Self { Self { end: Some(end) } }

    fn take(&mut self) -> Option<BarrierEnd> { self.end.take() }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(mut end) = self.end.take() {
            // Never ran: just release the reservation so the parent's sync
            // does not wait for a child that will never exist.
            end.resign();
        }
    }
}

/// Runs a process body on the current seat: complete the enrollment handed
/// over by the parent, run the body with panics confined, resign.
fn host_body(body: ProcessBody, mut completion: Completion) {
    let mut end = match completion.take() {
        Some(end) => end,
        None => return,
    };
    end.enroll();
    let outcome = catch_unwind(AssertUnwindSafe(body));
    end.resign();
    if outcome.is_err() {
        // A panic is confined to the process that raised it; the rest of
        // the network keeps running. The payload was already printed by the
        // default panic hook.
        tracing::error!("process body panicked; terminating that process only");
    }
}

/// Starts `body` as the initial process of a brand-new worker.
///
/// The worker is registered with the deadlock counter *before* the OS thread
/// is created, so a half-spawned worker can never make the program look
/// idle.
pub(crate) fn spawn_worker(body: ProcessBody, completion: Completion) -> Result<(), SpawnError> {
    let worker = Worker::new();
    runtime::register_worker();
    tracing::debug!(worker = %worker.id, "spawning process in a new worker");
    let spawned = thread::Builder::new()
        .name(format!("weft-{}", worker.id))
        .spawn(move || {
            let _seat = runtime::adopt_thread_as_worker(worker);
            host_body(body, completion);
            worker::clear_seat();
            runtime::deregister_worker();
        });
    match spawned {
        Ok(_handle) => Ok(()),
        Err(io_error) => {
            runtime::deregister_worker();
            Err(SpawnError::OutOfResources(io_error))
        }
    }
}

/// Starts `body` as a new fiber of the *current* worker: it shares the run
/// queue with the caller and runs only when the caller (and every other
/// fiber of this worker) is parked.
pub(crate) fn spawn_fiber(body: ProcessBody, completion: Completion) -> Result<(), SpawnError> {
    let parent = worker::seat();
    let process = Arc::new(ProcessCell::new(
        ProcessId(runtime::next_process_id()),
        Arc::clone(&parent.worker),
        Box::new(ThreadContext::new()),
    ));
    let fiber_seat = Seat {
        worker: Arc::clone(&parent.worker),
        process: Arc::clone(&process),
    };

    tracing::debug!(worker = %parent.worker.id, process = %process.id, "spawning fiber");
    let spawned = thread::Builder::new()
        .name(format!("weft-{}-{}", parent.worker.id, process.id))
        .spawn(move || {
            // Wait for the scheduler to dispatch this fiber for the first
            // time.
            fiber_seat.process.context.suspend();
            worker::set_seat(fiber_seat.clone());
            host_body(body, completion);
            worker::clear_seat();
            worker::terminal_reschedule(&fiber_seat.worker);
        });
    match spawned {
        Ok(_handle) => {
            parent.worker.enqueue(process);
            Ok(())
        }
        Err(io_error) => Err(SpawnError::OutOfResources(io_error)),
    }
}
