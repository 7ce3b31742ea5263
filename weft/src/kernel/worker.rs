// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The per-worker scheduler: one preemptive OS-level worker hosting a
//! cooperative FIFO run queue of processes. See [`Worker`] and
//! [`reschedule()`].

use super::{process::{ProcessCell, release_maybe},
            run_queue::{Pop, RunQueue},
            runtime,
            timeout_queue::{TimeoutId, TimeoutQueue}};
use std::{cell::RefCell,
          fmt,
          sync::{Arc, Mutex},
          time::Instant};

/// Identifies a worker (kernel thread) for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// One worker: a run queue of ready processes plus a timeout queue.
///
/// Exactly one process of a worker executes at a time (the *scheduler seat*);
/// everything else is parked. Cross-worker interaction touches nothing but
/// the run queue, and only to enqueue.
///
/// The timeout queue sits behind an uncontended mutex: it is only ever
/// touched from the worker's own seat (registering, removing, and the expiry
/// sweep before each pop), but the process cells it stores must still be
/// shareable across threads.
#[derive(Debug)]
pub(crate) struct Worker {
    pub(crate) id: WorkerId,
    pub(crate) run_queue: RunQueue,
    timeouts: Mutex<TimeoutQueue>,
}

impl Worker {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            id: WorkerId(runtime::next_worker_id()),
            run_queue: RunQueue::new(),
            timeouts: Mutex::new(TimeoutQueue::new()),
        })
    }

    /// Cross-thread wake-up: pushes a ready process onto this worker's run
    /// queue.
    pub(crate) fn enqueue(&self, process: Arc<ProcessCell>) { self.run_queue.push(process); }

    /// Pushes a whole chain in one operation (barrier completion, bucket
    /// flush).
    pub(crate) fn enqueue_chain(&self, chain: impl IntoIterator<Item = Arc<ProcessCell>>) {
        self.run_queue.push_chain(chain);
    }

    pub(crate) fn add_no_alt_timeout(
        &self,
        deadline: Instant,
        process: Arc<ProcessCell>,
    ) -> TimeoutId {
        self.timeouts
            .lock()
            .expect("timeout queue lock")
            .add_no_alt(deadline, process)
    }

    pub(crate) fn add_alt_timeout(
        &self,
        deadline: Instant,
        process: Arc<ProcessCell>,
    ) -> TimeoutId {
        self.timeouts
            .lock()
            .expect("timeout queue lock")
            .add_alt(deadline, process)
    }

    pub(crate) fn remove_timeout(&self, id: TimeoutId) -> bool {
        self.timeouts.lock().expect("timeout queue lock").remove(id)
    }

    fn soonest_timeout(&self) -> Option<Instant> {
        self.timeouts.lock().expect("timeout queue lock").soonest()
    }

    /// Drains every elapsed timeout into the run queue (no-ALT entries as a
    /// chain, ALT entries through the alting-aware release).
    fn expire_timeouts(&self) {
        let expired = {
            let mut timeouts = self.timeouts.lock().expect("timeout queue lock");
            if timeouts.is_empty() {
                return;
            }
            timeouts.expire_up_to(Instant::now())
        };
        if !expired.no_alt.is_empty() {
            self.enqueue_chain(expired.no_alt);
        }
        for process in &expired.alt {
            release_maybe(process);
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Arc<Self> { Self::new() }
}

/// The scheduler seat of the calling OS thread: which worker it belongs to
/// and which process is currently executing on it.
#[derive(Debug, Clone)]
pub(crate) struct Seat {
    pub(crate) worker: Arc<Worker>,
    pub(crate) process: Arc<ProcessCell>,
}

thread_local! {
    static SEAT: RefCell<Option<Seat>> = const { RefCell::new(None) };
}

pub(crate) fn set_seat(seat: Seat) {
    SEAT.with(|slot| {
        let mut slot = slot.borrow_mut();
        assert!(
            slot.is_none(),
            "runtime already started on this thread; nested start_runtime is not supported"
        );
        *slot = Some(seat);
    });
}

pub(crate) fn clear_seat() {
    SEAT.with(|slot| {
        slot.borrow_mut().take();
    });
}

pub(crate) fn try_seat() -> Option<Seat> { SEAT.with(|slot| slot.borrow().clone()) }

/// The calling thread's seat. Panics when no runtime is active here, which
/// means a primitive was used outside a process body / before
/// `start_runtime`.
pub(crate) fn seat() -> Seat {
    try_seat().expect(
        "no runtime on this thread: call start_runtime() (or run this code inside a process body)",
    )
}

/// The currently executing process of the calling thread.
pub(crate) fn current_process() -> Arc<ProcessCell> { seat().process }

/// Parks the current process. The caller must already have placed the
/// process on the wait structure it expects to be woken from; this call
/// hands the seat to the next ready process and blocks until someone pushes
/// the current process back onto its worker's run queue.
pub(crate) fn reschedule() {
    let seat = seat();
    runtime::record_block(seat.process.id);
    schedule_next(&seat.worker, Some(&seat.process));
}

/// Hands the seat onward without ever resuming the caller: the final act of
/// a finished process. The hosting thread returns from this and exits.
pub(crate) fn terminal_reschedule(worker: &Arc<Worker>) { schedule_next(worker, None); }

/// Reschedules but puts the current process back on its own run queue, so it
/// runs again once everything already ready has had a turn. A no-op when the
/// run queue is empty.
pub(crate) fn yield_now() {
    let seat = seat();
    seat.worker.enqueue(Arc::clone(&seat.process));
    schedule_next(&seat.worker, Some(&seat.process));
}

/// The core scheduling step: drain expired timeouts, pop the next ready
/// process (blocking until the earliest deadline or a cross-thread wake-up),
/// and switch to it.
///
/// An indefinite block that would leave no worker anywhere with work trips
/// global deadlock detection instead: the initial process is woken to raise
/// the error and this seat either continues (if it *is* the initial worker's
/// seat) or parks forever.
fn schedule_next(worker: &Arc<Worker>, current: Option<&Arc<ProcessCell>>) {
    let next = loop {
        worker.expire_timeouts();
        let deadline = worker.soonest_timeout();
        match worker.run_queue.pop(deadline) {
            Pop::Ready(process) => break process,
            Pop::TimedOut => {}
            Pop::Deadlock => runtime::trip_deadlock(worker),
        }
    };

    match current {
        Some(current) if Arc::ptr_eq(current, &next) => {
            runtime::raise_if_deadlocked(current);
        }
        Some(current) => {
            next.context.resume();
            current.context.suspend();
            runtime::raise_if_deadlocked(current);
        }
        None => next.context.resume(),
    }
}
