// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Process-global runtime state and the per-thread runtime lifecycle:
//! [`start_runtime()`], the workers-with-work counter behind deadlock
//! detection, the recent-blocks ring, and the sleep/yield helpers.

use super::{context::ThreadContext,
            process::{ProcessCell, ProcessId},
            worker::{self, Seat, Worker, WorkerId}};
use crate::{clock, errors::DeadlockError};
use std::{collections::VecDeque,
          sync::{Arc, Mutex,
                 atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering}},
          time::{Duration, Instant}};

/// Capacity of the recent-blocks ring surfaced with [`DeadlockError`].
const RECENT_BLOCKS_CAP: usize = 32;

/// Count of workers that currently have either a ready process or a
/// bounded-deadline wait. The transition to zero *is* the deadlock signal.
static WORKERS_WITH_WORK: AtomicU32 = AtomicU32::new(0);

/// Latched once deadlock is detected; checked by the initial process when it
/// regains its seat.
static DEADLOCKED: AtomicBool = AtomicBool::new(false);

/// The initial worker and its initial process: where [`DeadlockError`] is
/// raised.
static INITIAL: Mutex<Option<Seat>> = Mutex::new(None);

/// Rolling log of the most recent parks, oldest first.
static RECENT_BLOCKS: Mutex<VecDeque<ProcessId>> = Mutex::new(VecDeque::new());

static NEXT_PROCESS_ID: AtomicU64 = AtomicU64::new(0);
static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(0);

pub(crate) fn workers_with_work() -> &'static AtomicU32 { &WORKERS_WITH_WORK }

pub(crate) fn next_process_id() -> u64 { NEXT_PROCESS_ID.fetch_add(1, Ordering::SeqCst) }

pub(crate) fn next_worker_id() -> u64 { NEXT_WORKER_ID.fetch_add(1, Ordering::SeqCst) }

pub(crate) fn record_block(id: ProcessId) {
    let mut blocks = RECENT_BLOCKS.lock().expect("recent blocks lock");
    blocks.push_back(id);
    if blocks.len() > RECENT_BLOCKS_CAP {
        blocks.pop_front();
    }
}

fn recent_blocks_snapshot() -> Vec<ProcessId> {
    RECENT_BLOCKS
        .lock()
        .expect("recent blocks lock")
        .iter()
        .copied()
        .collect()
}

/// Registers a worker with the deadlock counter. Call before the worker can
/// possibly block - for spawned workers this happens on the *parent's*
/// thread, before the OS thread exists, so there is no window in which the
/// whole program looks idle just because a spawn is still in flight.
pub(crate) fn register_worker() { WORKERS_WITH_WORK.fetch_add(1, Ordering::SeqCst); }

/// The complement of [`register_worker`], at worker teardown.
pub(crate) fn deregister_worker() { WORKERS_WITH_WORK.fetch_sub(1, Ordering::SeqCst); }

/// Called by the seat whose indefinite block took the counter to zero.
///
/// Latches the deadlock flag and wakes the initial process so the error is
/// raised there (and only there). If the tripping seat belongs to the
/// initial worker it re-counts itself and returns to its pop loop, where it
/// will find the just-pushed initial process; any other seat has nothing
/// left to schedule, ever, and parks forever.
pub(crate) fn trip_deadlock(worker: &Arc<Worker>) {
    DEADLOCKED.store(true, Ordering::SeqCst);
    tracing::error!(
        recent_blocks = ?recent_blocks_snapshot(),
        "deadlock detected: waking the initial process"
    );

    let initial = INITIAL.lock().expect("initial seat lock").clone();
    match initial {
        Some(seat) if Arc::ptr_eq(worker, &seat.worker) => {
            // We are the initial worker's seat: put the accounting back (we
            // are about to be runnable again) and queue the initial process
            // for ourselves.
            WORKERS_WITH_WORK.fetch_add(1, Ordering::SeqCst);
            seat.worker.enqueue(seat.process);
        }
        Some(seat) => {
            // Waking a counted waiter re-increments the counter inside the
            // push.
            seat.worker.enqueue(seat.process);
            worker.run_queue.wedge();
        }
        None => {
            // No initial worker registered: raise here, there is nowhere
            // better.
            std::panic::panic_any(DeadlockError {
                recent_blocks: recent_blocks_snapshot(),
            });
        }
    }
}

/// Raises [`DeadlockError`] if deadlock has been detected and `process` is
/// the initial process. Called every time a seat resumes a process.
pub(crate) fn raise_if_deadlocked(process: &Arc<ProcessCell>) {
    if !DEADLOCKED.load(Ordering::SeqCst) {
        return;
    }
    let is_initial = INITIAL
        .lock()
        .expect("initial seat lock")
        .as_ref()
        .is_some_and(|seat| Arc::ptr_eq(&seat.process, process));
    if is_initial {
        std::panic::panic_any(DeadlockError {
            recent_blocks: recent_blocks_snapshot(),
        });
    }
}

/// Creates the worker + synthetic initial process for the calling thread and
/// installs them as its seat. Shared by [`start_runtime`] and the spawned
/// worker bootstrap.
pub(crate) fn adopt_thread_as_worker(worker: Arc<Worker>) -> Seat {
    let process = Arc::new(ProcessCell::new(
        ProcessId(next_process_id()),
        Arc::clone(&worker),
        Box::new(ThreadContext::new()),
    ));
    let seat = Seat { worker, process };
    worker::set_seat(seat.clone());
    seat
}

/// Starts the runtime on the calling thread.
///
/// Must be called before any primitive is used on this thread; user code
/// then runs as the thread's initial process. The first thread to start a
/// runtime becomes the *initial worker*, where [`DeadlockError`] is raised.
///
/// The returned guard releases the thread's worker state when dropped (the
/// `end_runtime` operation). Runtimes on different threads may coexist;
/// nesting on one thread is an error.
///
/// ```rust
/// let _runtime = weft::start_runtime();
/// let (tx, rx) = weft::one_to_one::<i32>();
/// weft::run_parallel(vec![
///     Box::new(move || tx.write(42).unwrap()),
///     Box::new(move || assert_eq!(rx.read(), Ok(42))),
/// ])
/// .unwrap();
/// ```
#[must_use = "dropping the guard ends the runtime immediately"]
pub fn start_runtime() -> RuntimeGuard {
    let worker = Worker::new();
    register_worker();
    let seat = adopt_thread_as_worker(worker);

    let became_initial = {
        let mut initial = INITIAL.lock().expect("initial seat lock");
        if initial.is_none() {
            *initial = Some(seat.clone());
            true
        } else {
            false
        }
    };
    if became_initial {
        DEADLOCKED.store(false, Ordering::SeqCst);
        RECENT_BLOCKS.lock().expect("recent blocks lock").clear();
    }

    tracing::debug!(worker = %seat.worker.id, initial = became_initial, "runtime started");
    RuntimeGuard {
        seat,
        became_initial,
    }
}

/// Releases a thread's runtime state on drop. See [`start_runtime`].
#[derive(Debug)]
pub struct RuntimeGuard {
    seat: Seat,
    became_initial: bool,
}

impl RuntimeGuard {
    /// The id of this thread's worker.
    #[must_use]
    pub fn worker_id(&self) -> WorkerId { self.seat.worker.id }
}

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        worker::clear_seat();
        deregister_worker();
        if self.became_initial {
            let mut initial = INITIAL.lock().expect("initial seat lock");
            let still_ours = initial
                .as_ref()
                .is_some_and(|seat| Arc::ptr_eq(&seat.worker, &self.seat.worker));
            if still_ours {
                *initial = None;
            }
        }
        tracing::debug!(worker = %self.seat.worker.id, "runtime ended");
    }
}

/// The id of the calling thread's worker.
///
/// Panics if no runtime is active on this thread.
#[must_use]
pub fn current_worker_id() -> WorkerId { worker::seat().worker.id }

/// Suspends the current process until `deadline` has passed.
///
/// Other processes in the worker run in the meantime. The call never returns
/// early; it may return late by however long the scheduler takes to get back
/// to this process.
pub fn sleep_until(deadline: Instant) {
    let seat = worker::seat();
    seat.worker
        .add_no_alt_timeout(deadline, Arc::clone(&seat.process));
    worker::reschedule();
}

/// Suspends the current process for at least `delay`.
pub fn sleep_for(delay: Duration) { sleep_until(clock::deadline_after(delay)); }

/// Yields the seat to the next ready process of this worker, if any.
pub fn yield_now() { worker::yield_now(); }
