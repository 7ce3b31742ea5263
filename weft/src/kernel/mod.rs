// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The two-level scheduling substrate: preemptive workers (OS threads), each
//! hosting a cooperative FIFO run queue of processes, with an integrated
//! timeout service and global deadlock detection.
//!
//! # The two levels
//!
//! ```text
//!            OS scheduler (preemptive)
//!      ┌──────────────┴───────────────┐
//! ┌────┴─────┐                  ┌─────┴────┐
//! │ worker 0 │                  │ worker 1 │        one *seat* each:
//! │          │                  │          │        exactly one process
//! │ run q:   │   cross-thread   │ run q:   │        of a worker runs
//! │ [P2, P3] │◄──── wake-ups ───│ [P7]     │        at any moment
//! │ timeouts │     (enqueue)    │ timeouts │
//! └──────────┘                  └──────────┘
//!      ▲                             ▲
//!      │ cooperative: P1 runs until  │
//!      │ it parks on a primitive,    │
//!      │ then hands the seat to P2   │
//! ```
//!
//! A process belongs to one worker for its whole life; a wake-up from
//! another worker only ever *enqueues* onto the owner's run queue. Between
//! its workers, the program is as parallel as the OS makes it; within a
//! worker, processes interleave only at the suspension points (channel
//! operations, barrier sync, bucket fall, sleep, select, yield).
//!
//! # Parking and waking
//!
//! A parking process first places itself on the wait structure it expects
//! to be woken from (a channel's waiter slot, a barrier chain, the timeout
//! queue), then calls `reschedule()`: drain expired timeouts, pop
//! the next ready process (blocking the thread until the earliest deadline
//! or a cross-thread wake-up), switch. The wake-up side pushes the parked
//! process back onto its owner's queue - directly for committed waiters,
//! through the four-state ALT word for possibly-choosing ones
//! (`release_maybe()`).
//!
//! # Deadlock
//!
//! A process-wide counter tracks how many workers have either a ready
//! process or a bounded-deadline wait. A worker about to block with neither
//! decrements it; whoever moves it to zero has proven that nothing in the
//! program can ever run again, and wakes the initial process to raise
//! [`DeadlockError`](crate::DeadlockError) with the recent-parks ring.
//!
//! Layering, leaves first: [`context`] (the suspended-execution seam) →
//! [`process`] (the process cell + release discipline) → [`run_queue`] +
//! [`timeout_queue`] → [`worker`] (the scheduler proper) → [`runtime`]
//! (process-global state and lifecycle).

// Attach sources.
pub mod context;
pub mod process;
pub mod run_queue;
pub mod runtime;
pub mod timeout_queue;
pub mod worker;

// Re-export.
pub use process::ProcessId;
pub use runtime::{RuntimeGuard, current_worker_id, sleep_for, sleep_until, start_runtime,
                  yield_now};
pub use worker::WorkerId;
