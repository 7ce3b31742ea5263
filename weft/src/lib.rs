// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words rendezvous

//! # weft
//!
//! A process-oriented concurrency runtime in the CSP (Communicating
//! Sequential Processes) style. Programs are networks of lightweight
//! sequential *processes* that share nothing and interact only through typed
//! *channels*, *barriers* and *buckets*.
//!
//! ## The model
//!
//! - **Two-level scheduling.** *Workers* are preemptive OS threads; inside a
//!   worker, *processes* are cooperatively scheduled fibers that run until
//!   they park on a primitive (or yield). A process never migrates between
//!   workers. Start compositions with [`run()`] / [`run_parallel`] /
//!   [`run_sequential`] (new workers) or their `_fibers` variants (current
//!   worker), or fork-and-join through a [`forking`] scope.
//! - **Channels.** Unbuffered channels are synchronous rendezvous; buffered
//!   channels relax them through a [`ChannelBuffer`] policy (bounded,
//!   unbounded, or overwriting FIFO). Four sharing modes per flavour - see
//!   [`one_to_one`] and its siblings - with contended roles serialised FIFO
//!   so no end starves. Readers can perform *extended rendezvous*
//!   ([`AltReceiver::read_ext`]), holding the writer in the communication
//!   while they act on the value.
//! - **Poison.** Either end may [`poison`](Sender::poison) a channel; the
//!   flag latches and every later operation fails with [`Poisoned`]. Poison
//!   one end, propagate on catch, and a whole network shuts down cleanly.
//! - **Choice (ALT).** An [`Alt`] offers channel-input, timeout and skip
//!   [`Guard`]s and commits to exactly one - prioritised, fair, or biased
//!   toward the last selection.
//! - **Barriers and buckets.** A [`Barrier`] synchronises every enrolled
//!   end, with enrollment and resignation at any time (even mid-wave); a
//!   [`Bucket`] parks any number of processes until someone flushes it.
//! - **Deadlock detection.** When every worker in the program is blocked on
//!   runtime synchronisation, the initial process panics with a
//!   [`DeadlockError`] carrying a log of the most recent parks.
//!
//! ## A first network
//!
//! ```rust
//! let _runtime = weft::start_runtime();
//! let (tx, rx) = weft::one_to_one::<i32>();
//!
//! weft::run_parallel(vec![
//!     Box::new(move || {
//!         for n in 0..3 {
//!             if tx.write(n).is_err() {
//!                 return;
//!             }
//!         }
//!         tx.poison();
//!     }),
//!     Box::new(move || {
//!         let mut seen = Vec::new();
//!         while let Ok(n) = rx.read() {
//!             seen.push(n);
//!         }
//!         assert_eq!(seen, vec![0, 1, 2]);
//!     }),
//! ])
//! .unwrap();
//! ```
//!
//! Every thread that uses the runtime must hold a [`start_runtime`] guard;
//! processes started through [`run()`] and friends inherit one automatically.

// Attach sources.
pub mod alt;
pub mod barrier;
pub mod bucket;
pub mod channel;
pub mod clock;
pub mod errors;
pub mod kernel;
pub mod mobile;
pub mod run;
pub mod sync;

// Re-export.
pub use alt::{Alt, Guard};
pub use barrier::{Barrier, BarrierEnd};
pub use bucket::Bucket;
pub use channel::{AltReceiver, BufferFactory, ChannelBuffer, FifoBuffer, OverwritingBuffer,
                  Sender, SharedReceiver, SharedSender, UnboundedFifoBuffer, any_to_any,
                  any_to_one, black_hole, buffered_any_to_any, buffered_any_to_one,
                  buffered_one_to_any, buffered_one_to_one, one_to_any, one_to_one, white_hole};
pub use clock::{deadline_after, now};
pub use errors::{DeadlockError, Poisoned, SpawnError};
pub use kernel::{ProcessId, RuntimeGuard, WorkerId, current_worker_id, sleep_for, sleep_until,
                 start_runtime, yield_now};
pub use mobile::Mobile;
pub use run::{ForkScope, ProcessBody, forking, run, run_parallel, run_parallel_fibers,
              run_sequential, run_sequential_fibers};
