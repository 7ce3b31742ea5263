// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The process cell and the release (wake-up) discipline, including the
//! four-state ALT word that closes the wake-up races between choice and its
//! counterparts. See [`ProcessCell`] and [`release_maybe()`].

use super::{context::Context, worker::Worker};
use std::{fmt,
          sync::{Arc,
                 atomic::{AtomicBool, AtomicU8, Ordering}}};

/// Identifies a process for diagnostics (the recent-blocks ring, tracing).
///
/// Ids are unique for the life of the program and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "process-{}", self.0)
    }
}

/// The ALT word: not currently offering a choice.
const NOT_ALTING: u8 = 0;
/// The ALT word: enabling guards, has not yet decided whether to park.
const ENABLING: u8 = 1;
/// The ALT word: at least one counterpart fired; the alter must not park (or
/// has already been woken).
const GUARDS_READY: u8 = 2;
/// The ALT word: parked waiting for any guard to fire.
const WAITING: u8 = 3;

/// One lightweight process: a fiber with an owning worker.
///
/// A process lives on exactly one of {run queue, channel wait slot, barrier
/// wait chain, bucket wait chain, timeout queue} or is the one currently
/// executing on its worker. It never migrates between workers.
///
/// All cross-thread protocol fields use `SeqCst` so no call site has to
/// reason about weaker orderings.
pub(crate) struct ProcessCell {
    pub(crate) id: ProcessId,
    /// The owning worker; fixed for the life of the process.
    pub(crate) worker: Arc<Worker>,
    /// The four-state ALT word. See [`release_maybe()`].
    alting: AtomicU8,
    /// Flipped by a communication counterpart to distinguish "communication
    /// completed" from "released by poison" when the process resumes.
    comm_done: AtomicBool,
    /// The suspended execution context.
    pub(crate) context: Box<dyn Context>,
}

impl fmt::Debug for ProcessCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessCell")
            .field("id", &self.id)
            .field("worker", &self.worker.id)
            .field("alting", &self.alting.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ProcessCell {
    pub(crate) fn new(id: ProcessId, worker: Arc<Worker>, context: Box<dyn Context>) -> Self {
        Self {
            id,
            worker,
            alting: AtomicU8::new(NOT_ALTING),
            comm_done: AtomicBool::new(false),
            context,
        }
    }

    /// Clears the communication flag; call before parking on a channel.
    pub(crate) fn begin_comm_wait(&self) { self.comm_done.store(false, Ordering::SeqCst); }

    /// Marks the parked peer's communication as completed (as opposed to a
    /// poison release). Called by the counterpart before the wake-up push.
    pub(crate) fn finish_comm(&self) { self.comm_done.store(true, Ordering::SeqCst); }

    /// Whether the communication completed; check after resuming from a park.
    pub(crate) fn comm_finished(&self) -> bool { self.comm_done.load(Ordering::SeqCst) }

    /// ALT start: the alter is about to enable its guards.
    pub(crate) fn alt_enabling(&self) { self.alting.store(ENABLING, Ordering::SeqCst); }

    /// After enabling every guard without finding one ready: attempt the
    /// `Enabling -> Waiting` transition. `true` means the alter should park;
    /// `false` means a counterpart fired mid-enable and it must proceed
    /// straight to the disable sweep.
    pub(crate) fn alt_should_wait(&self) -> bool {
        self.alting
            .compare_exchange(ENABLING, WAITING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// ALT end: back to not-alting.
    pub(crate) fn alt_finish(&self) { self.alting.store(NOT_ALTING, Ordering::SeqCst); }
}

/// Wakes a parked process that is known not to be ALTing (committed readers,
/// writers, barrier and bucket waiters, FIFO-mutex claimants): a direct push
/// onto its owning worker's run queue.
pub(crate) fn release_committed(process: &Arc<ProcessCell>) {
    tracing::trace!(id = %process.id, "release (committed)");
    process.worker.enqueue(Arc::clone(process));
}

/// Wakes a possibly-ALTing process. This is the protocol that prevents the
/// double-wake / missed-wake races between an ALT and its channel or timeout
/// counterparts:
///
/// - `NotAlting`: wake normally.
/// - `Enabling`: flip to `GuardsReady`; the alter will notice before it tries
///   to park, so no push.
/// - `Waiting`: race to flip to `GuardsReady`; whoever wins the CAS performs
///   the single push.
/// - `GuardsReady`: someone else already did; nothing to do.
pub(crate) fn release_maybe(process: &Arc<ProcessCell>) {
    match process.alting.compare_exchange(
        ENABLING,
        GUARDS_READY,
        Ordering::SeqCst,
        Ordering::SeqCst,
    ) {
        Ok(_) => {
            tracing::trace!(id = %process.id, "release (maybe): flagged while enabling");
        }
        Err(NOT_ALTING) => release_committed(process),
        Err(GUARDS_READY) => {}
        Err(_waiting) => {
            if process
                .alting
                .compare_exchange(WAITING, GUARDS_READY, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                tracing::trace!(id = %process.id, "release (maybe): won the wake race");
                release_committed(process);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::context::ThreadContext;

    #[test]
    fn alt_word_transitions() {
        let worker = Worker::for_tests();
        let cell = ProcessCell::new(
            ProcessId(1),
            worker,
            Box::new(ThreadContext::new()),
        );

        cell.alt_enabling();
        assert!(cell.alt_should_wait(), "Enabling -> Waiting must succeed");
        assert!(
            !cell.alt_should_wait(),
            "second attempt must fail: no longer Enabling"
        );
        cell.alt_finish();
    }

    #[test]
    fn comm_flag_round_trip() {
        let worker = Worker::for_tests();
        let cell = ProcessCell::new(
            ProcessId(2),
            worker,
            Box::new(ThreadContext::new()),
        );

        cell.begin_comm_wait();
        assert!(!cell.comm_finished());
        cell.finish_comm();
        assert!(cell.comm_finished());
    }
}
