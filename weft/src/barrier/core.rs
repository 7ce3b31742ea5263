// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The two-level, dynamically-enrolled barrier engine. See [`BarrierCore`].

use crate::{kernel::{process::ProcessCell,
                     worker::{self, WorkerId}},
            sync::spin_mutex::SpinMutex};
use smallvec::SmallVec;
use std::{collections::HashMap,
          sync::{Arc,
                 atomic::{AtomicU32, Ordering}}};

/// Per-worker membership state. Shared between the worker's own processes
/// (the mutex-light sync fast path) and a completing process walking every
/// entry, so it sits behind its own small lock.
#[derive(Debug, Default)]
pub(crate) struct PerWorker {
    /// Ends currently enrolled from this worker.
    enrolled: u32,
    /// How many of them have yet to sync in the current wave.
    left_to_sync: u32,
    /// The processes of this worker parked on the current wave.
    wait_chain: SmallVec<[Arc<ProcessCell>; 4]>,
}

/// The key an enrolled end holds: a handle on its worker's membership entry.
pub(crate) type Key = Arc<SpinMutex<PerWorker>>;

/// A barrier that processes across many workers synchronise on, with
/// enrollment and resignation at any time.
///
/// Synchronisation is counted at two levels. Each worker's entry counts its
/// own `left_to_sync`; the last process of a worker to sync decrements the
/// cross-worker [`workers_left`] counter; and whoever takes *that* to zero
/// claims the global mutex to complete the wave - unless a mid-flight
/// enroll raised the counter again, in which case it goes back to sleep and
/// the last of the new wave completes instead. Enroll always holds the
/// global mutex, which closes the race with a completing process.
///
/// [`workers_left`]: BarrierCore::workers_left
#[derive(Debug, Default)]
pub(crate) struct BarrierCore {
    /// The global mutex: guards the membership map against completion.
    members: SpinMutex<HashMap<WorkerId, Key>>,
    /// How many workers still have at least one unsynced end.
    workers_left: AtomicU32,
}

impl BarrierCore {
    pub(crate) fn new() -> Self { Self::default() }

    /// Whether any end anywhere is still enrolled (or half-enrolled).
    pub(crate) fn has_members(&self) -> bool {
        !self.members.lock().is_empty() || self.workers_left.load(Ordering::SeqCst) > 0
    }

    /// Enrolls the calling process's worker membership, creating the
    /// per-worker entry on first use.
    pub(crate) fn enroll(&self) -> Key {
        let worker_id = worker::seat().worker.id;
        // Hold the global mutex across the whole update so a concurrent
        // completer cannot finish a wave halfway through this enrollment.
        let mut members = self.members.lock();
        let key = Arc::clone(members.entry(worker_id).or_default());
        {
            let mut entry = key.lock();
            entry.enrolled += 1;
            entry.left_to_sync += 1;
            if entry.left_to_sync == 1 {
                // Everyone else in this worker had already synced (or the
                // entry is new) - this worker is outstanding again.
                self.workers_left.fetch_add(1, Ordering::SeqCst);
            }
        }
        drop(members);
        key
    }

    /// Reserves a membership in the cross-worker count only, without binding
    /// it to any worker yet. Lets an enrolled end be handed to a process
    /// that has not run yet: no sync wave can complete in the hand-off
    /// window.
    pub(crate) fn half_enroll(&self) {
        let _members = self.members.lock();
        self.workers_left.fetch_add(1, Ordering::SeqCst);
    }

    /// Converts a reservation made by [`half_enroll`](Self::half_enroll)
    /// into a real membership for the calling process's worker.
    pub(crate) fn complete_enroll(&self) -> Key {
        let worker_id = worker::seat().worker.id;
        let mut members = self.members.lock();
        let key = Arc::clone(members.entry(worker_id).or_default());
        {
            let mut entry = key.lock();
            entry.enrolled += 1;
            entry.left_to_sync += 1;
            if entry.left_to_sync > 1 {
                // The worker was already outstanding, so the half-enroll's
                // reservation is surplus: give it back. (When
                // `left_to_sync` is 1 the reservation simply becomes this
                // worker's outstanding mark.)
                self.workers_left.fetch_sub(1, Ordering::SeqCst);
            }
        }
        drop(members);
        key
    }

    /// Reverses a [`half_enroll`](Self::half_enroll) that will never be
    /// completed (the reserved end was dropped). Releasing the reservation
    /// may itself complete the current wave.
    pub(crate) fn abandon_reservation(&self) { self.complete_wave(None); }

    /// Synchronises the calling process. Parks until every enrolled end has
    /// synced (or resigned).
    pub(crate) fn sync(&self, key: &Key) {
        let process = worker::current_process();
        let wave_done = {
            let mut entry = key.lock();
            entry.wait_chain.push(Arc::clone(&process));
            entry.left_to_sync -= 1;
            entry.left_to_sync == 0
        };

        let completed = if wave_done {
            self.complete_wave(Some(&process))
        } else {
            false
        };

        if !completed {
            // We may already be back on the run queue (another worker's
            // completion raced ahead of our park); the context token makes
            // that benign.
            worker::reschedule();
        }
    }

    /// Resigns one membership. The resigner may turn out to complete the
    /// wave on behalf of everyone still parked.
    pub(crate) fn resign(&self, key: &Key) {
        let wave_done = {
            let mut entry = key.lock();
            entry.enrolled -= 1;
            if entry.left_to_sync > 0 {
                entry.left_to_sync -= 1;
                entry.left_to_sync == 0
            } else {
                // Already counted as synced this wave: an end being dropped
                // while its sync was unwound by a fatal error. Nothing more
                // to complete on its behalf.
                false
            }
        };
        if wave_done {
            self.complete_wave(None);
        }
    }

    /// The calling process just took its worker's `left_to_sync` to zero:
    /// decrement the cross-worker count and, on zero, try to complete the
    /// whole wave. Returns whether the wave completed (in which case the
    /// caller must not park).
    fn complete_wave(&self, completer: Option<&Arc<ProcessCell>>) -> bool {
        let left = self.workers_left.fetch_sub(1, Ordering::SeqCst) - 1;
        if left != 0 {
            // Other workers still outstanding.
            return false;
        }

        // Claim the global mutex to close the window against concurrent
        // enrollers, then re-check: a mid-flight enroll (or half-enroll) may
        // have raised the count again, in which case the last of that new
        // wave completes instead of us.
        let mut members = self.members.lock();
        if self.workers_left.load(Ordering::SeqCst) != 0 {
            return false;
        }

        // We are the completer. Reset every entry for the next wave, drop
        // the workers with nobody left enrolled, and recompute the
        // cross-worker count before releasing anyone.
        let mut workers_left = 0_u32;
        let mut chains: SmallVec<[SmallVec<[Arc<ProcessCell>; 4]>; 2]> = SmallVec::new();
        members.retain(|_worker_id, key| {
            let mut entry = key.lock();
            let chain = std::mem::take(&mut entry.wait_chain);
            if !chain.is_empty() {
                chains.push(chain);
            }
            if entry.enrolled > 0 {
                entry.left_to_sync = entry.enrolled;
                workers_left += 1;
                true
            } else {
                false
            }
        });
        self.workers_left.store(workers_left, Ordering::SeqCst);
        drop(members);

        // Release every parked chain onto its worker's run queue as one
        // operation, skipping the completer itself (it is about to return
        // from its own sync).
        for chain in chains {
            let mut batch: SmallVec<[Arc<ProcessCell>; 4]> = SmallVec::new();
            for parked in chain {
                if completer.is_some_and(|me| Arc::ptr_eq(me, &parked)) {
                    continue;
                }
                batch.push(parked);
            }
            if let Some(first) = batch.first() {
                let worker = Arc::clone(&first.worker);
                worker.enqueue_chain(batch);
            }
        }
        tracing::trace!("barrier wave completed");
        true
    }
}
