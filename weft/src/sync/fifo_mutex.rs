// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A FIFO mutex that parks *processes*, not threads. See [`FifoMutex`].

use crate::{kernel::{process::{ProcessCell, release_committed},
                     worker},
            sync::spin_mutex::SpinMutex};
use std::{collections::VecDeque, sync::Arc};

#[derive(Debug, Default)]
struct FifoState {
    held: bool,
    waiters: VecDeque<Arc<ProcessCell>>,
}

/// A mutex whose contended claimants queue up in strict FIFO order and park
/// as processes (the worker keeps scheduling everything else).
///
/// This is the serialisation lock behind the shared ends of N:1 / 1:N / N:N
/// channels: a claimant holds the lock for the duration of its whole
/// communication, including any park inside it, and release hands the lock
/// directly to the head waiter. The FIFO hand-off is what gives shared
/// channel ends their no-starvation guarantee.
///
/// Must never be claimed by a process that is ALTing; the enable/disable
/// sweep may not park.
#[derive(Debug, Default)]
pub(crate) struct FifoMutex {
    state: SpinMutex<FifoState>,
}

impl FifoMutex {
    pub(crate) fn new() -> Self { Self::default() }

    /// Claims the mutex, parking FIFO behind current claimants. Returns with
    /// the mutex held.
    pub(crate) fn claim(&self) {
        let current = worker::current_process();
        {
            let mut state = self.state.lock();
            if !state.held {
                state.held = true;
                return;
            }
            state.waiters.push_back(current);
        }
        // Whoever releases the mutex wakes us; waking *is* the hand-off.
        worker::reschedule();
    }

    /// Releases the mutex, handing it to the head waiter if there is one.
    ///
    /// The wake-up push happens while the internal lock is still held, so a
    /// racing disable on the woken process cannot observe a released mutex
    /// and then be spuriously re-woken.
    pub(crate) fn release(&self) {
        let mut state = self.state.lock();
        if let Some(next) = state.waiters.pop_front() {
            release_committed(&next);
        } else {
            state.held = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{kernel::start_runtime, run::run_parallel_fibers};
    use serial_test::serial;
    use std::sync::Mutex;

    /// Fibers of one worker claim the mutex, yield while holding it, and
    /// append their tag twice; mutual exclusion means the two appends are
    /// always adjacent, and FIFO order means claimants complete in the order
    /// they claimed.
    #[test]
    #[serial]
    fn fifo_mutex_serialises_processes() {
        let _runtime = start_runtime();
        let mutex = Arc::new(FifoMutex::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let bodies: Vec<Box<dyn FnOnce() + Send>> = (0..4_u32)
            .map(|tag| {
                let mutex = Arc::clone(&mutex);
                let log = Arc::clone(&log);
                Box::new(move || {
                    mutex.claim();
                    log.lock().unwrap().push(tag);
                    crate::kernel::yield_now();
                    log.lock().unwrap().push(tag);
                    mutex.release();
                }) as Box<dyn FnOnce() + Send>
            })
            .collect();
        run_parallel_fibers(bodies).unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 8);
        for pair in log.chunks(2) {
            assert_eq!(pair[0], pair[1], "critical sections interleaved");
        }
        let order: Vec<_> = log.iter().step_by(2).copied().collect();
        assert_eq!(order, vec![0, 1, 2, 3], "hand-off is not FIFO");
    }
}
