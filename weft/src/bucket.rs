// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! An unbounded wait-set released in one shot. See [`Bucket`].

use crate::{kernel::{process::ProcessCell,
                     worker::{self, WorkerId}},
            sync::spin_mutex::SpinMutex};
use smallvec::SmallVec;
use std::{collections::HashMap, sync::Arc};

#[derive(Debug, Default)]
struct BucketState {
    /// Parked processes, chained per owning worker so a flush can hand each
    /// worker its chain in one operation.
    waiting: HashMap<WorkerId, SmallVec<[Arc<ProcessCell>; 4]>>,
    holding: u32,
}

/// A bucket: processes [`fall_into`] it and stay parked until somebody
/// [`flush`]es it, which releases the lot at once.
///
/// Unlike a [`Barrier`] there is no enrollment and no counting toward a
/// wave; any process may fall in at any time, and a flush (by any process)
/// empties the bucket completely, however many were waiting - including
/// none.
///
/// ```rust
/// use std::sync::Arc;
/// use weft::Bucket;
///
/// let _runtime = weft::start_runtime();
/// let bucket = Arc::new(Bucket::new());
/// let faller = Arc::clone(&bucket);
/// let flusher = Arc::clone(&bucket);
///
/// weft::run_parallel(vec![
///     Box::new(move || faller.fall_into()),
///     Box::new(move || {
///         while flusher.holding() == 0 {
///             weft::yield_now();
///         }
///         assert_eq!(flusher.flush(), 1);
///     }),
/// ])
/// .unwrap();
/// ```
///
/// [`fall_into`]: Bucket::fall_into
/// [`flush`]: Bucket::flush
/// [`Barrier`]: crate::Barrier
#[derive(Debug, Default)]
pub struct Bucket {
    state: SpinMutex<BucketState>,
}

impl Bucket {
    /// An empty bucket.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Parks the current process in the bucket until the next flush.
    pub fn fall_into(&self) {
        let seat = worker::seat();
        {
            let mut state = self.state.lock();
            state
                .waiting
                .entry(seat.worker.id)
                .or_default()
                .push(Arc::clone(&seat.process));
            state.holding += 1;
        }
        worker::reschedule();
    }

    /// Releases every process currently in the bucket and empties it.
    /// Returns how many were released (possibly zero).
    pub fn flush(&self) -> u32 {
        let (chains, count) = {
            let mut state = self.state.lock();
            let count = state.holding;
            state.holding = 0;
            (std::mem::take(&mut state.waiting), count)
        };
        for (_worker_id, chain) in chains {
            if let Some(first) = chain.first() {
                let worker = Arc::clone(&first.worker);
                worker.enqueue_chain(chain);
            }
        }
        count
    }

    /// How many processes are currently in the bucket.
    #[must_use]
    pub fn holding(&self) -> u32 { self.state.lock().holding }
}
