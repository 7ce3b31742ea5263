// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The per-worker timeout queue: two deadline-ordered lists, one for plain
//! sleeps and one for ALT timeout guards. See [`TimeoutQueue`].

use super::process::ProcessCell;
use smallvec::SmallVec;
use std::{sync::Arc, time::Instant};

/// Handle for removing a registered timeout in O(list) time.
///
/// Handles are unique for the life of the queue and never reused, so a stale
/// handle (whose timeout already expired) simply fails to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimeoutId(u64);

#[derive(Debug)]
struct Entry {
    deadline: Instant,
    process: Arc<ProcessCell>,
    id: TimeoutId,
}

/// Deadline-ordered timeouts for one worker.
///
/// Two lists are kept because expiry differs: a *no-ALT* entry (sleeps,
/// plain bounded waits) unconditionally wakes its process, while an *ALT*
/// entry belongs to a timeout guard offered by a running choice and its
/// firing must go through the alting-aware release, where it may turn out to
/// be ignored because another guard already won.
///
/// Insertion is a linear walk keeping each list sorted ascending by
/// deadline; peeking the soonest deadline is O(1).
#[derive(Debug, Default)]
pub(crate) struct TimeoutQueue {
    no_alt: Vec<Entry>,
    alt: Vec<Entry>,
    next_id: u64,
}

/// Everything that expired in one [`TimeoutQueue::expire_up_to`] sweep.
#[derive(Debug, Default)]
pub(crate) struct Expired {
    /// Wake unconditionally, as one chain.
    pub(crate) no_alt: SmallVec<[Arc<ProcessCell>; 4]>,
    /// Wake through the alting-aware release.
    pub(crate) alt: SmallVec<[Arc<ProcessCell>; 4]>,
}

impl TimeoutQueue {
    pub(crate) fn new() -> Self { Self::default() }

    fn fresh_id(&mut self) -> TimeoutId {
        self.next_id += 1;
        TimeoutId(self.next_id)
    }

    fn insert(list: &mut Vec<Entry>, entry: Entry) {
        let position = list
            .iter()
            .position(|existing| existing.deadline > entry.deadline)
            .unwrap_or(list.len());
        list.insert(position, entry);
    }

    /// Registers a timeout that wakes `process` unconditionally, even if the
    /// deadline has already elapsed.
    pub(crate) fn add_no_alt(
        &mut self,
        deadline: Instant,
        process: Arc<ProcessCell>,
    ) -> TimeoutId {
        let id = self.fresh_id();
        Self::insert(
            &mut self.no_alt,
            Entry {
                deadline,
                process,
                id,
            },
        );
        id
    }

    /// Registers a timeout backing an ALT timeout guard.
    pub(crate) fn add_alt(&mut self, deadline: Instant, process: Arc<ProcessCell>) -> TimeoutId {
        let id = self.fresh_id();
        Self::insert(
            &mut self.alt,
            Entry {
                deadline,
                process,
                id,
            },
        );
        id
    }

    /// Removes a registered timeout.
    ///
    /// `true` means the timeout was still queued. `false` means it had
    /// already been removed - either it expired, or an earlier remove call
    /// took it.
    pub(crate) fn remove(&mut self, id: TimeoutId) -> bool {
        for list in [&mut self.no_alt, &mut self.alt] {
            if let Some(position) = list.iter().position(|entry| entry.id == id) {
                list.remove(position);
                return true;
            }
        }
        false
    }

    /// The earliest deadline across both lists, if any timeout is pending.
    pub(crate) fn soonest(&self) -> Option<Instant> {
        let no_alt = self.no_alt.first().map(|entry| entry.deadline);
        let alt = self.alt.first().map(|entry| entry.deadline);
        match (no_alt, alt) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    pub(crate) fn is_empty(&self) -> bool { self.no_alt.is_empty() && self.alt.is_empty() }

    /// Detaches every entry whose deadline is at or before `now`.
    pub(crate) fn expire_up_to(&mut self, now: Instant) -> Expired {
        let mut expired = Expired::default();

        let cut = self
            .no_alt
            .iter()
            .position(|entry| entry.deadline > now)
            .unwrap_or(self.no_alt.len());
        for entry in self.no_alt.drain(..cut) {
            expired.no_alt.push(entry.process);
        }

        let cut = self
            .alt
            .iter()
            .position(|entry| entry.deadline > now)
            .unwrap_or(self.alt.len());
        for entry in self.alt.drain(..cut) {
            expired.alt.push(entry.process);
        }

        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{context::ThreadContext, process::ProcessId, worker::Worker};
    use std::time::Duration;

    fn cell(id: u64) -> Arc<ProcessCell> {
        Arc::new(ProcessCell::new(
            ProcessId(id),
            Worker::for_tests(),
            Box::new(ThreadContext::new()),
        ))
    }

    #[test]
    fn deadlines_stay_sorted() {
        let mut queue = TimeoutQueue::new();
        let base = Instant::now();
        queue.add_no_alt(base + Duration::from_millis(30), cell(1));
        queue.add_no_alt(base + Duration::from_millis(10), cell(2));
        queue.add_no_alt(base + Duration::from_millis(20), cell(3));

        let deadlines: Vec<_> = queue.no_alt.iter().map(|e| e.deadline).collect();
        let mut sorted = deadlines.clone();
        sorted.sort();
        assert_eq!(deadlines, sorted);
        assert_eq!(queue.soonest(), Some(base + Duration::from_millis(10)));
    }

    #[test]
    fn remove_is_single_shot() {
        let mut queue = TimeoutQueue::new();
        let id = queue.add_alt(Instant::now() + Duration::from_millis(50), cell(1));
        assert!(queue.remove(id));
        assert!(!queue.remove(id), "a handle only matches once");
        assert!(queue.is_empty());
    }

    #[test]
    fn expire_detaches_only_elapsed_entries() {
        let mut queue = TimeoutQueue::new();
        let base = Instant::now();
        queue.add_no_alt(base, cell(1));
        queue.add_alt(base, cell(2));
        queue.add_no_alt(base + Duration::from_secs(60), cell(3));

        let expired = queue.expire_up_to(base + Duration::from_millis(1));
        assert_eq!(expired.no_alt.len(), 1);
        assert_eq!(expired.alt.len(), 1);
        assert_eq!(expired.no_alt[0].id, ProcessId(1));
        assert_eq!(expired.alt[0].id, ProcessId(2));
        assert!(!queue.is_empty());
        assert_eq!(queue.soonest(), Some(base + Duration::from_secs(60)));
    }

    #[test]
    fn soonest_spans_both_lists() {
        let mut queue = TimeoutQueue::new();
        let base = Instant::now();
        queue.add_no_alt(base + Duration::from_millis(40), cell(1));
        queue.add_alt(base + Duration::from_millis(15), cell(2));
        assert_eq!(queue.soonest(), Some(base + Duration::from_millis(15)));
    }
}
