// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The user-facing barrier surface: [`Barrier`] and the move-only
//! [`BarrierEnd`].

use super::core::{BarrierCore, Key};
use std::sync::Arc;

/// A barrier with dynamic membership: any number of ends may enroll, resign
/// and re-enroll over its lifetime, and each `sync` completes exactly when
/// every currently-enrolled end has synced (or resigned).
///
/// All use goes through [`BarrierEnd`]s obtained from [`end()`] /
/// [`enrolled_end()`]. Unlike channels, barriers carry no poison.
///
/// # Panics
///
/// Dropping a barrier while ends are still enrolled on it is a programmer
/// error and panics (suppressed if the thread is already panicking).
///
/// [`end()`]: Barrier::end
/// [`enrolled_end()`]: Barrier::enrolled_end
#[derive(Debug, Default)]
pub struct Barrier {
    core: Arc<BarrierCore>,
}

impl Barrier {
    /// An empty barrier: nobody enrolled, a sync wave of nothing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Arc::new(BarrierCore::new()),
        }
    }

    /// A non-enrolled end of this barrier.
    #[must_use]
    pub fn end(&self) -> BarrierEnd {
        BarrierEnd {
            core: Arc::clone(&self.core),
            state: EndState::NotEnrolled,
        }
    }

    /// An already-enrolled end of this barrier.
    ///
    /// The enrollment is immediately counted (no sync wave can complete
    /// without this end from now on), but is bound to a worker only when the
    /// receiving process first uses the end - so the end can be handed to a
    /// process that has not started yet without a completion racing past it.
    #[must_use]
    pub fn enrolled_end(&self) -> BarrierEnd {
        self.core.half_enroll();
        BarrierEnd {
            core: Arc::clone(&self.core),
            state: EndState::HalfEnrolled,
        }
    }
}

impl Drop for Barrier {
    fn drop(&mut self) {
        if self.core.has_members() && !std::thread::panicking() {
            panic!(
                "barrier misuse: a Barrier was dropped while ends were still enrolled on it - \
                 resign every end first"
            );
        }
    }
}

#[derive(Debug)]
enum EndState {
    NotEnrolled,
    /// Counted globally, not yet bound to a worker; binding happens on first
    /// use by the owning process.
    HalfEnrolled,
    Enrolled(Key),
}

/// One membership capability of a [`Barrier`]. Move-only: passing an end to
/// another process transfers it, so a membership is never accidentally
/// shared.
///
/// An end is either enrolled or not. [`enroll()`] and [`resign()`] are
/// idempotent; [`sync()`] requires an enrolled end. All three must be called
/// from the process that owns the end - to move a membership between
/// processes, resign here and enroll there (or hand over a
/// [`make_enrolled_copy()`]).
///
/// # Panics
///
/// Dropping an end while it is still enrolled is a programmer error: the
/// drop resigns for safety and then panics (suppressed if the thread is
/// already panicking).
///
/// [`enroll()`]: BarrierEnd::enroll
/// [`resign()`]: BarrierEnd::resign
/// [`sync()`]: BarrierEnd::sync
/// [`make_enrolled_copy()`]: BarrierEnd::make_enrolled_copy
#[derive(Debug)]
pub struct BarrierEnd {
    core: Arc<BarrierCore>,
    state: EndState,
}

impl BarrierEnd {
    /// Enrolls on the barrier. No effect if already enrolled.
    pub fn enroll(&mut self) {
        match &self.state {
            EndState::Enrolled(_) => {}
            EndState::HalfEnrolled => {
                self.state = EndState::Enrolled(self.core.complete_enroll());
            }
            EndState::NotEnrolled => {
                self.state = EndState::Enrolled(self.core.enroll());
            }
        }
    }

    /// Resigns from the barrier. No effect if not enrolled. A resignation
    /// may complete the current sync wave on behalf of the parked members.
    pub fn resign(&mut self) {
        match std::mem::replace(&mut self.state, EndState::NotEnrolled) {
            EndState::Enrolled(key) => self.core.resign(&key),
            EndState::HalfEnrolled => self.core.abandon_reservation(),
            EndState::NotEnrolled => {}
        }
    }

    /// Synchronises: parks until every enrolled end of the barrier has
    /// synced or resigned.
    ///
    /// # Panics
    ///
    /// Panics if this end is not enrolled.
    pub fn sync(&mut self) {
        if matches!(self.state, EndState::HalfEnrolled) {
            self.state = EndState::Enrolled(self.core.complete_enroll());
        }
        match &self.state {
            EndState::Enrolled(key) => self.core.sync(key),
            _ => panic!(
                "barrier misuse: sync() on a non-enrolled barrier end - call enroll() first"
            ),
        }
    }

    /// Whether this end is currently enrolled (a half-enrolled end counts).
    #[must_use]
    pub fn is_enrolled(&self) -> bool { !matches!(self.state, EndState::NotEnrolled) }

    /// A new end of the same barrier, already enrolled.
    #[must_use]
    pub fn make_enrolled_copy(&self) -> BarrierEnd {
        self.core.half_enroll();
        BarrierEnd {
            core: Arc::clone(&self.core),
            state: EndState::HalfEnrolled,
        }
    }

    /// A new end of the same barrier, not enrolled.
    #[must_use]
    pub fn make_non_enrolled_copy(&self) -> BarrierEnd {
        BarrierEnd {
            core: Arc::clone(&self.core),
            state: EndState::NotEnrolled,
        }
    }
}

impl PartialEq for BarrierEnd {
    /// Ends are equal iff they belong to the same barrier; enrollment state
    /// is not considered.
    fn eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.core, &other.core) }
}

impl Eq for BarrierEnd {}

impl Drop for BarrierEnd {
    fn drop(&mut self) {
        if !matches!(self.state, EndState::NotEnrolled) {
            // Tidy up so the rest of the barrier is not wedged, then report
            // the misuse.
            self.resign();
            if !std::thread::panicking() {
                panic!(
                    "barrier misuse: a BarrierEnd was dropped while still enrolled - \
                     did you omit a resign() call?"
                );
            }
        }
    }
}
