// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Choice over multiple guards: offer them all, commit to exactly one. See
//! [`Alt`].

// Attach sources.
pub mod guard;

// Re-export.
pub use guard::Guard;

use crate::kernel::worker;

/// A choice over an ordered list of [`Guard`]s.
///
/// An `Alt` is a long-lived container: build it once, then select on it any
/// number of times (mixing the selection policies freely). Each select
/// enables the guards in offer order, parks if none is ready yet, and - once
/// at least one is ready - disables them in reverse order, committing to
/// exactly one and returning its index. Selecting does **not** perform the
/// input: read from the chosen receiver as the next action.
///
/// ```rust
/// use std::time::Duration;
/// use weft::{Alt, Guard};
///
/// let _runtime = weft::start_runtime();
/// let (tx, rx) = weft::one_to_one::<u8>();
///
/// weft::run_parallel(vec![
///     Box::new(move || tx.write(7).unwrap()),
///     Box::new(move || {
///         let mut alt = Alt::new(vec![
///             rx.guard(),
///             Guard::rel_timeout(Duration::from_secs(5)),
///         ]);
///         match alt.pri_select() {
///             0 => assert_eq!(rx.read(), Ok(7)),
///             _ => panic!("the channel guard should win"),
///         }
///     }),
/// ])
/// .unwrap();
/// ```
///
/// A guard for a poisoned channel counts as ready; the poison itself is then
/// observed by the read that follows.
#[derive(Debug)]
pub struct Alt {
    guards: Vec<Guard>,
    /// The guard index given top priority by the next `fair_select`.
    favourite: usize,
}

impl Alt {
    /// Builds a choice over `guards`, which must be non-empty.
    ///
    /// # Panics
    ///
    /// Panics if `guards` is empty.
    #[must_use]
    pub fn new(guards: Vec<Guard>) -> Self {
        assert!(!guards.is_empty(), "an Alt needs at least one guard");
        Self {
            guards,
            favourite: 0,
        }
    }

    /// Number of guards in the choice.
    #[must_use]
    pub fn len(&self) -> usize { self.guards.len() }

    /// Always `false`; a choice cannot be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { false }

    /// Prioritised select: of the ready guards, the one earliest in
    /// declaration order wins.
    pub fn pri_select(&mut self) -> usize { self.select_from(0) }

    /// Fair select: like `pri_select` with the order rotated so that each
    /// guard takes its turn at top priority; over many selects every
    /// continually-ready guard is chosen equally often.
    pub fn fair_select(&mut self) -> usize { self.select_from(self.favourite) }

    /// Same-preference select: like `fair_select`, but the guard selected
    /// last time keeps top priority, so a bursty channel is drained without
    /// rotating away from it.
    pub fn same_select(&mut self) -> usize {
        let selected = self.select_from(self.favourite);
        // Undo the rotation: leave the favourite on the guard just selected
        // (wrapping from zero to the last index).
        self.favourite = (self.favourite + self.guards.len() - 1) % self.guards.len();
        selected
    }

    /// Replaces the guard at `index`, returning the old one. Useful for
    /// refreshing a timeout guard without rebuilding the whole choice; the
    /// fairness state is unaffected.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn replace_guard(&mut self, index: usize, guard: Guard) -> Guard {
        std::mem::replace(&mut self.guards[index], guard)
    }

    /// The enable/disable sweep shared by every policy. `start` is the guard
    /// given top priority; readiness resolution walks the rotated order.
    fn select_from(&mut self, start: usize) -> usize {
        let alter = worker::current_process();
        let count = self.guards.len();

        alter.alt_enabling();

        // Enable in offer order until one reports already-ready.
        let mut enabled = 0;
        let mut found_ready = false;
        for step in 0..count {
            enabled += 1;
            if self.guards[(start + step) % count].enable(&alter) {
                found_ready = true;
                break;
            }
        }

        // Nothing ready yet: park, unless a counterpart fired mid-enable (in
        // which case the CAS to Waiting fails and we fall through).
        if !found_ready && alter.alt_should_wait() {
            worker::reschedule();
        }

        // Disable in reverse enable order; the lowest-priority-index ready
        // guard seen last wins.
        let mut selected = None;
        for step in (0..enabled).rev() {
            let index = (start + step) % count;
            if self.guards[index].disable(&alter) {
                selected = Some(index);
            }
        }

        alter.alt_finish();

        let selected = selected.expect("a completed select must have a ready guard");
        self.favourite = (selected + 1) % count;
        selected
    }
}
