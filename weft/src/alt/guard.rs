// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Guards: the alternatives offered by an [`Alt`]. See [`Guard`].
//!
//! [`Alt`]: crate::Alt

use crate::{clock,
            kernel::{process::ProcessCell, timeout_queue::TimeoutId, worker}};
use std::{fmt,
          sync::Arc,
          time::{Duration, Instant}};

/// The offer half of a channel's reading end: how a choice registers and
/// withdraws interest.
///
/// `enable` attempts to register the alter's offer and reports whether the
/// guard is *already* ready; `disable` deregisters and reports the guard's
/// final readiness. Neither may park.
pub(crate) trait AltOffer: Send + Sync {
    fn enable(&self, alter: &Arc<ProcessCell>) -> bool;
    fn disable(&self, alter: &Arc<ProcessCell>) -> bool;
}

enum Kind {
    /// Ready when the channel has a writer parked (or is poisoned).
    Input(Arc<dyn AltOffer>),
    /// Ready a fixed delay after the select begins; the deadline is
    /// recomputed on every select.
    RelTimeout {
        delay: Duration,
        deadline: Option<Instant>,
        timeout: Option<TimeoutId>,
    },
    /// Ready at a fixed point in time.
    AbsTimeout {
        at: Instant,
        timeout: Option<TimeoutId>,
    },
    /// Always ready. Only sensible as the last guard of a `pri_select`, to
    /// make the choice non-blocking; under `fair_select` it would starve the
    /// rest whenever it rotates to the front.
    Skip,
}

/// One alternative of a choice: a channel input, a relative or absolute
/// timeout, or skip.
///
/// Channel-input guards come from [`AltReceiver::guard()`]; the others from
/// the constructors here. A guard is consumed by the [`Alt`] that holds it
/// and selecting it does *not* perform the input - after `select` returns
/// the chosen index, perform the read (or extended read) on the matching
/// receiver as the next action.
///
/// [`Alt`]: crate::Alt
/// [`AltReceiver::guard()`]: crate::AltReceiver::guard
pub struct Guard {
    kind: Kind,
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match &self.kind {
            Kind::Input(_) => "Input",
            Kind::RelTimeout { .. } => "RelTimeout",
            Kind::AbsTimeout { .. } => "AbsTimeout",
            Kind::Skip => "Skip",
        };
        f.debug_tuple("Guard").field(&name).finish()
    }
}

impl Guard {
    pub(crate) fn input(offer: Arc<dyn AltOffer>) -> Self {
        Self {
            kind: Kind::Input(offer),
        }
    }

    /// A timeout `delay` from the moment the select begins.
    #[must_use]
    pub fn rel_timeout(delay: Duration) -> Self {
        Self {
            kind: Kind::RelTimeout {
                delay,
                deadline: None,
                timeout: None,
            },
        }
    }

    /// A timeout at the absolute instant `at`.
    #[must_use]
    pub fn abs_timeout(at: Instant) -> Self {
        Self {
            kind: Kind::AbsTimeout { at, timeout: None },
        }
    }

    /// The always-ready guard.
    #[must_use]
    pub fn skip() -> Self { Self { kind: Kind::Skip } }

    pub(crate) fn enable(&mut self, alter: &Arc<ProcessCell>) -> bool {
        match &mut self.kind {
            Kind::Input(offer) => offer.enable(alter),
            Kind::RelTimeout {
                delay,
                deadline,
                timeout,
            } => {
                let at = clock::deadline_after(*delay);
                *deadline = Some(at);
                *timeout = Some(alter.worker.add_alt_timeout(at, Arc::clone(alter)));
                clock::now() >= at
            }
            Kind::AbsTimeout { at, timeout } => {
                *timeout = Some(alter.worker.add_alt_timeout(*at, Arc::clone(alter)));
                clock::now() >= *at
            }
            Kind::Skip => true,
        }
    }

    pub(crate) fn disable(&mut self, alter: &Arc<ProcessCell>) -> bool {
        match &mut self.kind {
            Kind::Input(offer) => offer.disable(alter),
            Kind::RelTimeout {
                deadline, timeout, ..
            } => {
                remove_timeout(timeout);
                deadline.is_some_and(|at| clock::now() >= at)
            }
            Kind::AbsTimeout { at, timeout } => {
                remove_timeout(timeout);
                clock::now() >= *at
            }
            Kind::Skip => true,
        }
    }
}

fn remove_timeout(timeout: &mut Option<TimeoutId>) {
    if let Some(id) = timeout.take() {
        // The entry may already have expired and been detached; that simply
        // fails to match.
        let _removed = worker::seat().worker.remove_timeout(id);
    }
}
