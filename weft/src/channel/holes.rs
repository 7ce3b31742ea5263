// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Degenerate channels for plumbing and tests: the data-discarding
//! [`BlackHole`] and the forever-producing [`WhiteHole`].

use super::{AltReadCore, ReadCore, WriteCore};
use crate::{alt::guard::AltOffer, errors::Poisoned, kernel::process::ProcessCell,
            sync::spin_mutex::SpinMutex};
use std::{marker::PhantomData,
          sync::{Arc,
                 atomic::{AtomicBool, Ordering}}};

/// A "one-to-none" channel: every write succeeds immediately and the value
/// is dropped. Useful when a process under test writes to a channel nobody
/// cares about.
///
/// Only the writer can poison it or observe the poison.
#[derive(Debug)]
pub(crate) struct BlackHole<T> {
    poisoned: AtomicBool,
    _values: PhantomData<fn(T)>,
}

impl<T> BlackHole<T> {
    pub(crate) fn new() -> Self {
        Self {
            poisoned: AtomicBool::new(false),
            _values: PhantomData,
        }
    }
}

impl<T: Send> WriteCore<T> for BlackHole<T> {
    fn write(&self, value: T) -> Result<(), Poisoned> {
        if self.poisoned.load(Ordering::SeqCst) {
            return Err(Poisoned);
        }
        drop(value);
        Ok(())
    }

    fn poison_from_writer(&self) { self.poisoned.store(true, Ordering::SeqCst); }

    fn is_poisoned(&self) -> bool { self.poisoned.load(Ordering::SeqCst) }
}

/// A "none-to-one" channel: every read immediately yields a clone of the
/// same value, and its guard is always ready. The reverse of [`BlackHole`],
/// and just as useful for testing readers.
///
/// Only the reader can poison it or observe the poison.
pub(crate) struct WhiteHole<T> {
    state: SpinMutex<WhiteHoleState<T>>,
}

#[derive(Debug)]
struct WhiteHoleState<T> {
    poisoned: bool,
    value: T,
}

impl<T> std::fmt::Debug for WhiteHole<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhiteHole").finish_non_exhaustive()
    }
}

impl<T> WhiteHole<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            state: SpinMutex::new(WhiteHoleState {
                poisoned: false,
                value,
            }),
        }
    }
}

impl<T: Clone + Send> ReadCore<T> for WhiteHole<T> {
    fn read(&self) -> Result<T, Poisoned> {
        let state = self.state.lock();
        if state.poisoned {
            Err(Poisoned)
        } else {
            Ok(state.value.clone())
        }
    }

    fn begin_ext(&self) -> Result<T, Poisoned> {
        // There is no writer to hold parked; an extended input degenerates
        // to a plain read.
        self.read()
    }

    fn end_ext(&self) {}

    fn poison_from_reader(&self) { self.state.lock().poisoned = true; }

    fn pending(&self) -> bool { true }

    fn is_poisoned(&self) -> bool { self.state.lock().poisoned }
}

impl<T: Clone + Send> AltOffer for WhiteHole<T> {
    fn enable(&self, _alter: &Arc<ProcessCell>) -> bool { true }

    fn disable(&self, _alter: &Arc<ProcessCell>) -> bool { true }
}

impl<T: Clone + Send + 'static> AltReadCore<T> for WhiteHole<T> {
    fn as_offer(self: Arc<Self>) -> Arc<dyn AltOffer> { self }
}
