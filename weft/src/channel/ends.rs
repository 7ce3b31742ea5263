// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Channel ends for the uncontended roles: [`Sender`] and [`AltReceiver`].
//!
//! Ends are lightweight capabilities over a shared channel core, tagged with
//! a can-poison bit. They are deliberately *not* `Clone`: the unshared roles
//! of a channel belong to one process at a time. (The contended roles live
//! in [`shared`](super::shared) and are `Clone`.)

use super::{AltReadCore, WriteCore};
use crate::{alt::Guard, errors::Poisoned};
use std::{fmt, sync::Arc};

/// The writing end of a channel with an uncontended writer side (1:1 and
/// 1:N).
pub struct Sender<T> {
    core: Arc<dyn WriteCore<T>>,
    can_poison: bool,
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("can_poison", &self.can_poison)
            .finish_non_exhaustive()
    }
}

impl<T> Sender<T> {
    pub(crate) fn new(core: Arc<dyn WriteCore<T>>, can_poison: bool) -> Self {
        Self { core, can_poison }
    }

    /// Writes `value` to the channel, parking until the communication
    /// completes (or buffer space accepts the value).
    ///
    /// # Errors
    ///
    /// [`Poisoned`] if the channel is, or becomes, poisoned; the value is
    /// dropped in that case.
    pub fn write(&self, value: T) -> Result<(), Poisoned> { self.core.write(value) }

    /// Poisons the channel. A no-op on a [`no_poison`](Self::no_poison) end;
    /// idempotent otherwise.
    pub fn poison(&self) {
        if self.can_poison {
            self.core.poison_from_writer();
        }
    }

    /// Fails if the channel is already poisoned; lets compute-heavy bodies
    /// notice shutdown without performing a communication.
    ///
    /// # Errors
    ///
    /// [`Poisoned`] if the channel is poisoned.
    pub fn check_poison(&self) -> Result<(), Poisoned> {
        if self.core.is_poisoned() {
            Err(Poisoned)
        } else {
            Ok(())
        }
    }

    /// A second end for the same channel that cannot poison it - for handing
    /// to sub-processes that should not be able to tear the network down.
    #[must_use]
    pub fn no_poison(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            can_poison: false,
        }
    }
}

impl<T> PartialEq for Sender<T> {
    /// Ends are equal iff they refer to the same channel *and* agree on the
    /// can-poison bit.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core) && self.can_poison == other.can_poison
    }
}

impl<T> Eq for Sender<T> {}

/// The reading end of a channel with an uncontended reader side (1:1 and
/// N:1). "Alt" because this is the end that may stand as an input guard in a
/// choice.
pub struct AltReceiver<T> {
    core: Arc<dyn AltReadCore<T>>,
    can_poison: bool,
}

impl<T> fmt::Debug for AltReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AltReceiver")
            .field("can_poison", &self.can_poison)
            .finish_non_exhaustive()
    }
}

impl<T> AltReceiver<T> {
    pub(crate) fn new(core: Arc<dyn AltReadCore<T>>, can_poison: bool) -> Self {
        Self { core, can_poison }
    }

    /// Reads the next value, parking until a writer (or buffered data)
    /// supplies one.
    ///
    /// # Errors
    ///
    /// [`Poisoned`] if the channel is, or becomes, poisoned.
    pub fn read(&self) -> Result<T, Poisoned> { self.core.read() }

    /// An extended rendezvous: reads the next value and runs `during` *while
    /// the writer is still held in the communication*; only when `during`
    /// returns is the writer released. Returns the value together with
    /// whatever `during` produced.
    ///
    /// Poisoning the channel from inside `during` is allowed; the closing
    /// phase swallows it (this call still succeeds) and the held writer
    /// observes the poison instead of a completed write.
    ///
    /// # Errors
    ///
    /// [`Poisoned`] if the channel is poisoned before the value is obtained.
    pub fn read_ext<R>(&self, during: impl FnOnce(&T) -> R) -> Result<(T, R), Poisoned> {
        let value = self.core.begin_ext()?;
        let result = during(&value);
        self.core.end_ext();
        Ok((value, result))
    }

    /// Whether a read would complete without parking: a writer is committed,
    /// buffered data is available, or the channel is poisoned.
    #[must_use]
    pub fn pending(&self) -> bool { self.core.pending() }

    /// An input guard for this channel, for use in an [`Alt`](crate::Alt).
    ///
    /// The guard is ready when a read would not park - including when the
    /// channel is poisoned, in which case the read that follows selection
    /// reports the poison.
    #[must_use]
    pub fn guard(&self) -> Guard { Guard::input(Arc::clone(&self.core).as_offer()) }

    /// Poisons the channel. A no-op on a [`no_poison`](Self::no_poison) end;
    /// idempotent otherwise.
    pub fn poison(&self) {
        if self.can_poison {
            self.core.poison_from_reader();
        }
    }

    /// Fails if the channel is already poisoned.
    ///
    /// # Errors
    ///
    /// [`Poisoned`] if the channel is poisoned.
    pub fn check_poison(&self) -> Result<(), Poisoned> {
        if self.core.is_poisoned() {
            Err(Poisoned)
        } else {
            Ok(())
        }
    }

    /// A second end for the same channel that cannot poison it.
    #[must_use]
    pub fn no_poison(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            can_poison: false,
        }
    }
}

impl<T> PartialEq for AltReceiver<T> {
    /// Ends are equal iff they refer to the same channel *and* agree on the
    /// can-poison bit.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core) && self.can_poison == other.can_poison
    }
}

impl<T> Eq for AltReceiver<T> {}
