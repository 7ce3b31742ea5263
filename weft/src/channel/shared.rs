// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Channel ends for the contended roles: [`SharedSender`] and
//! [`SharedReceiver`].
//!
//! A shared end is a clonable capability plus a FIFO process mutex for its
//! role. A claimant holds the role lock for its *entire* communication -
//! including any park inside it - and release hands the lock to the next
//! queued claimant, so contenders take strict turns and none can starve.

use super::{ReadCore, WriteCore};
use crate::{errors::Poisoned, sync::fifo_mutex::FifoMutex};
use std::{fmt,
          sync::{Arc,
                 atomic::{AtomicBool, Ordering}}};

/// The writing end of a channel with a contended writer side (N:1 and N:N).
/// Clone one per writing process.
pub struct SharedSender<T> {
    core: Arc<dyn WriteCore<T>>,
    role_lock: Arc<FifoMutex>,
    can_poison: bool,
}

impl<T> fmt::Debug for SharedSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSender")
            .field("can_poison", &self.can_poison)
            .finish_non_exhaustive()
    }
}

impl<T> Clone for SharedSender<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            role_lock: Arc::clone(&self.role_lock),
            can_poison: self.can_poison,
        }
    }
}

impl<T> SharedSender<T> {
    pub(crate) fn new(
        core: Arc<dyn WriteCore<T>>,
        role_lock: Arc<FifoMutex>,
        can_poison: bool,
    ) -> Self {
        Self {
            core,
            role_lock,
            can_poison,
        }
    }

    /// Writes `value`, queueing FIFO behind other writers first.
    ///
    /// # Errors
    ///
    /// [`Poisoned`] if the channel is, or becomes, poisoned; the value is
    /// dropped in that case.
    pub fn write(&self, value: T) -> Result<(), Poisoned> {
        self.role_lock.claim();
        let result = self.core.write(value);
        self.role_lock.release();
        result
    }

    /// Poisons the channel (queueing behind in-flight writers). A no-op on a
    /// [`no_poison`](Self::no_poison) end; idempotent otherwise.
    pub fn poison(&self) {
        if self.can_poison {
            self.role_lock.claim();
            self.core.poison_from_writer();
            self.role_lock.release();
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

    /// A clone of this end that cannot poison the channel.
    #[must_use]
    pub fn no_poison(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            role_lock: Arc::clone(&self.role_lock),
            can_poison: false,
        }
    }
}

impl<T> PartialEq for SharedSender<T> {
    /// Ends are equal iff they refer to the same channel *and* agree on the
    /// can-poison bit.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core) && self.can_poison == other.can_poison
    }
}

impl<T> Eq for SharedSender<T> {}

/// The reading end of a channel with a contended reader side (1:N and N:N).
/// Clone one per reading process.
///
/// This is *not* a broadcast end: each value goes to exactly one of the
/// queued readers. Choice (ALT) is not available on contended reader sides -
/// an offer that later backs out cannot be reconciled with holding the FIFO
/// turn - so this end has no `guard()`.
pub struct SharedReceiver<T> {
    core: Arc<dyn ReadCore<T>>,
    role_lock: Arc<FifoMutex>,
    /// Set while one of the clones is inside an extended input (and thus
    /// already holds the role lock), so a poison from that process must not
    /// queue behind itself.
    ext_active: Arc<AtomicBool>,
    can_poison: bool,
}

impl<T> fmt::Debug for SharedReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedReceiver")
            .field("can_poison", &self.can_poison)
            .finish_non_exhaustive()
    }
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            role_lock: Arc::clone(&self.role_lock),
            ext_active: Arc::clone(&self.ext_active),
            can_poison: self.can_poison,
        }
    }
}

impl<T> SharedReceiver<T> {
    pub(crate) fn new(
        core: Arc<dyn ReadCore<T>>,
        role_lock: Arc<FifoMutex>,
        can_poison: bool,
    ) -> Self {
        Self {
            core,
            role_lock,
            ext_active: Arc::new(AtomicBool::new(false)),
            can_poison,
        }
    }

    /// Reads the next value, queueing FIFO behind other readers first.
    ///
    /// # Errors
    ///
    /// [`Poisoned`] if the channel is, or becomes, poisoned.
    pub fn read(&self) -> Result<T, Poisoned> {
        self.role_lock.claim();
        let result = self.core.read();
        self.role_lock.release();
        result
    }

    /// An extended rendezvous; see [`AltReceiver::read_ext`]. The role lock
    /// is held for the whole extension, so no other reader communicates
    /// while `during` runs.
    ///
    /// # Errors
    ///
    /// [`Poisoned`] if the channel is poisoned before the value is obtained.
    ///
    /// [`AltReceiver::read_ext`]: super::AltReceiver::read_ext
    pub fn read_ext<R>(&self, during: impl FnOnce(&T) -> R) -> Result<(T, R), Poisoned> {
        self.role_lock.claim();
        self.ext_active.store(true, Ordering::SeqCst);
        match self.core.begin_ext() {
            Ok(value) => {
                let result = during(&value);
                self.core.end_ext();
                self.ext_active.store(false, Ordering::SeqCst);
                self.role_lock.release();
                Ok((value, result))
            }
            Err(Poisoned) => {
                self.ext_active.store(false, Ordering::SeqCst);
                self.role_lock.release();
                Err(Poisoned)
            }
        }
    }

    /// Poisons the channel. A no-op on a [`no_poison`](Self::no_poison) end;
    /// idempotent otherwise.
    pub fn poison(&self) {
        if !self.can_poison {
            return;
        }
        if self.ext_active.load(Ordering::SeqCst) {
            // The poisoning process already holds the role lock (it is
            // inside its own extended input); claiming again would deadlock.
            self.core.poison_from_reader();
        } else {
            self.role_lock.claim();
            self.core.poison_from_reader();
            self.role_lock.release();
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

    /// A clone of this end that cannot poison the channel.
    #[must_use]
    pub fn no_poison(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            role_lock: Arc::clone(&self.role_lock),
            ext_active: Arc::clone(&self.ext_active),
            can_poison: false,
        }
    }
}

impl<T> PartialEq for SharedReceiver<T> {
    /// Ends are equal iff they refer to the same channel *and* agree on the
    /// can-poison bit.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core) && self.can_poison == other.can_poison
    }
}

impl<T> Eq for SharedReceiver<T> {}
