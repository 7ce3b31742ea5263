// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A test-and-test-and-set spin lock guarding the runtime's short critical
//! sections. See [`SpinMutex`].

use std::{cell::UnsafeCell,
          ops::{Deref, DerefMut},
          sync::atomic::{AtomicBool, Ordering}};

/// How many failed claim attempts before the spinner yields the OS thread.
const SPINS_BEFORE_YIELD: u32 = 3;

/// A spin lock for short critical sections that must not block the worker.
///
/// Channels, barriers and buckets all guard their state with one of these.
/// The lock is deliberately *not* the queued process-level mutex: a process
/// that is ALTing still needs to claim channel state from inside the
/// enable/disable sweep, where parking would be incorrect. Critical sections
/// under this lock are a handful of loads and stores; the lock is never held
/// across a reschedule.
///
/// Claiming uses a test-and-test-and-set policy: a plain load checks for a
/// free lock before each compare-and-swap attempt, so contended spinning
/// stays on the local cache line. After a few failed rounds the spinner
/// yields the OS thread rather than burn the core.
#[derive(Debug, Default)]
pub(crate) struct SpinMutex<T> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

// SAFETY: the lock protocol guarantees exclusive access to `value` while a
// guard is live, so sharing the mutex across threads is sound whenever the
// protected value itself can be sent between threads.
unsafe impl<T: Send> Send for SpinMutex<T> {}
unsafe impl<T: Send> Sync for SpinMutex<T> {}

impl<T> SpinMutex<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Tries to claim the lock once, without spinning.
    pub(crate) fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        if !self.locked.load(Ordering::Relaxed)
            && self
                .locked
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
        {
            Some(SpinGuard { mutex: self })
        } else {
            None
        }
    }

    /// Claims the lock, spinning (and eventually yielding) until it succeeds.
    pub(crate) fn lock(&self) -> SpinGuard<'_, T> {
        let mut spins = 0_u32;
        loop {
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            spins += 1;
            if spins >= SPINS_BEFORE_YIELD {
                std::thread::yield_now();
            } else {
                std::hint::spin_loop();
            }
        }
    }
}

/// RAII guard; dropping it releases the lock.
#[derive(Debug)]
pub(crate) struct SpinGuard<'a, T> {
    mutex: &'a SpinMutex<T>,
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: holding the guard means holding the lock.
        unsafe { &*self.mutex.value.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: holding the guard means holding the lock.
        unsafe { &mut *self.mutex.value.get() }
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    fn drop(&mut self) { self.mutex.locked.store(false, Ordering::Release); }
}
