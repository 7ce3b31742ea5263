// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Monotonic time for the runtime.
//!
//! Timeouts and sleeps are expressed as [`Duration`]s at the API surface and
//! converted to absolute [`Instant`] deadlines only inside the per-worker
//! timeout queue. The absolute value of an [`Instant`] has no meaning outside
//! the process; use it only relative to [`now()`].
//!
//! These clocks are best-effort: precision is whatever the OS monotonic clock
//! provides, which is fine for scheduling but not for hard real-time work.

use std::time::{Duration, Instant};

/// Reads the current monotonic time.
#[must_use]
pub fn now() -> Instant { Instant::now() }

/// The absolute deadline `delay` from now.
///
/// Saturates instead of panicking when the delay is absurdly large.
#[must_use]
pub fn deadline_after(delay: Duration) -> Instant {
    now().checked_add(delay).unwrap_or_else(far_future)
}

/// An effectively-unreachable deadline, for saturating arithmetic.
pub(crate) fn far_future() -> Instant {
    // 30 years of uptime comfortably exceeds any real deployment.
    now() + Duration::from_secs(60 * 60 * 24 * 365 * 30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_after_is_in_the_future() {
        let before = now();
        let deadline = deadline_after(Duration::from_millis(5));
        assert!(deadline > before);
    }

    #[test]
    fn deadline_after_saturates() {
        // Must not panic even for a delay that overflows Instant arithmetic.
        let deadline = deadline_after(Duration::MAX);
        assert!(deadline > now());
    }
}
