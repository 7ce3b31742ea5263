// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Error types surfaced by the runtime. See [`Poisoned`], [`SpawnError`] and
//! [`DeadlockError`] for details.
//!
//! Two kinds of failure never appear here because they are programmer errors
//! rather than runtime conditions: misuse of a [`Barrier`] (syncing while not
//! enrolled, dropping an enrolled end, dropping a barrier with live
//! enrollments) panics, and a detected global deadlock panics in the initial
//! process with a [`DeadlockError`] payload.
//!
//! [`Barrier`]: crate::Barrier

use crate::kernel::ProcessId;

/// The error returned by every channel operation on a poisoned channel.
///
/// Poison is the co-operative shutdown mechanism: either end of a channel may
/// poison it, the flag latches forever, and every subsequent operation on the
/// channel fails with this error. The conventional reaction in a process body
/// is to poison every owned end and return:
///
/// ```rust
/// use weft::{Poisoned, Sender, AltReceiver};
///
/// fn pass_through(rx: AltReceiver<i32>, tx: Sender<i32>) {
///     let result: Result<(), Poisoned> = (|| {
///         loop {
///             let value = rx.read()?;
///             tx.write(value)?;
///         }
///     })();
///     if result.is_err() {
///         rx.poison();
///         tx.poison();
///     }
/// }
/// ```
///
/// Unlike the other error types in this module, `Poisoned` does not indicate a
/// bug; it is ordinary control flow at the end of a process network's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
#[error("channel is poisoned")]
#[diagnostic(
    code(weft::channel::poisoned),
    help(
        "Poison is the co-operative shutdown signal. Catch it at the top of \
         the process body, poison every channel end the process owns, and \
         return."
    )
)]
pub struct Poisoned;

/// Errors from spawning a new process (worker thread or fiber).
///
/// The runtime maps OS resource exhaustion onto this type. A partially
/// started group is left partially started: children that already spawned
/// keep running, bodies that never spawned are dropped, and the caller
/// observes the error.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SpawnError {
    /// [`std::thread::Builder::spawn()`] failed.
    #[error("failed to spawn a thread to host the process")]
    #[diagnostic(code(weft::run::spawn))]
    #[cfg_attr(
        target_os = "linux",
        diagnostic(help(
            "The system may have reached its thread limit - \
             check `ulimit -u` for the per-user limit, \
             `cat /proc/sys/kernel/threads-max` for the system-wide limit"
        ))
    )]
    #[cfg_attr(
        target_os = "macos",
        diagnostic(help(
            "The system may have reached its thread limit - \
             check `ulimit -u` for the per-user limit, \
             `sysctl kern.num_taskthreads` for the per-process limit"
        ))
    )]
    OutOfResources(#[source] std::io::Error),
}

/// Fatal error raised (as a panic payload) in the initial process when every
/// worker in the program is blocked on runtime synchronisation.
///
/// Deadlock is detected when the last worker with either a ready process or a
/// bounded-deadline wait is about to block indefinitely. The initial worker is
/// woken and panics with this value via [`std::panic::panic_any`], so it can
/// be recovered with [`std::panic::catch_unwind`] and a downcast.
///
/// The error carries a ring of the most recent parks to aid post-mortem
/// diagnosis. Identities may repeat (a process that parked, ran, and parked
/// again) and may refer to processes that have since finished.
#[derive(Debug, Clone, thiserror::Error, miette::Diagnostic)]
#[error("deadlock: every worker is blocked on runtime synchronisation")]
#[diagnostic(
    code(weft::kernel::deadlock),
    help(
        "All processes are waiting on channels, barriers or buckets and none \
         can make progress. Inspect `recent_blocks` (oldest first) to see \
         which processes parked last."
    )
)]
pub struct DeadlockError {
    /// The most recent parks, oldest first, capped at a small fixed window.
    pub recent_blocks: Vec<ProcessId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisoned_display_is_stable() {
        assert_eq!(Poisoned.to_string(), "channel is poisoned");
    }

    #[test]
    fn spawn_error_preserves_source() {
        use std::error::Error as _;
        let err = SpawnError::OutOfResources(std::io::Error::other("boom"));
        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "failed to spawn a thread to host the process"
        );
    }

    #[test]
    fn deadlock_error_reports_blocks() {
        let err = DeadlockError {
            recent_blocks: vec![ProcessId(1), ProcessId(2)],
        };
        assert_eq!(err.recent_blocks.len(), 2);
        assert!(err.to_string().contains("deadlock"));
    }
}
