// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The unbuffered (fully synchronous) channel core. See [`Rendezvous`].

use super::{AltReadCore, ReadCore, WriteCore};
use crate::{alt::guard::AltOffer,
            errors::Poisoned,
            kernel::{process::{ProcessCell, release_committed, release_maybe},
                     worker},
            sync::spin_mutex::SpinMutex};
use std::sync::Arc;

/// What the single parked peer of the channel is doing there.
#[derive(Debug)]
enum Role<T> {
    /// A reader that has committed to this input and recorded where the
    /// value should go (the handoff slot).
    CommittedReader,
    /// A reader that is merely offering - an ALT enable or the opening phase
    /// of an extended input. A writer that meets one must park itself and
    /// wait to be collected.
    OfferingReader,
    /// A writer, together with its outgoing value. The value is `None` once
    /// an extended input has collected it while leaving the writer parked.
    Writer(Option<T>),
}

#[derive(Debug)]
struct Waiter<T> {
    process: Arc<ProcessCell>,
    role: Role<T>,
}

#[derive(Debug)]
struct State<T> {
    poisoned: bool,
    /// At most one parked peer at a time; the shared-mode FIFO locks uphold
    /// this for the N-sided flavours.
    waiter: Option<Waiter<T>>,
    /// Where a writer deposits the value for a committed reader it released.
    handoff: Option<T>,
}

/// A synchronous rendezvous channel: neither side's operation completes
/// until the other side has arrived.
///
/// The protocol pivots on the [`Role`] of the single parked peer and on each
/// process's communication-done flag, which the counterpart flips to
/// distinguish "communication completed" from "released by poison". The one
/// asymmetric case is a writer meeting an *offering* reader (ALTing, or in
/// the first phase of an extended input): the writer cannot complete the
/// transfer because the reader has not committed, so the writer takes the
/// reader's place in the channel and the reader collects the value once it
/// commits.
#[derive(Debug)]
pub(crate) struct Rendezvous<T> {
    state: SpinMutex<State<T>>,
}

impl<T> Rendezvous<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: SpinMutex::new(State {
                poisoned: false,
                waiter: None,
                handoff: None,
            }),
        }
    }

    fn poison(&self) {
        let mut state = self.state.lock();
        state.poisoned = true;
        // The parked peer (if any) may be mid-ALT; release it through the
        // alting-aware path and leave its communication flag alone so it
        // observes the poison.
        if let Some(waiter) = state.waiter.take() {
            release_maybe(&waiter.process);
        }
        tracing::debug!("channel poisoned");
    }
}

impl<T: Send> WriteCore<T> for Rendezvous<T> {
    fn write(&self, value: T) -> Result<(), Poisoned> {
        let mut state = self.state.lock();
        if state.poisoned {
            return Err(Poisoned);
        }
        match state.waiter.take() {
            Some(Waiter {
                process,
                role: Role::CommittedReader,
            }) => {
                state.handoff = Some(value);
                process.finish_comm();
                release_committed(&process);
                Ok(())
            }
            Some(Waiter {
                process,
                role: Role::OfferingReader,
            }) => {
                // The reader has not committed; park in its place with the
                // value and let it collect once it does.
                let current = worker::current_process();
                current.begin_comm_wait();
                state.waiter = Some(Waiter {
                    process: Arc::clone(&current),
                    role: Role::Writer(Some(value)),
                });
                process.finish_comm();
                release_maybe(&process);
                drop(state);
                worker::reschedule();
                if current.comm_finished() {
                    Ok(())
                } else {
                    Err(Poisoned)
                }
            }
            Some(Waiter {
                role: Role::Writer(_),
                ..
            }) => {
                // The end types (and the shared-mode FIFO locks) make a
                // second concurrent writer impossible.
                unreachable!("second writer parked on an unshared channel")
            }
            None => {
                let current = worker::current_process();
                current.begin_comm_wait();
                state.waiter = Some(Waiter {
                    process: Arc::clone(&current),
                    role: Role::Writer(Some(value)),
                });
                drop(state);
                worker::reschedule();
                if current.comm_finished() {
                    Ok(())
                } else {
                    Err(Poisoned)
                }
            }
        }
    }

    fn poison_from_writer(&self) { self.poison(); }

    fn is_poisoned(&self) -> bool { self.state.lock().poisoned }
}

impl<T: Send> ReadCore<T> for Rendezvous<T> {
    fn read(&self) -> Result<T, Poisoned> {
        let mut state = self.state.lock();
        if state.poisoned {
            return Err(Poisoned);
        }
        match state.waiter.take() {
            Some(Waiter {
                process,
                role: Role::Writer(value),
            }) => {
                let value = value.expect("a parked writer still owns its value");
                process.finish_comm();
                release_committed(&process);
                Ok(value)
            }
            Some(_) => unreachable!("second reader parked on an unshared channel"),
            None => {
                let current = worker::current_process();
                current.begin_comm_wait();
                state.waiter = Some(Waiter {
                    process: Arc::clone(&current),
                    role: Role::CommittedReader,
                });
                drop(state);
                worker::reschedule();
                if current.comm_finished() {
                    let mut state = self.state.lock();
                    Ok(state
                        .handoff
                        .take()
                        .expect("a completed read has a handoff value"))
                } else {
                    Err(Poisoned)
                }
            }
        }
    }

    fn begin_ext(&self) -> Result<T, Poisoned> {
        let mut state = self.state.lock();
        if state.poisoned {
            return Err(Poisoned);
        }
        match &mut state.waiter {
            Some(Waiter {
                role: Role::Writer(value),
                ..
            }) => {
                // Collect the value but leave the writer parked for the
                // duration of the extension.
                Ok(value.take().expect("a parked writer still owns its value"))
            }
            Some(_) => unreachable!("second reader parked on an unshared channel"),
            None => {
                let current = worker::current_process();
                current.begin_comm_wait();
                state.waiter = Some(Waiter {
                    process: Arc::clone(&current),
                    role: Role::OfferingReader,
                });
                drop(state);
                worker::reschedule();
                if !current.comm_finished() {
                    return Err(Poisoned);
                }
                // A writer swapped itself in and parked with the value.
                let mut state = self.state.lock();
                match &mut state.waiter {
                    Some(Waiter {
                        role: Role::Writer(value),
                        ..
                    }) if value.is_some() => Ok(value.take().expect("checked is_some")),
                    // Poison won the race between our wake-up and now.
                    _ => Err(Poisoned),
                }
            }
        }
    }

    fn end_ext(&self) {
        let mut state = self.state.lock();
        // The reader may have poisoned the channel during the extension; the
        // writer was already released through the poison path, and this end
        // phase must not fail.
        if state.poisoned {
            return;
        }
        if let Some(Waiter {
            process,
            role: Role::Writer(_),
        }) = state.waiter.take()
        {
            process.finish_comm();
            release_committed(&process);
        }
    }

    fn poison_from_reader(&self) { self.poison(); }

    fn pending(&self) -> bool {
        let state = self.state.lock();
        state.poisoned
            || matches!(
                &state.waiter,
                Some(Waiter {
                    role: Role::Writer(value),
                    ..
                }) if value.is_some()
            )
    }

    fn is_poisoned(&self) -> bool { self.state.lock().poisoned }
}

impl<T: Send> AltOffer for Rendezvous<T> {
    fn enable(&self, alter: &Arc<ProcessCell>) -> bool {
        let mut state = self.state.lock();
        if state.poisoned {
            return true;
        }
        match &state.waiter {
            // The same choice offers this channel more than once: if we are
            // the one waiting to read, nobody is waiting to write.
            Some(waiter) if Arc::ptr_eq(&waiter.process, alter) => false,
            Some(_) => true,
            None => {
                state.waiter = Some(Waiter {
                    process: Arc::clone(alter),
                    role: Role::OfferingReader,
                });
                false
            }
        }
    }

    fn disable(&self, alter: &Arc<ProcessCell>) -> bool {
        let mut state = self.state.lock();
        if state.poisoned {
            return true;
        }
        match &state.waiter {
            Some(waiter) if !Arc::ptr_eq(&waiter.process, alter) => true,
            Some(_) => {
                state.waiter = None;
                false
            }
            None => false,
        }
    }
}

impl<T: Send + 'static> AltReadCore<T> for Rendezvous<T> {
    fn as_offer(self: Arc<Self>) -> Arc<dyn AltOffer> { self }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{context::ThreadContext, process::ProcessId, worker::Worker};

    fn cell(id: u64) -> Arc<ProcessCell> {
        Arc::new(ProcessCell::new(
            ProcessId(id),
            Worker::for_tests(),
            Box::new(ThreadContext::new()),
        ))
    }

    /// The enable/disable pair with no writer present: enable registers the
    /// offer (not ready), disable withdraws it (still not ready).
    #[test]
    fn enable_registers_and_disable_withdraws() {
        let channel: Rendezvous<i32> = Rendezvous::new();
        let alter = cell(1);

        assert!(!channel.enable(&alter), "empty channel is not ready");
        assert!(
            matches!(
                &channel.state.lock().waiter,
                Some(Waiter {
                    role: Role::OfferingReader,
                    ..
                })
            ),
            "enable must leave an offering reader in the channel"
        );
        assert!(!channel.disable(&alter));
        assert!(channel.state.lock().waiter.is_none());
    }

    /// Offering the same channel twice in one choice: the second enable sees
    /// the alter's own offer and must not report ready.
    #[test]
    fn enable_twice_by_the_same_alter_is_not_ready() {
        let channel: Rendezvous<i32> = Rendezvous::new();
        let alter = cell(2);

        assert!(!channel.enable(&alter));
        assert!(!channel.enable(&alter), "our own offer is not a writer");
    }

    #[test]
    fn poison_makes_the_guard_ready_and_latches() {
        let channel: Rendezvous<i32> = Rendezvous::new();
        let alter = cell(3);

        channel.poison_from_reader();
        channel.poison_from_writer(); // idempotent
        assert!(ReadCore::is_poisoned(&channel));
        assert!(channel.enable(&alter));
        assert!(channel.disable(&alter));
        assert!(channel.pending());
    }

    #[test]
    fn pending_is_false_without_a_committed_writer() {
        let channel: Rendezvous<i32> = Rendezvous::new();
        assert!(!channel.pending());
    }
}
