// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The buffered channel core: the rendezvous engine relaxed through a
//! [`ChannelBuffer`] policy. See [`Buffered`].

use super::{AltReadCore, ReadCore, WriteCore, buffers::ChannelBuffer};
use crate::{alt::guard::AltOffer,
            errors::Poisoned,
            kernel::{process::{ProcessCell, release_committed, release_maybe},
                     worker},
            sync::spin_mutex::SpinMutex};
use std::sync::Arc;

#[derive(Debug)]
enum Role<T> {
    /// A reader parked on an empty buffer. `committed` is false for ALT
    /// offers and the opening phase of an extended input, where the waker
    /// must not pop the buffer on the reader's behalf.
    Reader { committed: bool },
    /// A writer parked on a full buffer, holding the value it could not put.
    Writer(Option<T>),
}

struct Waiter<T> {
    process: Arc<ProcessCell>,
    role: Role<T>,
}

struct State<T> {
    poisoned: bool,
    waiter: Option<Waiter<T>>,
    /// Where a value is deposited for a committed reader that was parked on
    /// an empty buffer.
    handoff: Option<T>,
    buffer: Box<dyn ChannelBuffer<T>>,
}

/// A buffered channel: writes complete without a reader while the buffer
/// accepts them, reads complete without a writer while it has data.
///
/// At most one process is ever parked on the core - a reader (buffer empty)
/// or a writer (buffer full) - and values always travel *through* the
/// buffer, so the policy observes every element.
///
/// Poison is asymmetric by design: a reader's poison clears the buffer and
/// is seen immediately, a writer's poison leaves the buffer to drain and is
/// only seen by the reader once it is empty. Reads from a non-empty buffer
/// deliberately skip the poison check.
pub(crate) struct Buffered<T> {
    state: SpinMutex<State<T>>,
}

impl<T> std::fmt::Debug for Buffered<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffered").finish_non_exhaustive()
    }
}

impl<T> Buffered<T> {
    pub(crate) fn new(buffer: Box<dyn ChannelBuffer<T>>) -> Self {
        Self {
            state: SpinMutex::new(State {
                poisoned: false,
                waiter: None,
                handoff: None,
                buffer,
            }),
        }
    }

    fn poison(&self, clear_buffer: bool) {
        let mut state = self.state.lock();
        state.poisoned = true;
        if clear_buffer {
            state.buffer.clear();
        }
        if let Some(waiter) = state.waiter.take() {
            release_maybe(&waiter.process);
        }
        tracing::debug!(cleared = clear_buffer, "buffered channel poisoned");
    }
}

/// If a writer is parked and the buffer now has room for its value, complete
/// its put and wake it.
fn drain_parked_writer<T>(state: &mut State<T>) {
    let has_room = match &state.waiter {
        Some(Waiter {
            role: Role::Writer(Some(value)),
            ..
        }) => state.buffer.output_would_succeed(value),
        _ => false,
    };
    if !has_room {
        return;
    }
    if let Some(Waiter {
        process,
        role: Role::Writer(Some(value)),
    }) = state.waiter.take()
    {
        state.buffer.put(value);
        process.finish_comm();
        release_committed(&process);
    }
}

impl<T: Send> WriteCore<T> for Buffered<T> {
    fn write(&self, value: T) -> Result<(), Poisoned> {
        let mut state = self.state.lock();
        if state.poisoned {
            return Err(Poisoned);
        }
        if state.buffer.output_would_succeed(&value) {
            state.buffer.put(value);
            // A parked reader can complete now - unless it is an offering
            // (ALTing / extended) reader, which collects for itself after it
            // commits.
            let parked_reader = match &state.waiter {
                Some(Waiter {
                    role: Role::Reader { committed },
                    ..
                }) => Some(*committed),
                _ => None,
            };
            if let Some(committed) = parked_reader {
                // A committed reader needs something to actually pop; an
                // offering reader just needs the nudge.
                if !committed || state.buffer.input_would_succeed() {
                    let waiter = state.waiter.take().expect("parked reader checked above");
                    if committed {
                        let value = state.buffer.get();
                        state.handoff = Some(value);
                    }
                    waiter.process.finish_comm();
                    // The wake must happen before the state lock is
                    // released: otherwise this writer can be descheduled
                    // here, the ALTing reader disables successfully, and
                    // this late wake would spuriously re-queue it.
                    release_maybe(&waiter.process);
                }
            }
            Ok(())
        } else {
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

    fn poison_from_writer(&self) {
        // Writer poison must not discard buffered data; the reader drains it
        // first.
        self.poison(false);
    }

    fn is_poisoned(&self) -> bool { self.state.lock().poisoned }
}

impl<T: Send> ReadCore<T> for Buffered<T> {
    fn read(&self) -> Result<T, Poisoned> {
        let mut state = self.state.lock();
        if state.buffer.input_would_succeed() {
            // Data outranks poison: buffered values drain before the reader
            // sees a writer's poison.
            let value = state.buffer.get();
            drain_parked_writer(&mut state);
            Ok(value)
        } else if state.poisoned {
            Err(Poisoned)
        } else {
            let current = worker::current_process();
            current.begin_comm_wait();
            state.waiter = Some(Waiter {
                process: Arc::clone(&current),
                role: Role::Reader { committed: true },
            });
            drop(state);
            worker::reschedule();
            if current.comm_finished() {
                let mut state = self.state.lock();
                Ok(state
                    .handoff
                    .take()
                    .expect("a completed buffered read has a handoff value"))
            } else {
                Err(Poisoned)
            }
        }
    }

    fn begin_ext(&self) -> Result<T, Poisoned> {
        let mut state = self.state.lock();
        if state.buffer.input_would_succeed() {
            Ok(state.buffer.begin_ext_get())
        } else if state.poisoned {
            Err(Poisoned)
        } else {
            let current = worker::current_process();
            current.begin_comm_wait();
            state.waiter = Some(Waiter {
                process: Arc::clone(&current),
                role: Role::Reader { committed: false },
            });
            drop(state);
            worker::reschedule();
            if !current.comm_finished() {
                return Err(Poisoned);
            }
            let mut state = self.state.lock();
            if state.buffer.input_would_succeed() {
                Ok(state.buffer.begin_ext_get())
            } else {
                // Poison cleared the buffer between the writer's wake-up and
                // this collection.
                Err(Poisoned)
            }
        }
    }

    fn end_ext(&self) {
        let mut state = self.state.lock();
        state.buffer.end_ext_get();
        // The pop may have made room for a writer parked on a full buffer.
        drain_parked_writer(&mut state);
    }

    fn poison_from_reader(&self) {
        // Reader poison is seen immediately by writers; pending data is
        // dropped.
        self.poison(true);
    }

    fn pending(&self) -> bool {
        let state = self.state.lock();
        state.buffer.input_would_succeed() || state.poisoned
    }

    fn is_poisoned(&self) -> bool { self.state.lock().poisoned }
}

impl<T: Send> AltOffer for Buffered<T> {
    fn enable(&self, alter: &Arc<ProcessCell>) -> bool {
        let mut state = self.state.lock();
        if state.buffer.input_would_succeed() || state.poisoned {
            true
        } else {
            state.waiter = Some(Waiter {
                process: Arc::clone(alter),
                role: Role::Reader { committed: false },
            });
            false
        }
    }

    fn disable(&self, alter: &Arc<ProcessCell>) -> bool {
        let mut state = self.state.lock();
        let ours = matches!(
            &state.waiter,
            Some(waiter) if Arc::ptr_eq(&waiter.process, alter)
        );
        if !ours || state.buffer.input_would_succeed() || state.poisoned {
            true
        } else {
            state.waiter = None;
            false
        }
    }
}

impl<T: Send + 'static> AltReadCore<T> for Buffered<T> {
    fn as_offer(self: Arc<Self>) -> Arc<dyn AltOffer> { self }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{channel::buffers::FifoBuffer,
                kernel::{context::ThreadContext, process::ProcessId, worker::Worker}};

    fn channel(capacity: usize) -> Buffered<i32> {
        Buffered::new(Box::new(FifoBuffer::new(capacity)))
    }

    fn cell(id: u64) -> Arc<ProcessCell> {
        Arc::new(ProcessCell::new(
            ProcessId(id),
            Worker::for_tests(),
            Box::new(ThreadContext::new()),
        ))
    }

    /// The non-parking fast paths: writes fill the buffer, reads drain it in
    /// order, no scheduler involved.
    #[test]
    fn writes_and_reads_flow_through_the_buffer() {
        let channel = channel(2);
        channel.write(1).unwrap();
        channel.write(2).unwrap();
        assert!(channel.pending());
        assert_eq!(channel.read(), Ok(1));
        assert_eq!(channel.read(), Ok(2));
        assert!(!channel.pending());
    }

    /// Writer poison leaves buffered data readable; the reader only sees the
    /// poison once the buffer is dry.
    #[test]
    fn writer_poison_waits_for_the_drain() {
        let channel = channel(4);
        channel.write(1).unwrap();
        channel.poison_from_writer();

        assert!(channel.write(2).is_err());
        assert_eq!(channel.read(), Ok(1));
        assert_eq!(channel.read(), Err(Poisoned));
    }

    /// Reader poison clears the buffer: nothing drains, everyone errors.
    #[test]
    fn reader_poison_clears_immediately() {
        let channel = channel(4);
        channel.write(1).unwrap();
        channel.poison_from_reader();

        assert_eq!(channel.read(), Err(Poisoned));
        assert!(channel.write(2).is_err());
    }

    #[test]
    fn guard_readiness_tracks_the_buffer() {
        let channel = channel(2);
        let alter = cell(1);

        assert!(!channel.enable(&alter), "empty buffer is not ready");
        assert!(!channel.disable(&alter));

        channel.write(5).unwrap();
        assert!(channel.enable(&alter), "data makes the guard ready");
        assert!(channel.disable(&alter));
    }

    #[test]
    fn extended_get_holds_the_slot_until_the_end_phase() {
        let channel = channel(2);
        channel.write(7).unwrap();
        channel.write(8).unwrap();

        assert_eq!(channel.begin_ext(), Ok(7));
        // The slot is still occupied: a third write would not fit.
        assert!(!channel.state.lock().buffer.output_would_succeed(&9));
        channel.end_ext();
        assert!(channel.state.lock().buffer.output_would_succeed(&9));
        assert_eq!(channel.read(), Ok(8));
    }
}
