// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The channel engine: synchronous rendezvous and buffered cores, buffering
//! policies, the four sharing modes, channel ends, and the black/white hole
//! test channels.
//!
//! A channel core implements the protocol for exactly one reader and one
//! writer at a time; the shared (`any_to_*` / `*_to_any`) flavours compose a
//! FIFO process mutex per contended role around the same core, which is what
//! gives shared ends their no-starvation guarantee:
//!
//! ```text
//!  SharedSender ──┐                           ┌── SharedReceiver
//!  SharedSender ──┤ writer      ┌──────────┐  │ reader
//!  SharedSender ──┤ FifoMutex ──│   core   │──┤ FifoMutex
//!                 │ (in turn)   └──────────┘  │ (in turn)
//!                 └─ held for a whole         └─ held across extended
//!                    communication               inputs too
//! ```
//!
//! The rendezvous protocol itself lives in [`rendezvous`]; the interesting
//! asymmetry is that readers may be *offering* rather than committed (an
//! ALT enable, or the opening phase of an extended input), in which case an
//! arriving writer parks itself in the reader's place and is collected when
//! the reader commits. [`buffered`] relaxes the same engine through a
//! [`ChannelBuffer`] policy; every value still travels through the buffer,
//! so the policy observes the full traffic.
//!
//! Poison is a monotone latch: either end sets it, it never clears, and
//! every subsequent operation fails with [`Poisoned`] - except reads of
//! data already buffered, which drain first so a writer can write its last
//! values and poison immediately without losing them.

// Attach sources.
pub mod buffered;
pub mod buffers;
pub mod ends;
pub mod factory;
pub mod holes;
pub mod rendezvous;
pub mod shared;

// Re-export.
pub use buffers::{BufferFactory, ChannelBuffer, FifoBuffer, OverwritingBuffer,
                  UnboundedFifoBuffer};
pub use ends::{AltReceiver, Sender};
pub use factory::{any_to_any, any_to_one, black_hole, buffered_any_to_any,
                  buffered_any_to_one, buffered_one_to_any, buffered_one_to_one, one_to_any,
                  one_to_one, white_hole};
pub use shared::{SharedReceiver, SharedSender};

use crate::{alt::guard::AltOffer, errors::Poisoned};
use std::sync::Arc;

/// The writing half of a channel core.
pub(crate) trait WriteCore<T>: Send + Sync {
    /// Transfers `value` to the channel, parking until a reader (or buffer
    /// space) accepts it. On a poisoned channel the value is dropped.
    fn write(&self, value: T) -> Result<(), Poisoned>;

    /// Latches the poison flag from the writing side.
    fn poison_from_writer(&self);

    fn is_poisoned(&self) -> bool;
}

/// The reading half of a channel core.
pub(crate) trait ReadCore<T>: Send + Sync {
    /// Receives the next value, parking until a writer (or buffered data)
    /// supplies one.
    fn read(&self) -> Result<T, Poisoned>;

    /// First phase of an extended input: obtains the value while keeping the
    /// matched writer parked.
    fn begin_ext(&self) -> Result<T, Poisoned>;

    /// Second phase of an extended input: releases the writer. Never fails;
    /// reader-side poison raised during the extension is swallowed here.
    fn end_ext(&self);

    /// Latches the poison flag from the reading side.
    fn poison_from_reader(&self);

    /// Whether a read would complete without parking (data or a committed
    /// writer present, or poison).
    fn pending(&self) -> bool;

    fn is_poisoned(&self) -> bool;
}

/// A read core whose channel additionally supports ALT offers on the reading
/// side (the 1:1 and N:1 sharing modes).
pub(crate) trait AltReadCore<T>: ReadCore<T> + AltOffer {
    /// This core as a bare offer, for embedding in a [`Guard`].
    ///
    /// [`Guard`]: crate::Guard
    fn as_offer(self: Arc<Self>) -> Arc<dyn AltOffer>;
}
