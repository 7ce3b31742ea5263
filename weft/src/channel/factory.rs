// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Channel constructors: pick a sharing mode (and, for the buffered
//! flavours, a buffering policy) and get the pair of ends back.
//!
//! The sharing mode names say who contends for each role:
//!
//! | Constructor    | Writers | Readers | ALT on reader |
//! |----------------|---------|---------|---------------|
//! | [`one_to_one`] | one     | one     | yes           |
//! | [`any_to_one`] | many    | one     | yes           |
//! | [`one_to_any`] | one     | many    | no            |
//! | [`any_to_any`] | many    | many    | no            |
//!
//! None of the `*_to_any` flavours broadcast: every value is delivered to
//! exactly one reader.

use super::{WriteCore,
            buffered::Buffered,
            buffers::ChannelBuffer,
            ends::{AltReceiver, Sender},
            holes::{BlackHole, WhiteHole},
            rendezvous::Rendezvous,
            shared::{SharedReceiver, SharedSender}};
use crate::sync::fifo_mutex::FifoMutex;
use std::sync::Arc;

/// An unbuffered channel for one writer and one reader.
#[must_use]
pub fn one_to_one<T: Send + 'static>() -> (Sender<T>, AltReceiver<T>) {
    let core = Arc::new(Rendezvous::new());
    let write_core: Arc<dyn WriteCore<T>> = Arc::clone(&core) as Arc<dyn WriteCore<T>>;
    (
        Sender::new(write_core, true),
        AltReceiver::new(core, true),
    )
}

/// An unbuffered channel for many writers (queueing FIFO) and one reader.
#[must_use]
pub fn any_to_one<T: Send + 'static>() -> (SharedSender<T>, AltReceiver<T>) {
    let core = Arc::new(Rendezvous::new());
    let write_core: Arc<dyn WriteCore<T>> = Arc::clone(&core) as Arc<dyn WriteCore<T>>;
    let writer_lock = Arc::new(FifoMutex::new());
    (
        SharedSender::new(write_core, writer_lock, true),
        AltReceiver::new(core, true),
    )
}

/// An unbuffered channel for one writer and many readers (queueing FIFO).
#[must_use]
pub fn one_to_any<T: Send + 'static>() -> (Sender<T>, SharedReceiver<T>) {
    let core = Arc::new(Rendezvous::new());
    let write_core: Arc<dyn WriteCore<T>> = Arc::clone(&core) as Arc<dyn WriteCore<T>>;
    let reader_lock = Arc::new(FifoMutex::new());
    (
        Sender::new(write_core, true),
        SharedReceiver::new(core, reader_lock, true),
    )
}

/// An unbuffered channel for many writers and many readers (each side
/// queueing FIFO). While an extended input is in progress no other pairing
/// takes place, even if a reader and writer are both ready.
#[must_use]
pub fn any_to_any<T: Send + 'static>() -> (SharedSender<T>, SharedReceiver<T>) {
    let core = Arc::new(Rendezvous::new());
    let write_core: Arc<dyn WriteCore<T>> = Arc::clone(&core) as Arc<dyn WriteCore<T>>;
    let writer_lock = Arc::new(FifoMutex::new());
    let reader_lock = Arc::new(FifoMutex::new());
    (
        SharedSender::new(write_core, writer_lock, true),
        SharedReceiver::new(core, reader_lock, true),
    )
}

/// A buffered channel for one writer and one reader, with the given
/// buffering policy.
#[must_use]
pub fn buffered_one_to_one<T: Send + 'static>(
    buffer: Box<dyn ChannelBuffer<T>>,
) -> (Sender<T>, AltReceiver<T>) {
    let core = Arc::new(Buffered::new(buffer));
    let write_core: Arc<dyn WriteCore<T>> = Arc::clone(&core) as Arc<dyn WriteCore<T>>;
    (
        Sender::new(write_core, true),
        AltReceiver::new(core, true),
    )
}

/// A buffered channel for many writers and one reader.
#[must_use]
pub fn buffered_any_to_one<T: Send + 'static>(
    buffer: Box<dyn ChannelBuffer<T>>,
) -> (SharedSender<T>, AltReceiver<T>) {
    let core = Arc::new(Buffered::new(buffer));
    let write_core: Arc<dyn WriteCore<T>> = Arc::clone(&core) as Arc<dyn WriteCore<T>>;
    let writer_lock = Arc::new(FifoMutex::new());
    (
        SharedSender::new(write_core, writer_lock, true),
        AltReceiver::new(core, true),
    )
}

/// A buffered channel for one writer and many readers.
#[must_use]
pub fn buffered_one_to_any<T: Send + 'static>(
    buffer: Box<dyn ChannelBuffer<T>>,
) -> (Sender<T>, SharedReceiver<T>) {
    let core = Arc::new(Buffered::new(buffer));
    let write_core: Arc<dyn WriteCore<T>> = Arc::clone(&core) as Arc<dyn WriteCore<T>>;
    let reader_lock = Arc::new(FifoMutex::new());
    (
        Sender::new(write_core, true),
        SharedReceiver::new(core, reader_lock, true),
    )
}

/// A buffered channel for many writers and many readers.
#[must_use]
pub fn buffered_any_to_any<T: Send + 'static>(
    buffer: Box<dyn ChannelBuffer<T>>,
) -> (SharedSender<T>, SharedReceiver<T>) {
    let core = Arc::new(Buffered::new(buffer));
    let write_core: Arc<dyn WriteCore<T>> = Arc::clone(&core) as Arc<dyn WriteCore<T>>;
    let writer_lock = Arc::new(FifoMutex::new());
    let reader_lock = Arc::new(FifoMutex::new());
    (
        SharedSender::new(write_core, writer_lock, true),
        SharedReceiver::new(core, reader_lock, true),
    )
}

/// A channel that discards everything written to it. One writer; no reading
/// end exists.
#[must_use]
pub fn black_hole<T: Send + 'static>() -> Sender<T> {
    Sender::new(Arc::new(BlackHole::new()), true)
}

/// A channel that forever produces clones of `value`; its guard is always
/// ready. One reader; no writing end exists.
#[must_use]
pub fn white_hole<T: Clone + Send + 'static>(value: T) -> AltReceiver<T> {
    AltReceiver::new(Arc::new(WhiteHole::new(value)), true)
}
