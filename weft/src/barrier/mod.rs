// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The dynamically-enrolled, two-level barrier: cross-worker rendezvous for
//! any number of processes, with enrollment and resignation at any time.

// Attach sources.
pub mod core;
pub mod end;

// Re-export.
pub use end::{Barrier, BarrierEnd};
