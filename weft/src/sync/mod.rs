// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Low-level locking substrate: the spin lock guarding short critical
//! sections ([`spin_mutex`]) and the FIFO process mutex serialising shared
//! channel ends ([`fifo_mutex`]).

// Attach sources.
pub mod fifo_mutex;
pub mod spin_mutex;
