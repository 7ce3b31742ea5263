// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Starting processes and composing them: `run` and friends block until the
//! composition finishes; [`forking`] starts children and joins them at the
//! end of a scope.

// Attach sources.
pub mod compose;
pub mod forking;
pub mod spawn;

// Re-export.
pub use compose::{ProcessBody, run, run_parallel, run_parallel_fibers, run_sequential,
                  run_sequential_fibers};
pub use forking::{ForkScope, forking};
