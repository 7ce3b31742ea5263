// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Shared helpers for the integration suites.

use std::{panic::AssertUnwindSafe,
          sync::{Arc,
                 atomic::{AtomicBool, Ordering}}};

/// Runs bodies in parallel workers and fails the calling test if any of
/// them panicked. The runtime deliberately confines a process's panic to
/// that process, so a bare `run_parallel` would let a failed child
/// assertion pass silently; this wrapper records the failure before the
/// runtime swallows it.
#[allow(dead_code)]
pub fn run_checked(bodies: Vec<weft::ProcessBody>) {
    let failed = Arc::new(AtomicBool::new(false));
    let wrapped = bodies
        .into_iter()
        .map(|body| {
            let failed = Arc::clone(&failed);
            Box::new(move || {
                if std::panic::catch_unwind(AssertUnwindSafe(body)).is_err() {
                    failed.store(true, Ordering::SeqCst);
                }
            }) as weft::ProcessBody
        })
        .collect();
    weft::run_parallel(wrapped).unwrap();
    assert!(
        !failed.load(Ordering::SeqCst),
        "a process body failed an assertion (see panic output above)"
    );
}

/// Like [`run_checked`], for fibers of the current worker.
#[allow(dead_code)]
pub fn run_fibers_checked(bodies: Vec<weft::ProcessBody>) {
    let failed = Arc::new(AtomicBool::new(false));
    let wrapped = bodies
        .into_iter()
        .map(|body| {
            let failed = Arc::clone(&failed);
            Box::new(move || {
                if std::panic::catch_unwind(AssertUnwindSafe(body)).is_err() {
                    failed.store(true, Ordering::SeqCst);
                }
            }) as weft::ProcessBody
        })
        .collect();
    weft::run_parallel_fibers(wrapped).unwrap();
    assert!(
        !failed.load(Ordering::SeqCst),
        "a fiber body failed an assertion (see panic output above)"
    );
}

/// Extracts the text of a panic payload (`&str` or `String`).
#[allow(dead_code)]
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        String::from("<non-string panic payload>")
    }
}
