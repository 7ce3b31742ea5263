// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Barrier and bucket behaviour: whole-wave release, mid-sync enrollment,
//! resignation completing a wave, misuse panics.

mod common;

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::{panic::{AssertUnwindSafe, catch_unwind},
          sync::{Arc,
                 atomic::{AtomicU32, Ordering}},
          time::Duration};
use weft::{Barrier, Bucket, sleep_for};

/// N enrolled processes sync; all are released exactly when the last one
/// arrives, so every one of them observes the full count afterwards.
#[test]
#[serial]
fn sync_releases_everyone_together() {
    const MEMBERS: usize = 4;

    let _runtime = weft::start_runtime();
    let barrier = Barrier::new();
    let arrived = Arc::new(AtomicU32::new(0));

    let bodies: Vec<weft::ProcessBody> = (0..MEMBERS)
        .map(|index| {
            let mut end = barrier.enrolled_end();
            let arrived = Arc::clone(&arrived);
            Box::new(move || {
                end.enroll();
                // Stagger the arrivals.
                sleep_for(Duration::from_millis(5 * index as u64));
                arrived.fetch_add(1, Ordering::SeqCst);
                end.sync();
                assert_eq!(
                    arrived.load(Ordering::SeqCst),
                    MEMBERS as u32,
                    "released before the last member arrived"
                );
                end.resign();
            }) as weft::ProcessBody
        })
        .collect();

    common::run_checked(bodies);
}

/// Mid-sync enrollment: with two of three members already waiting, the
/// third enrolls a fourth before syncing - the waiters are released only
/// once both the third *and* the newcomer have synced.
#[test]
#[serial]
fn mid_sync_enroll_extends_the_wave() {
    let _runtime = weft::start_runtime();
    let barrier = Barrier::new();
    let released = Arc::new(AtomicU32::new(0));

    let mut waiter_bodies: Vec<weft::ProcessBody> = (0..2)
        .map(|_| {
            let mut end = barrier.enrolled_end();
            let released = Arc::clone(&released);
            Box::new(move || {
                end.enroll();
                end.sync();
                released.fetch_add(1, Ordering::SeqCst);
                end.resign();
            }) as weft::ProcessBody
        })
        .collect();

    let mut third_end = barrier.enrolled_end();
    let released_by_third = Arc::clone(&released);
    waiter_bodies.push(Box::new(move || {
        third_end.enroll();
        // Let the first two park on the wave.
        sleep_for(Duration::from_millis(30));

        let mut fourth_end = third_end.make_enrolled_copy();
        let released = Arc::clone(&released_by_third);
        weft::forking(|scope| {
            scope
                .fork(move || {
                    fourth_end.enroll();
                    sleep_for(Duration::from_millis(30));
                    assert_eq!(
                        released.load(Ordering::SeqCst),
                        0,
                        "the wave completed without the newcomer"
                    );
                    fourth_end.sync();
                    fourth_end.resign();
                })
                .unwrap();

            third_end.sync();
            released_by_third.fetch_add(1, Ordering::SeqCst);
            third_end.resign();
        });
    }));

    common::run_checked(waiter_bodies);
    assert_eq!(released.load(Ordering::SeqCst), 3);
}

/// A resignation by the last outstanding member completes the wave for the
/// parked ones.
#[test]
#[serial]
fn resign_completes_the_wave() {
    let _runtime = weft::start_runtime();
    let barrier = Barrier::new();

    let mut syncing_end = barrier.enrolled_end();
    let mut resigning_end = barrier.enrolled_end();

    common::run_checked(vec![
        Box::new(move || {
            syncing_end.enroll();
            syncing_end.sync();
            syncing_end.resign();
        }),
        Box::new(move || {
            resigning_end.enroll();
            sleep_for(Duration::from_millis(20));
            resigning_end.resign();
        }),
    ]);
}

#[test]
#[serial]
fn sole_member_syncs_without_parking() {
    let _runtime = weft::start_runtime();
    let barrier = Barrier::new();
    let mut end = barrier.end();
    end.enroll();
    end.enroll(); // idempotent: still a single membership
    end.sync();
    end.resign();
    end.resign(); // idempotent: already out

    // Re-enrollment after resigning works.
    end.enroll();
    end.sync();
    end.resign();
}

#[test]
#[serial]
fn sync_without_enrollment_panics() {
    let _runtime = weft::start_runtime();
    let barrier = Barrier::new();
    let mut end = barrier.end();

    let outcome = catch_unwind(AssertUnwindSafe(|| end.sync()));
    let payload = outcome.expect_err("sync on a non-enrolled end must panic");
    let message = common::panic_message(payload.as_ref());
    assert!(message.contains("barrier misuse"), "got: {message}");
}

#[test]
#[serial]
fn dropping_an_enrolled_end_panics() {
    let _runtime = weft::start_runtime();
    let barrier = Barrier::new();
    let mut end = barrier.end();
    end.enroll();

    let outcome = catch_unwind(AssertUnwindSafe(move || drop(end)));
    let payload = outcome.expect_err("dropping an enrolled end must panic");
    let message = common::panic_message(payload.as_ref());
    assert!(message.contains("barrier misuse"), "got: {message}");
    // The drop resigned before panicking, so the barrier itself is clean.
}

#[test]
#[serial]
fn dropping_a_barrier_with_live_enrollment_panics() {
    let _runtime = weft::start_runtime();
    let barrier = Barrier::new();
    let mut end = barrier.end();
    end.enroll();

    let outcome = catch_unwind(AssertUnwindSafe(move || drop(barrier)));
    let payload = outcome.expect_err("dropping a barrier with enrollments must panic");
    let message = common::panic_message(payload.as_ref());
    assert!(message.contains("barrier misuse"), "got: {message}");

    // Tidy up the end against the still-live core.
    end.resign();
}

#[test]
#[serial]
fn bucket_holds_until_flushed() {
    const FALLERS: u32 = 3;

    let _runtime = weft::start_runtime();
    let bucket = Arc::new(Bucket::new());

    let mut bodies: Vec<weft::ProcessBody> = (0..FALLERS)
        .map(|_| {
            let bucket = Arc::clone(&bucket);
            Box::new(move || bucket.fall_into()) as weft::ProcessBody
        })
        .collect();

    let flusher = Arc::clone(&bucket);
    bodies.push(Box::new(move || {
        while flusher.holding() < FALLERS {
            weft::yield_now();
        }
        assert_eq!(flusher.flush(), FALLERS);
        assert_eq!(flusher.holding(), 0);
        assert_eq!(flusher.flush(), 0, "an empty bucket flushes to zero");
    }));

    common::run_checked(bodies);
}
