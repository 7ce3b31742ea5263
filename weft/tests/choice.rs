// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! ALT behaviour: selection policies, timeout guards, skip, poison
//! readiness, guard replacement.

mod common;

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::time::{Duration, Instant};
use weft::{Alt, Guard, Poisoned, UnboundedFifoBuffer, sleep_for};

#[test]
#[serial]
fn pri_select_takes_the_ready_channel_over_a_pending_timeout() {
    let _runtime = weft::start_runtime();
    let (tx, rx) = weft::one_to_one::<i32>();

    common::run_checked(vec![
        Box::new(move || {
            tx.write(7).unwrap();
        }),
        Box::new(move || {
            // Let the writer park so the channel guard is ready on entry.
            sleep_for(Duration::from_millis(20));
            let started = Instant::now();
            let mut alt = Alt::new(vec![
                Guard::rel_timeout(Duration::from_millis(10)),
                rx.guard(),
            ]);
            assert_eq!(alt.pri_select(), 1);
            assert!(
                started.elapsed() < Duration::from_millis(10),
                "the channel guard must win without waiting out the timeout"
            );
            assert_eq!(rx.read(), Ok(7));
        }),
    ]);
}

#[test]
#[serial]
fn pri_select_falls_back_to_the_timeout() {
    let _runtime = weft::start_runtime();
    let (_tx, rx) = weft::one_to_one::<i32>();

    let started = Instant::now();
    let mut alt = Alt::new(vec![
        rx.guard(),
        Guard::rel_timeout(Duration::from_millis(10)),
    ]);
    assert_eq!(alt.pri_select(), 1);
    assert!(started.elapsed() >= Duration::from_millis(10));
}

/// Fair selection over two continually-ready guards alternates strictly, so
/// over `2n` selections each index is chosen exactly `n` times.
#[test]
#[serial]
fn fair_select_shares_evenly() {
    const ROUNDS: usize = 1000;

    let _runtime = weft::start_runtime();
    let (tx_a, rx_a) = weft::buffered_one_to_one::<u32>(Box::new(UnboundedFifoBuffer::new()));
    let (tx_b, rx_b) = weft::buffered_one_to_one::<u32>(Box::new(UnboundedFifoBuffer::new()));
    for n in 0..(ROUNDS as u32 / 2) {
        tx_a.write(n).unwrap();
        tx_b.write(n).unwrap();
    }

    let mut alt = Alt::new(vec![rx_a.guard(), rx_b.guard()]);
    let mut chosen = [0_usize; 2];
    for _ in 0..ROUNDS {
        let index = alt.fair_select();
        chosen[index] += 1;
        match index {
            0 => {
                let _ = rx_a.read().unwrap();
            }
            _ => {
                let _ = rx_b.read().unwrap();
            }
        }
    }

    assert_eq!(chosen, [ROUNDS / 2, ROUNDS / 2]);
}

/// Same-preference selection sticks with the winning guard while it stays
/// ready, then moves on.
#[test]
#[serial]
fn same_select_sticks_with_the_winner() {
    let _runtime = weft::start_runtime();
    let (tx_a, rx_a) = weft::buffered_one_to_one::<u32>(Box::new(UnboundedFifoBuffer::new()));
    let (tx_b, rx_b) = weft::buffered_one_to_one::<u32>(Box::new(UnboundedFifoBuffer::new()));
    for n in 0..3 {
        tx_a.write(n).unwrap();
    }
    for n in 0..2 {
        tx_b.write(n).unwrap();
    }

    let mut alt = Alt::new(vec![rx_a.guard(), rx_b.guard()]);
    for _ in 0..3 {
        assert_eq!(alt.same_select(), 0);
        let _ = rx_a.read().unwrap();
    }
    // Channel A is dry; the preference moves to B and stays there.
    for _ in 0..2 {
        assert_eq!(alt.same_select(), 1);
        let _ = rx_b.read().unwrap();
    }
}

#[test]
#[serial]
fn skip_guard_makes_the_choice_non_blocking() {
    let _runtime = weft::start_runtime();
    let (_tx, rx) = weft::one_to_one::<i32>();

    let mut alt = Alt::new(vec![rx.guard(), Guard::skip()]);
    assert_eq!(alt.pri_select(), 1, "nothing to read, skip fires");
}

#[test]
#[serial]
fn a_poisoned_channel_guard_is_always_ready() {
    let _runtime = weft::start_runtime();
    let (tx, rx) = weft::one_to_one::<i32>();
    tx.poison();

    let mut alt = Alt::new(vec![
        rx.guard(),
        Guard::rel_timeout(Duration::from_secs(5)),
    ]);
    assert_eq!(alt.pri_select(), 0);
    assert_eq!(rx.read(), Err(Poisoned), "the read after selection reports it");
}

#[test]
#[serial]
fn a_late_writer_wakes_a_parked_choice() {
    let _runtime = weft::start_runtime();
    let (tx, rx) = weft::one_to_one::<i32>();

    common::run_checked(vec![
        Box::new(move || {
            sleep_for(Duration::from_millis(20));
            tx.write(9).unwrap();
        }),
        Box::new(move || {
            let started = Instant::now();
            let mut alt = Alt::new(vec![
                rx.guard(),
                Guard::rel_timeout(Duration::from_millis(500)),
            ]);
            assert_eq!(alt.pri_select(), 0);
            assert!(started.elapsed() < Duration::from_millis(400));
            assert_eq!(rx.read(), Ok(9));
        }),
    ]);
}

#[test]
#[serial]
fn abs_timeout_guard_fires_at_the_deadline() {
    let _runtime = weft::start_runtime();
    let (_tx, rx) = weft::one_to_one::<i32>();

    let deadline = weft::now() + Duration::from_millis(15);
    let mut alt = Alt::new(vec![rx.guard(), Guard::abs_timeout(deadline)]);
    assert_eq!(alt.pri_select(), 1);
    assert!(weft::now() >= deadline);
}

#[test]
#[serial]
fn replace_guard_refreshes_a_timeout() {
    let _runtime = weft::start_runtime();
    let (_tx, rx) = weft::one_to_one::<i32>();

    let mut alt = Alt::new(vec![
        rx.guard(),
        Guard::rel_timeout(Duration::from_millis(10)),
    ]);
    assert_eq!(alt.pri_select(), 1);

    let old = alt.replace_guard(1, Guard::rel_timeout(Duration::from_millis(40)));
    drop(old);
    let started = Instant::now();
    assert_eq!(alt.pri_select(), 1);
    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[test]
#[serial]
fn a_white_hole_guard_is_permanently_ready() {
    let _runtime = weft::start_runtime();
    let source = weft::white_hole(3_u8);

    let mut alt = Alt::new(vec![
        Guard::rel_timeout(Duration::from_secs(5)),
        source.guard(),
    ]);
    assert_eq!(alt.pri_select(), 1);
    assert_eq!(source.read(), Ok(3));
}

/// Selecting repeatedly against a writer that keeps writing exercises the
/// enable/disable wake-up protocol from both sides.
#[test]
#[serial]
fn repeated_selects_against_a_streaming_writer() {
    const VALUES: i32 = 50;

    let _runtime = weft::start_runtime();
    let (tx, rx) = weft::one_to_one::<i32>();

    common::run_checked(vec![
        Box::new(move || {
            for n in 0..VALUES {
                tx.write(n).unwrap();
            }
        }),
        Box::new(move || {
            let mut alt = Alt::new(vec![
                rx.guard(),
                Guard::rel_timeout(Duration::from_secs(5)),
            ]);
            for expected in 0..VALUES {
                assert_eq!(alt.pri_select(), 0);
                assert_eq!(rx.read(), Ok(expected));
            }
        }),
    ]);
}
