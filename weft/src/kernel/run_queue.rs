// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The per-worker FIFO run queue, including the counted-block protocol that
//! feeds global deadlock detection. See [`RunQueue`].

use super::{process::ProcessCell, runtime};
use std::{collections::VecDeque,
          sync::{Arc, Condvar, Mutex},
          time::Instant};

/// What kind of wait the worker's popper is currently in, if any.
///
/// At most one thread pops a given run queue at a time (the worker's
/// scheduler seat), so a single flag suffices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Waiting {
    /// Nobody is blocked on the queue.
    None,
    /// Blocked with a deadline; does not count toward deadlock detection.
    Timed,
    /// Blocked indefinitely; the global workers-with-work counter was
    /// decremented on entry and must be re-incremented by the signalling
    /// push.
    Counted,
}

#[derive(Debug)]
struct Inner {
    queue: VecDeque<Arc<ProcessCell>>,
    waiting: Waiting,
}

/// The outcome of [`RunQueue::pop`].
#[derive(Debug)]
pub(crate) enum Pop {
    /// The next ready process.
    Ready(Arc<ProcessCell>),
    /// The deadline elapsed with the queue still empty; the caller should
    /// expire timeouts and try again.
    TimedOut,
    /// This pop was about to block indefinitely and it was the last worker
    /// with any work in the whole program: global deadlock.
    Deadlock,
}

/// A FIFO queue of ready processes with cross-thread push and a blocking pop.
///
/// Pushes may come from any worker (cross-thread wake-ups); pops only ever
/// come from the owning worker's current scheduler seat. A pop with no
/// deadline decrements the process-global workers-with-work counter before
/// blocking and reports [`Pop::Deadlock`] if that transition hit zero; the
/// push that later signals a counted waiter re-increments the counter, which
/// keeps the invariant "counter > 0 while anything can run".
#[derive(Debug)]
pub(crate) struct RunQueue {
    inner: Mutex<Inner>,
    ready: Condvar,
}

impl RunQueue {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                waiting: Waiting::None,
            }),
            ready: Condvar::new(),
        }
    }

    /// Appends one process. Signals (and re-counts) a blocked popper.
    pub(crate) fn push(&self, process: Arc<ProcessCell>) {
        let mut inner = self.inner.lock().expect("run queue lock");
        self.signal_if_waiting(&mut inner);
        inner.queue.push_back(process);
    }

    /// Appends a chain of processes as a single operation.
    pub(crate) fn push_chain(&self, chain: impl IntoIterator<Item = Arc<ProcessCell>>) {
        let mut inner = self.inner.lock().expect("run queue lock");
        let mut first = true;
        for process in chain {
            if first {
                self.signal_if_waiting(&mut inner);
                first = false;
            }
            inner.queue.push_back(process);
        }
    }

    fn signal_if_waiting(&self, inner: &mut Inner) {
        if inner.queue.is_empty() {
            if inner.waiting == Waiting::Counted {
                runtime::workers_with_work().fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
            if inner.waiting != Waiting::None {
                inner.waiting = Waiting::None;
                self.ready.notify_one();
            }
        }
    }

    /// Pops the head, blocking until a process arrives, the deadline passes,
    /// or blocking would complete a global deadlock.
    pub(crate) fn pop(&self, deadline: Option<Instant>) -> Pop {
        let mut inner = self.inner.lock().expect("run queue lock");
        loop {
            if let Some(process) = inner.queue.pop_front() {
                return Pop::Ready(process);
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        inner.waiting = Waiting::None;
                        return Pop::TimedOut;
                    }
                    inner.waiting = Waiting::Timed;
                    let (guard, _timeout) = self
                        .ready
                        .wait_timeout(inner, deadline - now)
                        .expect("run queue lock");
                    inner = guard;
                }
                None => {
                    if inner.waiting != Waiting::Counted {
                        inner.waiting = Waiting::Counted;
                        let previous = runtime::workers_with_work()
                            .fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                        if previous == 1 {
                            // Everyone else is already blocked without a
                            // deadline: this block would never be woken.
                            inner.waiting = Waiting::None;
                            return Pop::Deadlock;
                        }
                    }
                    inner = self.ready.wait(inner).expect("run queue lock");
                }
            }
        }
    }

    /// Parks the calling thread forever. Used by the worker that trips
    /// deadlock detection but is not the initial worker: the program is
    /// already fatally wedged and this seat has nothing left to schedule.
    pub(crate) fn wedge(&self) -> ! {
        let mut inner = self.inner.lock().expect("run queue lock");
        loop {
            inner = self.ready.wait(inner).expect("run queue lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{context::ThreadContext, process::ProcessId, worker::Worker};
    use std::time::Duration;

    fn cell(id: u64) -> Arc<ProcessCell> {
        Arc::new(ProcessCell::new(
            ProcessId(id),
            Worker::for_tests(),
            Box::new(ThreadContext::new()),
        ))
    }

    #[test]
    fn pop_is_fifo() {
        let queue = RunQueue::new();
        queue.push(cell(1));
        queue.push(cell(2));
        queue.push_chain(vec![cell(3), cell(4)]);

        for expected in 1..=4 {
            match queue.pop(Some(Instant::now() + Duration::from_secs(1))) {
                Pop::Ready(p) => assert_eq!(p.id, ProcessId(expected)),
                other => panic!("expected a ready process, got {other:?}"),
            }
        }
    }

    #[test]
    fn timed_pop_returns_after_deadline() {
        let queue = RunQueue::new();
        let before = Instant::now();
        match queue.pop(Some(before + Duration::from_millis(20))) {
            Pop::TimedOut => {}
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert!(before.elapsed() >= Duration::from_millis(15));
    }
}
