//! Update Scheduler - Deferred flush queue.
//!
//! The runtime is single-threaded and cooperative. Mutations never render
//! synchronously: a component that receives its first change record since
//! its last flush enqueues one flush with [`next_tick`], and the host drains
//! the queue with [`flush_pending`] (once per event-loop turn, the way a
//! microtask queue drains after a script task).
//!
//! Callbacks queued while draining run in a following round of the same
//! drain, so a parent's flush completes before the flushes it triggers in
//! its children start.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use spark_signals::{signal, Signal};

use crate::config::config;

type Task = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
    static FLUSH_EPOCH: RefCell<Signal<u64>> = RefCell::new(signal(0));
}

/// Run `task` on the next drain.
pub fn next_tick(task: impl FnOnce() + 'static) {
    QUEUE.with(|q| q.borrow_mut().push_back(Box::new(task)));
}

/// Whether any task is waiting.
pub fn has_pending() -> bool {
    QUEUE.with(|q| !q.borrow().is_empty())
}

/// Number of waiting tasks.
pub fn pending_count() -> usize {
    QUEUE.with(|q| q.borrow().len())
}

/// Clears the draining flag even when a task unwinds.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        DRAINING.with(|d| d.set(false));
    }
}

/// Drain the queue, including tasks queued while draining.
///
/// Returns the number of tasks run. Nested calls from inside a task return
/// 0 immediately. Stops after `config().max_flush_rounds` rounds, leaving
/// the rest queued.
///
/// Tasks are taken one at a time, so if a task panics the ones behind it
/// stay queued for the next drain.
pub fn flush_pending() -> usize {
    if DRAINING.with(|d| d.replace(true)) {
        return 0;
    }
    let guard = DrainGuard;

    let max_rounds = config().max_flush_rounds;
    let mut ran = 0;
    let mut rounds = 0;

    loop {
        let round = pending_count();
        if round == 0 {
            break;
        }
        for _ in 0..round {
            let Some(task) = QUEUE.with(|q| q.borrow_mut().pop_front()) else {
                break;
            };
            task();
            ran += 1;
        }

        rounds += 1;
        if rounds >= max_rounds {
            if has_pending() {
                tracing::warn!(rounds, pending = pending_count(), "flush round limit reached");
            }
            break;
        }
    }

    drop(guard);

    if ran > 0 {
        tracing::debug!(tasks = ran, rounds, "flushed");
        FLUSH_EPOCH.with(|e| {
            let epoch = e.borrow();
            epoch.set(epoch.get() + 1);
        });
    }
    ran
}

/// Number of drains that ran at least one task.
pub fn flush_epoch() -> u64 {
    FLUSH_EPOCH.with(|e| e.borrow().get())
}

/// Flush epoch signal for reactive tracking.
pub fn flush_epoch_signal() -> Signal<u64> {
    FLUSH_EPOCH.with(|e| e.borrow().clone())
}

/// Drop queued tasks (for testing).
pub fn reset_scheduler() {
    QUEUE.with(|q| q.borrow_mut().clear());
    DRAINING.with(|d| d.set(false));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_tasks_are_deferred() {
        reset_scheduler();

        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        next_tick(move || count_clone.set(count_clone.get() + 1));

        assert_eq!(count.get(), 0);
        assert!(has_pending());

        assert_eq!(flush_pending(), 1);
        assert_eq!(count.get(), 1);
        assert!(!has_pending());
    }

    #[test]
    fn test_nested_tasks_run_in_later_round() {
        reset_scheduler();

        let log = Rc::new(RefCell::new(Vec::new()));
        let log_outer = log.clone();
        next_tick(move || {
            log_outer.borrow_mut().push("parent");
            let log_inner = log_outer.clone();
            next_tick(move || log_inner.borrow_mut().push("child"));
            log_outer.borrow_mut().push("parent done");
        });

        assert_eq!(flush_pending(), 2);
        assert_eq!(*log.borrow(), vec!["parent", "parent done", "child"]);
    }

    #[test]
    fn test_epoch_advances_only_when_work_ran() {
        reset_scheduler();

        let before = flush_epoch();
        flush_pending();
        assert_eq!(flush_epoch(), before);

        next_tick(|| {});
        flush_pending();
        assert_eq!(flush_epoch(), before + 1);
    }

    #[test]
    fn test_nested_flush_is_noop() {
        reset_scheduler();

        let nested = Rc::new(Cell::new(usize::MAX));
        let nested_clone = nested.clone();
        next_tick(move || nested_clone.set(flush_pending()));

        flush_pending();
        assert_eq!(nested.get(), 0);
    }

    #[test]
    fn test_panicking_task_does_not_wedge_the_queue() {
        reset_scheduler();

        let log = Rc::new(RefCell::new(Vec::new()));
        let sibling_log = log.clone();
        next_tick(|| panic!("task failed"));
        next_tick(move || sibling_log.borrow_mut().push("sibling"));

        let outcome = std::panic::catch_unwind(flush_pending);
        assert!(outcome.is_err());
        assert!(log.borrow().is_empty());
        assert_eq!(pending_count(), 1);

        let later_log = log.clone();
        next_tick(move || later_log.borrow_mut().push("later"));
        assert_eq!(flush_pending(), 2);
        assert_eq!(*log.borrow(), vec!["sibling", "later"]);
    }
}
