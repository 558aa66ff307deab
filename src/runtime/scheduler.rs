//! Timer scheduling for debounced work.
//!
//! The engine never sleeps or spawns. Delayed work is handed to a
//! [`Scheduler`], and the host event loop decides when time passes. The
//! bundled [`TimerQueue`] keeps its own virtual clock that the host (or a
//! test) moves forward with [`TimerQueue::advance`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Work scheduled to run once after a delay.
pub type Task = Box<dyn FnOnce() + Send>;

/// Identifies a scheduled task so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// `schedule(delay, fn)` / `cancel(handle)` pair injected into stores.
pub trait Scheduler: Send + Sync {
    /// Run `task` once, `delay` from now.
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;

    /// Drop a pending task. Returns false if it already ran or never existed.
    fn cancel(&self, handle: TimerHandle) -> bool;
}

#[derive(Default)]
struct QueueState {
    now: Duration,
    next_id: u64,
    // (due, id) keeps same-deadline tasks in scheduling order
    pending: BTreeMap<(Duration, u64), Task>,
    due_by_id: HashMap<u64, Duration>,
}

/// Single-threaded timer queue driven by an external clock.
///
/// Cloning shares the same queue.
#[derive(Clone, Default)]
pub struct TimerQueue {
    state: Arc<Mutex<QueueState>>,
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TimerQueue")
            .field("now", &state.now)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since the queue was created.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Move time forward by `by`, running every task that falls due, in
    /// deadline order. Tasks scheduled by running tasks are honoured if they
    /// fall inside the window. Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut ran = 0;

        loop {
            // The lock is released before running a task so it can reschedule.
            let task = {
                let mut state = self.state.lock();
                let next_key = state.pending.keys().next().copied();
                match next_key {
                    Some(key) if key.0 <= target => {
                        state.now = key.0;
                        state.due_by_id.remove(&key.1);
                        state.pending.remove(&key)
                    }
                    _ => {
                        state.now = target;
                        None
                    }
                }
            };

            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }

        ran
    }

    /// Run everything pending regardless of deadline.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let latest = {
                let state = self.state.lock();
                state.pending.keys().next_back().map(|(due, _)| *due)
            };
            match latest {
                Some(due) => {
                    let now = self.now();
                    ran += self.advance(due.saturating_sub(now));
                }
                None => break,
            }
        }
        ran
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay;
        state.pending.insert((due, id), task);
        state.due_by_id.insert(id, due);
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let mut state = self.state.lock();
        match state.due_by_id.remove(&handle.0) {
            Some(due) => state.pending.remove(&(due, handle.0)).is_some(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_task(counter: &Arc<AtomicUsize>) -> Task {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_task_runs_only_after_delay() {
        let queue = TimerQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));
        queue.schedule(Duration::from_millis(300), counter_task(&counter));

        assert_eq!(queue.advance(Duration::from_millis(299)), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert_eq!(queue.advance(Duration::from_millis(1)), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_cancel() {
        let queue = TimerQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = queue.schedule(Duration::from_millis(10), counter_task(&counter));

        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));
        queue.advance(Duration::from_secs(1));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_tasks_run_in_deadline_order() {
        let queue = TimerQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for (delay, tag) in [(30, "c"), (10, "a"), (20, "b")] {
            let order = Arc::clone(&order);
            queue.schedule(
                Duration::from_millis(delay),
                Box::new(move || order.lock().push(tag)),
            );
        }
        queue.run_all();
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
        assert_eq!(queue.now(), Duration::from_millis(30));
    }

    #[test]
    fn test_task_may_reschedule() {
        let queue = TimerQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let inner_queue = queue.clone();
        let inner_counter = Arc::clone(&counter);
        queue.schedule(
            Duration::from_millis(5),
            Box::new(move || {
                inner_queue.schedule(Duration::from_millis(5), counter_task(&inner_counter));
            }),
        );

        assert_eq!(queue.advance(Duration::from_millis(10)), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
