//! Deferred tasks driven by the host clock.
//!
//! Tasks are ordered by `(due time, sequence)`, so two tasks due at the
//! same instant run in the order they were scheduled. Nothing runs until
//! the host calls [`DeferredQueue::run_due`] with its current time.

use std::collections::BTreeMap;

/// Host time in milliseconds, as an ordered key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Due(u64);

impl Due {
    fn from_ms(ms: f64) -> Self {
        Due(if ms.is_finite() && ms > 0.0 { ms.round() as u64 } else { 0 })
    }
}

#[derive(Debug)]
pub struct DeferredQueue<T> {
    tasks: BTreeMap<(Due, u64), T>,
    next_seq: u64,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            tasks: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to run `delay_ms` after `now_ms`.
    pub fn schedule(&mut self, now_ms: f64, delay_ms: f64, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.insert((Due::from_ms(now_ms + delay_ms), seq), task);
    }

    /// Remove and return every task due at or before `now_ms`, in order.
    pub fn run_due(&mut self, now_ms: f64) -> Vec<T> {
        let now = Due::from_ms(now_ms);
        let later = self.tasks.split_off(&(Due(now.0.saturating_add(1)), 0));
        std::mem::replace(&mut self.tasks, later).into_values().collect()
    }

    /// Drop tasks matching `pred`.
    pub fn cancel(&mut self, pred: impl Fn(&T) -> bool) {
        self.tasks.retain(|_, task| !pred(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_in_due_then_schedule_order() {
        let mut queue = DeferredQueue::new();
        queue.schedule(0.0, 100.0, "load");
        queue.schedule(0.0, 10.0, "notify-a");
        queue.schedule(0.0, 10.0, "notify-b");

        assert!(queue.run_due(9.0).is_empty());
        assert_eq!(queue.run_due(10.0), vec!["notify-a", "notify-b"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.run_due(250.0), vec!["load"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_drops_matching_tasks() {
        let mut queue = DeferredQueue::new();
        queue.schedule(0.0, 5.0, 1);
        queue.schedule(0.0, 5.0, 2);
        queue.cancel(|t| *t == 1);
        assert_eq!(queue.run_due(5.0), vec![2]);
    }
}
