//! Single-shot timer facility.
//!
//! Components never hold callbacks. They ask a [`Scheduler`] to deliver an
//! event value after a delay and keep the returned [`TimerHandle`] so the
//! pending delivery can be cancelled. The host loop pops due events from a
//! [`TimerQueue`] and routes them back to their owner on the UI thread.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Identifies one scheduled delivery. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Schedule and cancel single-shot delayed events.
pub trait Scheduler<T> {
    fn schedule(&mut self, delay: Duration, event: T) -> TimerHandle;

    /// Cancelling a handle that already fired (or never existed) is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

/// Deadline-ordered queue of pending events over a millisecond clock.
///
/// The clock only moves when the host calls [`TimerQueue::pop_due`], which
/// makes the queue usable both with wall-clock time (the shell feeds it
/// elapsed milliseconds) and with a virtual clock in tests.
#[derive(Debug)]
pub struct TimerQueue<E> {
    now_ms: u64,
    next_id: u64,
    // (deadline, id) keeps equal deadlines in scheduling order.
    pending: BTreeMap<(u64, u64), E>,
    deadlines: HashMap<u64, u64>,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            pending: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Current clock value in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn schedule<T: Into<E>>(&mut self, delay: Duration, event: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;

        let deadline = self.now_ms.saturating_add(delay.as_millis() as u64);
        self.pending.insert((deadline, id), event.into());
        self.deadlines.insert(id, deadline);

        TimerHandle(id)
    }

    /// Returns `true` when a pending event was actually removed.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.deadlines.remove(&handle.0) {
            Some(deadline) => self.pending.remove(&(deadline, handle.0)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Deadline of the earliest pending event.
    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pops the earliest event due at or before `until_ms`.
    ///
    /// The clock jumps to the popped event's deadline so that anything the
    /// event handler schedules is measured from the moment it fired. When
    /// nothing is due the clock advances to `until_ms` and `None` is returned.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerHandle, E)> {
        let key = match self.pending.keys().next() {
            Some(&(deadline, id)) if deadline <= until_ms => (deadline, id),
            _ => {
                self.now_ms = self.now_ms.max(until_ms);
                return None;
            }
        };

        let event = self.pending.remove(&key)?;
        self.deadlines.remove(&key.1);
        self.now_ms = self.now_ms.max(key.0);
        Some((TimerHandle(key.1), event))
    }
}

impl<E, T: Into<E>> Scheduler<T> for TimerQueue<E> {
    fn schedule(&mut self, delay: Duration, event: T) -> TimerHandle {
        TimerQueue::schedule(self, delay, event)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        TimerQueue::cancel(self, handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn pops_in_deadline_order() {
        let mut queue: TimerQueue<&str> = TimerQueue::new();
        queue.schedule(ms(100), "late");
        queue.schedule(ms(50), "early");

        assert_eq!(queue.pop_due(1_000).map(|(_, e)| e), Some("early"));
        assert_eq!(queue.now_ms(), 50);
        assert_eq!(queue.pop_due(1_000).map(|(_, e)| e), Some("late"));
        assert_eq!(queue.now_ms(), 100);
        assert!(queue.pop_due(1_000).is_none());
        assert_eq!(queue.now_ms(), 1_000);
    }

    #[test]
    fn equal_deadlines_fire_in_scheduling_order() {
        let mut queue: TimerQueue<u32> = TimerQueue::new();
        queue.schedule(ms(10), 1u32);
        queue.schedule(ms(10), 2u32);
        queue.schedule(ms(10), 3u32);

        let order: Vec<u32> = std::iter::from_fn(|| queue.pop_due(10).map(|(_, e)| e)).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn nothing_due_before_deadline() {
        let mut queue: TimerQueue<&str> = TimerQueue::new();
        queue.schedule(ms(100), "tick");
        assert!(queue.pop_due(99).is_none());
        assert_eq!(queue.now_ms(), 99);
        assert!(queue.pop_due(100).is_some());
    }

    #[test]
    fn delays_are_relative_to_current_clock() {
        let mut queue: TimerQueue<&str> = TimerQueue::new();
        queue.pop_due(500);
        queue.schedule(ms(100), "tick");
        assert_eq!(queue.next_deadline(), Some(600));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut queue: TimerQueue<&str> = TimerQueue::new();
        let handle = queue.schedule(ms(10), "tick");
        assert!(queue.is_pending(handle));
        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));
        assert!(!queue.is_pending(handle));
        assert_eq!(queue.pending_count(), 0);
        assert!(queue.pop_due(1_000).is_none());
    }

    #[test]
    fn cancelling_a_fired_handle_is_a_no_op() {
        let mut queue: TimerQueue<&str> = TimerQueue::new();
        let handle = queue.schedule(ms(10), "tick");
        let other = queue.schedule(ms(20), "other");
        assert!(queue.pop_due(10).is_some());
        assert!(!queue.cancel(handle));
        assert!(queue.is_pending(other));
    }

    #[test]
    fn sub_events_convert_into_host_events() {
        #[derive(Debug, PartialEq)]
        enum Host {
            Child(u8),
        }
        impl From<u8> for Host {
            fn from(v: u8) -> Self {
                Host::Child(v)
            }
        }

        fn arm<S: Scheduler<u8>>(s: &mut S) -> TimerHandle {
            s.schedule(ms(5), 7u8)
        }

        let mut queue: TimerQueue<Host> = TimerQueue::new();
        let handle = arm(&mut queue);
        assert_eq!(queue.pop_due(5), Some((handle, Host::Child(7))));
    }
}
