//! Virtual-time timer queue.
//!
//! Nothing here sleeps: the owner advances time explicitly and drains what became due.
//! Timers fire in (deadline, scheduling order); a cancelled timer never fires, even if it is
//! already due.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

/// Smallest period a repeating timer may have; a zero period would fire forever at one instant.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// A timer that came due.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fired<T> {
    pub handle: TimerHandle,
    pub at: Duration,
    pub payload: T,
}

struct Entry<T> {
    deadline: Duration,
    seq: u64,
    handle: TimerHandle,
    period: Option<Duration>,
    payload: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.deadline, self.seq).cmp(&(other.deadline, other.seq))
    }
}

pub struct TimerQueue<T> {
    now: Duration,
    seq: u64,
    next_handle: u64,
    heap: BinaryHeap<Reverse<Entry<T>>>,
    live: HashSet<TimerHandle>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            seq: 0,
            next_handle: 1,
            heap: BinaryHeap::new(),
            live: HashSet::new(),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Move the clock forward; never backwards.
    pub fn advance_to(&mut self, t: Duration) {
        self.now = self.now.max(t);
    }

    pub fn schedule_once(&mut self, delay: Duration, payload: T) -> TimerHandle {
        self.push(delay, None, payload)
    }

    /// First fires one `period` from now.
    pub fn schedule_repeating(&mut self, period: Duration, payload: T) -> TimerHandle {
        let period = period.max(MIN_PERIOD);
        self.push(period, Some(period), payload)
    }

    /// Returns false when the timer had already fired (one-shot) or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.live.remove(&handle)
    }

    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.live.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.heap
            .iter()
            .filter(|Reverse(e)| self.live.contains(&e.handle))
            .map(|Reverse(e)| e.deadline)
            .min()
    }

    fn push(&mut self, delay: Duration, period: Option<Duration>, payload: T) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert(handle);
        self.enqueue(self.now + delay, handle, period, payload);
        handle
    }

    fn enqueue(&mut self, deadline: Duration, handle: TimerHandle, period: Option<Duration>, payload: T) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Reverse(Entry {
            deadline,
            seq,
            handle,
            period,
            payload,
        }));
    }
}

impl<T: Clone> TimerQueue<T> {
    /// Pop the earliest live timer due at or before `until`, moving the clock to its deadline.
    /// Repeating timers are re-armed one period after the deadline they fired at.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired<T>> {
        loop {
            let Reverse(top) = self.heap.peek()?;
            if !self.live.contains(&top.handle) {
                self.heap.pop();
                continue;
            }
            if top.deadline > until {
                return None;
            }
            let Reverse(entry) = self.heap.pop()?;
            self.advance_to(entry.deadline);
            match entry.period {
                Some(period) => self.enqueue(
                    entry.deadline + period,
                    entry.handle,
                    Some(period),
                    entry.payload.clone(),
                ),
                None => {
                    self.live.remove(&entry.handle);
                }
            }
            return Some(Fired {
                handle: entry.handle,
                at: entry.deadline,
                payload: entry.payload,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn drain(q: &mut TimerQueue<&'static str>, until: Duration) -> Vec<(u64, &'static str)> {
        let mut out = Vec::new();
        while let Some(f) = q.pop_due(until) {
            out.push((f.at.as_millis() as u64, f.payload));
        }
        q.advance_to(until);
        out
    }

    #[test]
    fn fires_in_deadline_then_scheduling_order() {
        let mut q = TimerQueue::new();
        q.schedule_once(ms(20), "b");
        q.schedule_once(ms(10), "a");
        q.schedule_once(ms(20), "c");
        assert_eq!(q.next_deadline(), Some(ms(10)));
        assert_eq!(drain(&mut q, ms(15)), vec![(10, "a")]);
        assert_eq!(drain(&mut q, ms(100)), vec![(20, "b"), (20, "c")]);
        assert!(q.is_empty());
        assert_eq!(q.now(), ms(100));
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut q = TimerQueue::new();
        let a = q.schedule_once(ms(10), "a");
        q.schedule_once(ms(30), "b");
        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert_eq!(q.next_deadline(), Some(ms(30)));
        assert_eq!(drain(&mut q, ms(50)), vec![(30, "b")]);
    }

    #[test]
    fn repeating_timer_rearms_from_its_deadline() {
        let mut q = TimerQueue::new();
        let tick = q.schedule_repeating(ms(5), "tick");
        q.schedule_once(ms(7), "once");
        assert_eq!(
            drain(&mut q, ms(16)),
            vec![(5, "tick"), (7, "once"), (10, "tick"), (15, "tick")]
        );
        assert!(q.is_scheduled(tick));
        assert_eq!(q.next_deadline(), Some(ms(20)));
        q.cancel(tick);
        assert!(drain(&mut q, ms(100)).is_empty());
    }

    #[test]
    fn zero_period_is_clamped() {
        let mut q = TimerQueue::new();
        q.schedule_repeating(Duration::ZERO, "spin");
        assert_eq!(drain(&mut q, ms(3)).len(), 3);
    }
}
