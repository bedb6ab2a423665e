use crate::scheduler::{TimerHandle, TimerQueue};
use annotator::Timing;

/// Why a pass runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Once, a settle delay after load.
    Settle,
    /// Quiet period after the last mutation burst.
    Debounce,
    /// Periodic safety net for changes the observer missed.
    Interval,
}

/// Arms and disarms the three triggers on a timer queue.
#[derive(Debug)]
pub struct TriggerWiring {
    timing: Timing,
    settle: Option<TimerHandle>,
    debounce: Option<TimerHandle>,
    interval: Option<TimerHandle>,
}

impl TriggerWiring {
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            settle: None,
            debounce: None,
            interval: None,
        }
    }

    /// Page load: arm the settle pass and start the interval. Re-arms from scratch if called
    /// again.
    pub fn on_load(&mut self, timers: &mut TimerQueue<Trigger>) {
        self.teardown(timers);
        self.settle = Some(timers.schedule_once(self.timing.settle_delay(), Trigger::Settle));
        self.interval = Some(timers.schedule_repeating(self.timing.interval(), Trigger::Interval));
    }

    /// A mutation notification. Only the last one of a burst leads to a pass.
    pub fn on_mutation(&mut self, timers: &mut TimerQueue<Trigger>) {
        if let Some(pending) = self.debounce.take() {
            timers.cancel(pending);
        }
        self.debounce = Some(timers.schedule_once(self.timing.debounce(), Trigger::Debounce));
    }

    /// Forget one-shot handles once they fired.
    pub fn on_fired(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::Settle => self.settle = None,
            Trigger::Debounce => self.debounce = None,
            Trigger::Interval => {}
        }
    }

    /// A settle or debounce pass is still to come.
    pub fn has_pending_one_shot(&self) -> bool {
        self.settle.is_some() || self.debounce.is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.settle.is_some() || self.debounce.is_some() || self.interval.is_some()
    }

    /// Cancel everything still pending; returns how many timers were cancelled.
    pub fn teardown(&mut self, timers: &mut TimerQueue<Trigger>) -> usize {
        [self.settle.take(), self.debounce.take(), self.interval.take()]
            .into_iter()
            .flatten()
            .filter(|&handle| timers.cancel(handle))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fire_all(timers: &mut TimerQueue<Trigger>, until: u64) -> Vec<(u64, Trigger)> {
        let mut out = Vec::new();
        while let Some(f) = timers.pop_due(Duration::from_millis(until)) {
            out.push((f.at.as_millis() as u64, f.payload));
        }
        out
    }

    #[test]
    fn burst_of_mutations_runs_one_debounced_pass() {
        let mut timers = TimerQueue::new();
        let mut wiring = TriggerWiring::new(Timing::default());
        for t in [0, 100, 200, 300] {
            timers.advance_to(Duration::from_millis(t));
            wiring.on_mutation(&mut timers);
        }
        assert_eq!(fire_all(&mut timers, 1000), vec![(800, Trigger::Debounce)]);
    }

    #[test]
    fn load_arms_settle_and_interval() {
        let mut timers = TimerQueue::new();
        let mut wiring = TriggerWiring::new(Timing::default());
        wiring.on_load(&mut timers);
        assert_eq!(
            fire_all(&mut timers, 10_000),
            vec![
                (2000, Trigger::Settle),
                (5000, Trigger::Interval),
                (10_000, Trigger::Interval)
            ]
        );
    }

    #[test]
    fn teardown_cancels_pending_timers() {
        let mut timers = TimerQueue::new();
        let mut wiring = TriggerWiring::new(Timing::default());
        wiring.on_load(&mut timers);
        wiring.on_mutation(&mut timers);
        assert_eq!(wiring.teardown(&mut timers), 3);
        assert!(!wiring.is_armed());
        assert!(timers.is_empty());
        assert!(fire_all(&mut timers, 60_000).is_empty());
    }
}
