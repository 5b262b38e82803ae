//! Cancellable periodic timers on a host-supplied clock
//!
//! The engine never sleeps or spawns. Hosts pass the current monotonic time
//! and the timer set reports which periods have elapsed, one firing at a time
//! in deadline order, so a handler that cancels a timer (or starts a new one)
//! is observed by the very next `pop_due` call.

use std::collections::BTreeMap;
use std::time::Duration;

/// Handle identifying one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u32);

impl TimerHandle {
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// What a timer drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Snapshot poll
    Poll,
    /// Backend health probe
    HealthCheck,
    /// Simulated track playback step
    TrackTick,
}

/// One elapsed period of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    pub handle: TimerHandle,
    pub kind: TimerKind,
    /// Scheduled deadline of this period (not the time it was observed)
    pub at: Duration,
}

#[derive(Debug, Clone)]
struct PeriodicTimer {
    kind: TimerKind,
    interval: Duration,
    next_due: Duration,
}

/// Set of periodic timers keyed by handle
#[derive(Debug, Default)]
pub struct TimerSet {
    timers: BTreeMap<TimerHandle, PeriodicTimer>,
    counter: u32,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a timer firing at `first_due` and every `interval` after.
    ///
    /// A zero interval is clamped to one millisecond so `pop_due` always
    /// makes progress.
    pub fn schedule_every(
        &mut self,
        kind: TimerKind,
        interval: Duration,
        first_due: Duration,
    ) -> TimerHandle {
        self.counter = self.counter.wrapping_add(1);
        let handle = TimerHandle(self.counter);
        let interval = interval.max(Duration::from_millis(1));
        self.timers.insert(handle, PeriodicTimer { kind, interval, next_due: first_due });
        handle
    }

    /// Cancel a timer; returns false if it was not active
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    /// Cancel every timer, returning how many were active
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        count
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// Earliest pending deadline, if any timer is active
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.values().map(|t| t.next_due).min()
    }

    /// Pop the earliest elapsed period (deadline <= `now`) and re-arm its timer.
    ///
    /// Ties are broken by handle, i.e. scheduling order.
    pub fn pop_due(&mut self, now: Duration) -> Option<Firing> {
        let (handle, timer) = self
            .timers
            .iter_mut()
            .filter(|(_, t)| t.next_due <= now)
            .min_by_key(|(h, t)| (t.next_due, **h))?;

        let firing = Firing { handle: *handle, kind: timer.kind, at: timer.next_due };
        timer.next_due += timer.interval;
        Some(firing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_fires_each_elapsed_period_in_order() {
        let mut timers = TimerSet::new();
        let poll = timers.schedule_every(TimerKind::Poll, ms(100), ms(100));
        let tick = timers.schedule_every(TimerKind::TrackTick, ms(150), ms(150));

        let mut fired = Vec::new();
        while let Some(f) = timers.pop_due(ms(300)) {
            fired.push((f.handle, f.at));
        }

        assert_eq!(
            fired,
            vec![(poll, ms(100)), (tick, ms(150)), (poll, ms(200)), (poll, ms(300)), (tick, ms(300))]
        );
        assert_eq!(timers.next_deadline(), Some(ms(400)));
    }

    #[test]
    fn test_nothing_due_before_deadline() {
        let mut timers = TimerSet::new();
        timers.schedule_every(TimerKind::HealthCheck, ms(50), ms(50));
        assert!(timers.pop_due(ms(49)).is_none());
        assert!(timers.pop_due(ms(50)).is_some());
    }

    #[test]
    fn test_cancel_stops_future_firings() {
        let mut timers = TimerSet::new();
        let handle = timers.schedule_every(TimerKind::TrackTick, ms(10), ms(10));

        assert!(timers.pop_due(ms(10)).is_some());
        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
        assert!(timers.pop_due(ms(1000)).is_none());
        assert!(!timers.is_active(handle));
    }

    #[test]
    fn test_cancel_all() {
        let mut timers = TimerSet::new();
        timers.schedule_every(TimerKind::Poll, ms(10), ms(0));
        timers.schedule_every(TimerKind::HealthCheck, ms(10), ms(0));
        assert_eq!(timers.cancel_all(), 2);
        assert_eq!(timers.active_count(), 0);
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn test_handles_are_unique() {
        let mut timers = TimerSet::new();
        let a = timers.schedule_every(TimerKind::Poll, ms(10), ms(10));
        timers.cancel(a);
        let b = timers.schedule_every(TimerKind::Poll, ms(10), ms(10));
        assert_ne!(a, b);
    }
}
