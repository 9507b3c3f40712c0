//! Per-key alert suppression.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::alerts::AlertKey;

/// Remembers when each alert key last fired.
///
/// Shared by the sampling loop and the event bridge. The check and the
/// update happen under one shard lock, so two callers racing on the same
/// key can never both be told to fire.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    entries: DashMap<AlertKey, DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `key` may fire at `now`, recording `now` if it may.
    ///
    /// A key fires when it has never fired or when `window` has fully
    /// elapsed since the last fire. A clock that moved backwards suppresses.
    pub fn should_fire(&self, key: &AlertKey, now: DateTime<Utc>, window: Duration) -> bool {
        let window = chrono::Duration::from_std(window)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));

        match self.entries.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
            Entry::Occupied(mut slot) => {
                let last = *slot.get();
                let expired = last
                    .checked_add_signed(window)
                    .is_some_and(|until| until <= now);
                if expired {
                    slot.insert(now);
                }
                expired
            }
        }
    }

    /// When `key` last fired.
    pub fn last_fired(&self, key: &AlertKey) -> Option<DateTime<Utc>> {
        self.entries.get(key).map(|v| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::MetricKind;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    const WINDOW: Duration = Duration::from_secs(1800);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
    }

    fn memory() -> AlertKey {
        AlertKey::metric(MetricKind::Memory)
    }

    #[test]
    fn test_first_fire_allowed() {
        let tracker = CooldownTracker::new();
        assert!(tracker.should_fire(&memory(), t0(), WINDOW));
        assert_eq!(tracker.last_fired(&memory()), Some(t0()));
    }

    #[test]
    fn test_suppressed_within_window() {
        let tracker = CooldownTracker::new();
        assert!(tracker.should_fire(&memory(), t0(), WINDOW));
        assert!(!tracker.should_fire(&memory(), t0() + chrono::Duration::minutes(1), WINDOW));
        assert!(!tracker.should_fire(&memory(), t0() + chrono::Duration::minutes(29), WINDOW));
        assert_eq!(tracker.last_fired(&memory()), Some(t0()));
    }

    #[test]
    fn test_fires_again_exactly_at_window() {
        let tracker = CooldownTracker::new();
        assert!(tracker.should_fire(&memory(), t0(), WINDOW));

        let later = t0() + chrono::Duration::seconds(1800);
        assert!(tracker.should_fire(&memory(), later, WINDOW));
        assert_eq!(tracker.last_fired(&memory()), Some(later));
    }

    #[test]
    fn test_keys_are_independent() {
        let tracker = CooldownTracker::new();
        let cpu = AlertKey::metric(MetricKind::Cpu);

        assert!(tracker.should_fire(&memory(), t0(), WINDOW));
        assert!(tracker.should_fire(&cpu, t0(), WINDOW));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_clock_going_backwards_suppresses() {
        let tracker = CooldownTracker::new();
        assert!(tracker.should_fire(&memory(), t0(), WINDOW));
        assert!(!tracker.should_fire(&memory(), t0() - chrono::Duration::hours(2), WINDOW));
    }

    #[test]
    fn test_concurrent_same_key_fires_once() {
        let tracker = CooldownTracker::new();
        let fired = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    barrier.wait();
                    if tracker.should_fire(&memory(), t0(), WINDOW) {
                        fired.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
