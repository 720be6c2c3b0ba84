//! Per-route latency statistics served by `/stats`.
//!
//! Each entry keeps a call count and a cumulative duration. The average is
//! derived at snapshot time and never stored.

use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy)]
struct StatEntry {
    count: u64,
    total: Duration,
}

/// One row of a stats snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSummary {
    pub name: String,
    pub total: u64,
    /// Average duration in whole microseconds (truncated).
    pub average: u64,
}

/// Accumulates call counts and latency per operation name.
#[derive(Debug, Default)]
pub struct StatsTracker {
    entries: DashMap<String, StatEntry>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one call of `elapsed` to `name`, creating the entry on first use.
    pub fn record(&self, name: impl Into<String>, elapsed: Duration) {
        // The shard lock covers both fields, so count and total never diverge.
        let mut entry = self.entries.entry(name.into()).or_default();
        entry.count += 1;
        entry.total += elapsed;
    }

    /// Current averages, sorted by name.
    pub fn snapshot(&self) -> Vec<StatSummary> {
        let mut summaries: Vec<StatSummary> = self
            .entries
            .iter()
            .map(|entry| {
                let StatEntry { count, total } = *entry.value();
                StatSummary {
                    name: entry.key().clone(),
                    total: count,
                    average: (total.as_micros() / u128::from(count.max(1))) as u64,
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_two_calls() {
        let stats = StatsTracker::new();
        stats.record("test", Duration::from_micros(100));
        stats.record("test", Duration::from_micros(300));

        let snapshot = stats.snapshot();
        assert_eq!(
            snapshot,
            vec![StatSummary {
                name: "test".into(),
                total: 2,
                average: 200,
            }]
        );
    }

    #[test]
    fn average_truncates() {
        let stats = StatsTracker::new();
        stats.record("op", Duration::from_micros(1));
        stats.record("op", Duration::from_micros(2));
        stats.record("op", Duration::from_nanos(500));

        assert_eq!(stats.snapshot()[0].average, 1);
    }

    #[test]
    fn snapshot_sorted_by_name() {
        let stats = StatsTracker::new();
        stats.record("/stats GET", Duration::from_micros(5));
        stats.record("/hash POST", Duration::from_micros(5));
        stats.record("/hash/{id} GET", Duration::from_micros(5));

        let names: Vec<_> = stats.snapshot().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["/hash POST", "/hash/{id} GET", "/stats GET"]);
    }

    #[test]
    fn empty_until_recorded() {
        let stats = StatsTracker::new();
        assert!(stats.snapshot().is_empty());
    }

    #[test]
    fn concurrent_records_are_counted() {
        let stats = std::sync::Arc::new(StatsTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record("shared", Duration::from_micros(10));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot[0].total, 800);
        assert_eq!(snapshot[0].average, 10);
    }
}
