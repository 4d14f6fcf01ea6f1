//! Per-function runtime statistics
//!
//! Aggregates completed calls by function name as they stream in, so a
//! snapshot is a copy of a small map rather than a pass over every call.
//!
//! ## Data Flow
//!
//! ```text
//! CompletedCall
//!     │
//!     └──► StatTracker.record()      ← processing loop (writer)
//!
//! every N seconds
//!     └──► StatTracker.snapshot()    ← stats publisher (reader)
//!              └──► StatPacket ──► BroadcastSink
//! ```
//!
//! Both sides take the same lock, and a snapshot copies the map before
//! releasing it, so a reader never sees a half-applied update.

// Running averages intentionally convert counts to f64
#![allow(clippy::cast_precision_loss)]

use crossbeam_channel::{select, tick, Receiver};
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::output::{BroadcastSink, CompletedCall, FunctionStatsEntry, OutputEvent, StatPacket};

/// Default interval between published snapshots
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Statistics for a single function
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FunctionStats {
    pub calls_made: i64,
    /// Microseconds
    pub average_run_time: f64,
    /// Microseconds
    pub max_run_time: i64,
}

impl FunctionStats {
    fn add(&mut self, elapsed: i64) {
        let total = self.average_run_time * self.calls_made as f64 + elapsed as f64;
        self.calls_made += 1;
        self.average_run_time = total / self.calls_made as f64;
        self.max_run_time = if self.calls_made == 1 { elapsed } else { self.max_run_time.max(elapsed) };
    }
}

/// Shared aggregator, keyed by function name
#[derive(Debug, Default)]
pub struct StatTracker {
    functions: Mutex<BTreeMap<String, FunctionStats>>,
}

impl StatTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completed call into its function's statistics
    pub fn record(&self, call: &CompletedCall) {
        self.record_elapsed(&call.func_name, call.elapsed());
    }

    /// Fold a run time (microseconds) into `func_name`'s statistics
    pub fn record_elapsed(&self, func_name: &str, elapsed: i64) {
        let mut functions = self.functions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stats) = functions.get_mut(func_name) {
            stats.add(elapsed);
        } else {
            let mut stats = FunctionStats::default();
            stats.add(elapsed);
            functions.insert(func_name.to_string(), stats);
        }
    }

    /// Statistics for one function
    #[must_use]
    pub fn get(&self, func_name: &str) -> Option<FunctionStats> {
        self.functions.lock().unwrap_or_else(PoisonError::into_inner).get(func_name).copied()
    }

    /// Consistent copy of every function's statistics, ordered by name
    #[must_use]
    pub fn snapshot(&self) -> Vec<FunctionStatsEntry> {
        let functions = self.functions.lock().unwrap_or_else(PoisonError::into_inner);
        functions
            .iter()
            .map(|(name, stats)| FunctionStatsEntry {
                func_name: name.clone(),
                calls_made: stats.calls_made,
                average_run_time: stats.average_run_time,
                max_run_time: stats.max_run_time,
            })
            .collect()
    }
}

/// Publish a snapshot every `interval` until `stop` disconnects
///
/// A final snapshot is published on the way out so short runs (replays) still
/// report their statistics.
pub fn spawn_stats_publisher(
    tracker: Arc<StatTracker>,
    sink: Arc<dyn BroadcastSink>,
    interval: Duration,
    stop: Receiver<()>,
) -> JoinHandle<u64> {
    std::thread::spawn(move || {
        let ticker = tick(interval);
        let mut published = 0u64;
        loop {
            select! {
                recv(ticker) -> _ => {
                    publish(&tracker, sink.as_ref());
                    published += 1;
                }
                recv(stop) -> _ => break,
            }
        }
        publish(&tracker, sink.as_ref());
        published += 1;
        info!("Stats publisher stopped after {published} snapshots");
        published
    })
}

fn publish(tracker: &StatTracker, sink: &dyn BroadcastSink) {
    let stat_map = tracker.snapshot();
    debug!("Publishing stats for {} functions", stat_map.len());
    sink.broadcast(OutputEvent::Stats(StatPacket::new(stat_map)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, unbounded};

    #[test]
    fn test_running_average_and_max() {
        let tracker = StatTracker::new();
        for elapsed in [10, 20, 30] {
            tracker.record_elapsed("foo", elapsed);
        }
        let stats = tracker.get("foo").unwrap();
        assert_eq!(stats.calls_made, 3);
        assert!((stats.average_run_time - 20.0).abs() < f64::EPSILON);
        assert_eq!(stats.max_run_time, 30);
    }

    #[test]
    fn test_max_keeps_largest_seen() {
        let tracker = StatTracker::new();
        for elapsed in [50, 5, 20] {
            tracker.record_elapsed("bar", elapsed);
        }
        assert_eq!(tracker.get("bar").unwrap().max_run_time, 50);
    }

    #[test]
    fn test_single_negative_elapsed_is_its_own_max() {
        let tracker = StatTracker::new();
        tracker.record_elapsed("skewed", -3);
        assert_eq!(tracker.get("skewed").unwrap().max_run_time, -3);
    }

    #[test]
    fn test_snapshot_is_ordered_copy() {
        let tracker = StatTracker::new();
        tracker.record_elapsed("zeta", 1);
        tracker.record_elapsed("alpha", 2);
        let snapshot = tracker.snapshot();
        tracker.record_elapsed("alpha", 100);

        let names: Vec<_> = snapshot.iter().map(|e| e.func_name.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);
        assert_eq!(snapshot[0].calls_made, 1);
        assert_eq!(snapshot[0].max_run_time, 2);
    }

    #[test]
    fn test_concurrent_snapshots_are_never_torn() {
        const CALLS: i64 = 2_000;
        let tracker = Arc::new(StatTracker::new());
        let writer = {
            let tracker = Arc::clone(&tracker);
            std::thread::spawn(move || {
                for elapsed in 1..=CALLS {
                    tracker.record_elapsed("hot", elapsed);
                }
            })
        };

        let mut last = 0;
        while !writer.is_finished() {
            for entry in tracker.snapshot() {
                // call n took n us, so n calls average (n + 1) / 2 with max n
                let n = entry.calls_made;
                assert!(n >= last);
                assert!((entry.average_run_time - (n + 1) as f64 / 2.0).abs() < 1e-6);
                assert_eq!(entry.max_run_time, n);
                last = n;
            }
        }
        writer.join().unwrap();
        assert_eq!(tracker.get("hot").unwrap().calls_made, CALLS);
    }

    #[test]
    fn test_publisher_ticks_and_publishes_final_snapshot() {
        let tracker = Arc::new(StatTracker::new());
        tracker.record_elapsed("foo", 7);
        let (event_tx, event_rx) = unbounded();
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let handle = spawn_stats_publisher(
            Arc::clone(&tracker),
            Arc::new(event_tx),
            Duration::from_millis(10),
            stop_rx,
        );
        let first = event_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        drop(stop_tx);
        let published = handle.join().unwrap();
        assert!(published >= 2);

        let OutputEvent::Stats(packet) = first else {
            panic!("expected a stats packet");
        };
        assert_eq!(packet.stat_map.len(), 1);
        assert_eq!(packet.stat_map[0].func_name, "foo");
        assert_eq!(event_rx.try_iter().count() as u64, published - 1);
    }
}
