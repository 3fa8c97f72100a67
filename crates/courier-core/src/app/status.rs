//! Status - スケジューラの状態と集計
//!
//! Counters are updated by the worker wrapper after each fired task and read
//! without locking. `SchedulerStatus` is a point-in-time snapshot.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a scheduler's dispatcher loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulerState {
    Running,
    /// Shutdown was requested; the loop has not exited yet.
    Stopping,
    Stopped,
    Faulted,
}

impl SchedulerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SchedulerState::Stopped | SchedulerState::Faulted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    /// Tasks waiting in the queue.
    pub pending: usize,
    /// Executors currently running.
    pub in_flight: usize,
    /// Tasks that finished executing, successfully or not.
    pub fired: u64,
    /// Subset of `fired` whose executor returned an error.
    pub failed: u64,
    pub next_due: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    in_flight: AtomicUsize,
    fired: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    pub(crate) fn started(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn finished(&self, success: bool) {
        if !success {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        self.fired.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn fired(&self) -> u64 {
        self.fired.load(Ordering::SeqCst)
    }

    pub(crate) fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_in_flight_and_failures() {
        let counters = Counters::default();
        counters.started();
        counters.started();
        assert_eq!(counters.in_flight(), 2);

        counters.finished(true);
        counters.finished(false);
        assert_eq!(counters.in_flight(), 0);
        assert_eq!(counters.fired(), 2);
        assert_eq!(counters.failed(), 1);
    }

    #[test]
    fn state_serializes_in_upper_case() {
        let s = serde_json::to_string(&SchedulerState::Faulted).unwrap();
        assert_eq!(s, "\"FAULTED\"");
        assert!(SchedulerState::Stopped.is_terminal());
        assert!(!SchedulerState::Stopping.is_terminal());
    }
}
