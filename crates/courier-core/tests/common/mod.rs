//! Common test utilities shared across integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use courier_core::domain::ExecutionError;
use courier_core::impls::InMemoryTaskStore;
use courier_core::ports::{Clock, TaskExecutor};
use courier_core::{Scheduler, SchedulerBuilder, ScheduledTask, TaskKey};

/// Executor that records every task it sees, in call order.
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<(TaskKey, DateTime<Utc>)>>,
    fail: bool,
    hold: Option<Duration>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    /// Each call sleeps for `hold` before returning.
    pub fn holding(hold: Duration) -> Arc<Self> {
        Arc::new(Self {
            hold: Some(hold),
            ..Self::default()
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str().to_string())
            .collect()
    }

    pub fn scheduled_times(&self) -> Vec<DateTime<Utc>> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of concurrent `execute` calls observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskExecutor for RecordingExecutor {
    async fn execute(&self, task: &ScheduledTask) -> Result<(), ExecutionError> {
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_running, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((task.key().clone(), task.scheduled_at()));

        if let Some(hold) = self.hold {
            tokio::time::sleep(hold).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            Err(ExecutionError::Delivery("smtp unreachable".into()))
        } else {
            Ok(())
        }
    }
}

/// Clock that works for the first `healthy_calls` reads, then panics.
pub struct FailingClock {
    calls: AtomicUsize,
    healthy_calls: usize,
}

impl FailingClock {
    pub fn after(healthy_calls: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            healthy_calls,
        })
    }
}

impl Clock for FailingClock {
    fn now(&self) -> DateTime<Utc> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.healthy_calls {
            panic!("clock exploded");
        }
        Utc::now()
    }
}

pub fn in_ms(ms: i64) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::milliseconds(ms)
}

pub fn message(key: &str, at: DateTime<Utc>) -> ScheduledTask {
    ScheduledTask::message(TaskKey::new(key), at, "someone@example.com", "hello")
}

pub async fn start(store: Arc<InMemoryTaskStore>, executor: Arc<RecordingExecutor>) -> Scheduler {
    SchedulerBuilder::new(store, executor).start().await.unwrap()
}

/// Wait until `fired` reaches `n`, polling the scheduler status.
///
/// More reliable than fixed sleeps since execution time can vary.
///
/// # Panics
///
/// Panics if the timeout is reached first.
pub async fn wait_for_fired(scheduler: &Scheduler, n: u64, timeout: Duration) {
    let start = tokio::time::Instant::now();
    loop {
        let status = scheduler.status().await;
        if status.fired >= n && status.in_flight == 0 {
            return;
        }
        if start.elapsed() > timeout {
            panic!("timeout waiting for {n} fired tasks, status: {status:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
