//! Firing order and timing.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rstest::rstest;

use common::{RecordingExecutor, in_ms, message, start, wait_for_fired};
use courier_core::impls::InMemoryTaskStore;
use courier_core::ports::FixedClock;
use courier_core::{SchedulerBuilder, SchedulerConfig};

// Offsets in units of 100ms, i.e. T+1, T+5, T+10 scaled down.
#[rstest]
#[case::ascending([1, 5, 10])]
#[case::descending([10, 5, 1])]
#[case::middle_first([5, 1, 10])]
#[case::latest_first([10, 1, 5])]
#[tokio::test]
async fn fires_in_time_order_regardless_of_insertion_order(#[case] offsets: [i64; 3]) {
    let store = Arc::new(InMemoryTaskStore::new());
    let executor = RecordingExecutor::new();
    let scheduler = start(store.clone(), executor.clone()).await;
    let mut outcomes = scheduler.subscribe();

    for offset in offsets {
        scheduler
            .add_task(message(&format!("t{offset}"), in_ms(offset * 100)))
            .await
            .unwrap();
    }

    wait_for_fired(&scheduler, 3, Duration::from_secs(5)).await;
    assert_eq!(executor.keys(), vec!["t1", "t5", "t10"]);

    for _ in 0..3 {
        let outcome = outcomes.recv().await.unwrap();
        assert!(outcome.is_success());
        let late = outcome.lateness();
        assert!(late >= chrono::Duration::zero(), "fired early: {late:?}");
        assert!(late < chrono::Duration::milliseconds(500), "fired late: {late:?}");
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn past_due_task_fires_immediately() {
    let store = Arc::new(InMemoryTaskStore::new());
    let executor = RecordingExecutor::new();
    let scheduler = start(store, executor.clone()).await;

    let started = tokio::time::Instant::now();
    scheduler.add_task(message("late", in_ms(-60_000))).await.unwrap();
    wait_for_fired(&scheduler, 1, Duration::from_secs(2)).await;

    assert!(started.elapsed() < Duration::from_millis(200));
    assert_eq!(executor.keys(), vec!["late"]);
}

#[tokio::test]
async fn clock_in_the_future_makes_everything_due() {
    let far_future = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
    let store = Arc::new(InMemoryTaskStore::new());
    let executor = RecordingExecutor::new();
    let scheduler = SchedulerBuilder::new(store, executor.clone())
        .clock(Arc::new(FixedClock::new(far_future)))
        .start()
        .await
        .unwrap();

    scheduler.add_task(message("next-hour", in_ms(3_600_000))).await.unwrap();
    wait_for_fired(&scheduler, 1, Duration::from_secs(2)).await;
    assert_eq!(executor.keys(), vec!["next-hour"]);
}

#[tokio::test]
async fn equal_times_fire_in_submission_order() {
    let store = Arc::new(InMemoryTaskStore::new());
    let executor = RecordingExecutor::new();
    let scheduler = SchedulerBuilder::new(store, executor.clone())
        .config(SchedulerConfig {
            max_in_flight: Some(1),
            ..SchedulerConfig::default()
        })
        .start()
        .await
        .unwrap();

    let at = in_ms(150);
    for key in ["a", "b", "c", "d"] {
        scheduler.add_task(message(key, at)).await.unwrap();
    }
    wait_for_fired(&scheduler, 4, Duration::from_secs(3)).await;
    assert_eq!(executor.keys(), vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn earlier_task_submitted_later_preempts_armed_timer() {
    let store = Arc::new(InMemoryTaskStore::new());
    let executor = RecordingExecutor::new();
    let scheduler = start(store, executor.clone()).await;

    scheduler.add_task(message("slow", in_ms(800))).await.unwrap();
    // Give the loop time to arm for "slow".
    tokio::time::sleep(Duration::from_millis(50)).await;
    scheduler.add_task(message("fast", in_ms(100))).await.unwrap();

    wait_for_fired(&scheduler, 1, Duration::from_millis(600)).await;
    assert_eq!(executor.keys(), vec!["fast"]);

    wait_for_fired(&scheduler, 2, Duration::from_secs(3)).await;
    assert_eq!(executor.keys(), vec!["fast", "slow"]);
}
