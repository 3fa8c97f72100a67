//! courier-core
//!
//! Durable, time-ordered task dispatcher.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskKey, ScheduledTask, Platform, TaskOutcome, errors）
//! - **ports**: 抽象化レイヤー（TaskStore, TaskExecutor, PendingLedger, Clock, KeyGenerator）
//! - **queue**: 次に発火するタスクを決める IndexedHeap
//! - **app**: SchedulerBuilder / Scheduler / dispatcher ループ
//! - **impls**: ports の実装（InMemoryTaskStore, SqliteTaskStore, PayloadRouter など）
//! - **config**: TOML 設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;

pub use app::{
    DispatcherExit, Scheduler, SchedulerBuilder, SchedulerError, SchedulerState, SchedulerStatus,
};
pub use config::{ConfigError, CourierConfig, SchedulerConfig};
pub use domain::{Platform, ScheduledTask, TaskKey, TaskOutcome, TaskPayload};
