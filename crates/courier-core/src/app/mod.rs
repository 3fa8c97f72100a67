//! App - アプリケーション層
//!
//! このモジュールは、ports と queue を組み合わせてスケジューラを実装します。
//!
//! # 主要コンポーネント
//! - **SchedulerBuilder**: 構築、設定検証、起動時の復元
//! - **Scheduler**: 呼び出し側のハンドル（add / remove / stop / status）
//! - **dispatcher**: 次のタスクを待って発火する単一ループ
//! - **worker**: 発火したタスク1件の実行と後始末

pub mod builder;
pub mod dispatcher;
pub mod error;
pub mod scheduler;
pub mod status;
mod worker;

// 主要な型を再エクスポート
pub use self::builder::SchedulerBuilder;
pub use self::dispatcher::DispatcherExit;
pub use self::error::SchedulerError;
pub use self::scheduler::Scheduler;
pub use self::status::{SchedulerState, SchedulerStatus};
