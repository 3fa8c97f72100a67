//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（永続ストア、メール送信、SNS 投稿、呼び出し側の状態）
//! へのインターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - TaskStore が正本（起動時の復元と終了時の削除にのみ使う）
//! - 実行は TaskExecutor に委譲（副作用はすべてここ）

pub mod clock;
pub mod executor;
pub mod key_generator;
pub mod pending_ledger;
pub mod task_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::executor::{ContentPublisher, MessageSender, PlatformPoster, TaskExecutor};
pub use self::key_generator::{KeyGenerator, UlidKeyGenerator};
pub use self::pending_ledger::{LedgerError, NoopLedger, PendingLedger};
pub use self::task_store::{StoreError, TaskStore};
