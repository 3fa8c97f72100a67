//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryTaskStore**: 開発・テスト用の正本（障害注入つき）
//! - **SqliteTaskStore**: SQLite による永続ストア（1 タスク 1 行）
//! - **PayloadRouter**: デフォルトの TaskExecutor
//! - **FanoutPublisher**: プラットフォームごとの PlatformPoster を束ねる
//! - **InMemoryPendingLedger**: 所有者ごとの予約リスト
//! - **LogSender / LogPoster**: tracing に出力するだけの協力者（CLI 用）
//!
//! # 本番用実装
//! メール送信や SNS API クライアントは別クレートに配置します。

pub mod fanout;
pub mod inmem_store;
pub mod log_collaborators;
pub mod memory_ledger;
pub mod router;
pub mod sqlite_store;

// 主要な型を再エクスポート
pub use self::fanout::FanoutPublisher;
pub use self::inmem_store::InMemoryTaskStore;
pub use self::log_collaborators::{LogPoster, LogSender};
pub use self::memory_ledger::InMemoryPendingLedger;
pub use self::router::PayloadRouter;
pub use self::sqlite_store::SqliteTaskStore;
