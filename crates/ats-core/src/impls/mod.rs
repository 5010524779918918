//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **HttpAtsApi**: reqwest ベースのサーバー API クライアント（本番用）
//! - **InMemoryAtsApi**: テスト・デモ用のインメモリサーバー
//! - **FileSessionStorage / InMemorySessionStorage**: セッションの永続化
//! - **TracingNoticeSink / CollectingNoticeSink / AutoConfirm**: 通知と確認

pub mod file_storage;
pub mod http_api;
pub mod inmem_api;
pub mod notice;

// 主要な型を再エクスポート
pub use self::file_storage::{FileSessionStorage, InMemorySessionStorage};
pub use self::http_api::HttpAtsApi;
pub use self::inmem_api::{ApiCall, ApiCallKind, InMemoryAtsApi};
pub use self::notice::{AutoConfirm, CollectingNoticeSink, TracingNoticeSink};
