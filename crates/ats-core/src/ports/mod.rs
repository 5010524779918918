//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部のもの（サーバー API、永続ストレージ、ユーザーへの通知・確認）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - サーバーが source of truth（正本）
//! - クライアントが持つ一覧はキャッシュにすぎない
//! - Session は暗黙のグローバル状態ではなく、明示的に渡す

pub mod api;
pub mod confirm;
pub mod notice_sink;
pub mod session_storage;

pub use self::api::AtsApi;
pub use self::confirm::Confirm;
pub use self::notice_sink::{Notice, NoticeLevel, NoticeSink};
pub use self::session_storage::{SessionStorage, StorageError};
