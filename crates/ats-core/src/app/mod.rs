//! App - アプリケーション層
//!
//! ports を組み合わせて、クライアント側の状態とクエリの調停を実装します。
//!
//! # 主要コンポーネント
//! - **SessionStore**: 認証状態の保持と永続化
//! - **route_guard**: 画面遷移の可否判定（純粋関数）
//! - **AuthedApi**: 保護 API の唯一の入口（期限切れトークンで自動 logout）
//! - **QueryCoordinator**: 検索・フィルタ・debounce・staleness guard
//! - **StatusUpdater**: 応募ステータスの楽観的更新
//! - **attachment**: 履歴書ファイルの検査とステージング
//! - **JobBoard / JobDetail / Dashboard / ApplicationForm**: 各画面の組み立て
//! - **ClientBuilder**: 構築とワイヤリング

pub mod application_form;
pub mod attachment;
pub mod authed;
pub mod builder;
pub mod coordinator;
pub mod dashboard;
pub mod job_board;
pub mod job_detail;
pub mod route_guard;
pub mod session_store;
pub mod sources;
pub mod status_updater;

// 主要な型を再エクスポート
pub use self::application_form::{ApplicationForm, open_public_job};
pub use self::attachment::{AttachmentPolicy, AttachmentSlot};
pub use self::authed::AuthedApi;
pub use self::builder::{AtsClient, BuildError, ClientBuilder};
pub use self::coordinator::{ListSource, ListView, OverlayToken, QueryCoordinator};
pub use self::dashboard::Dashboard;
pub use self::job_board::JobBoard;
pub use self::job_detail::JobDetail;
pub use self::route_guard::{GuardDecision, Route, can_enter};
pub use self::session_store::SessionStore;
pub use self::sources::{ApplicationSource, JobSource};
pub use self::status_updater::{PendingUpdate, StatusFailurePolicy, StatusUpdater};
