//! ats-core
//!
//! Client-side state and query coordination for an applicant-tracking system.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, job, application, status, session, criteria, stats, errors）
//! - **ports**: 抽象化レイヤー（AtsApi, SessionStorage, NoticeSink, Confirm）
//! - **app**: アプリケーションロジック（session_store, route_guard, coordinator, status_updater, ...）
//! - **impls**: 実装（HttpAtsApi, InMemoryAtsApi, FileSessionStorage, ...）
//! - **config**: クライアント設定（TOML）

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{AtsClient, ClientBuilder};
pub use config::ClientConfig;
pub use domain::{AtsError, ErrorKind};
