//! SessionStorage port - 永続クライアントストレージ
//!
//! ブラウザの localStorage と同じく、固定キーに文字列を保存する同期 API です。
//!
//! # 実装
//! - `FileSessionStorage`: データディレクトリ配下のファイル
//! - `InMemorySessionStorage`: テスト用

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored value is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no data directory available for this user")]
    NoDataDirectory,
}

/// Key-value storage that survives restarts.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
