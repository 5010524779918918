//! Errors - エラー型と分類
//!
//! サーバー呼び出しとクライアント側検証の失敗はすべて `AtsError` に集約されます。
//! どの失敗も呼び出し元で捕捉され、ユーザー向けの通知に変換されます（自動リトライはしない）。

use thiserror::Error;

use super::status::ApplicationStatus;

/// ErrorKind は失敗の運用上の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 認証失敗・重複登録・期限切れトークン
    Auth,
    /// クライアント側の検証エラー（ネットワークに到達しない）
    Validation,
    /// 存在しない、または公開されていないリソース
    NotFound,
    /// それ以外の一時的な失敗
    Transient,
}

/// Client-side rejection that never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported file type '{mime}': please upload a PDF or DOC/DOCX file")]
    UnsupportedType { mime: String },

    #[error("file is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("status change {from} -> {to} is not allowed")]
    IllegalTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtsError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request failed: {0}")]
    Transient(String),
}

impl AtsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AtsError::Auth(_) => ErrorKind::Auth,
            AtsError::Validation(_) => ErrorKind::Validation,
            AtsError::NotFound(_) => ErrorKind::NotFound,
            AtsError::Transient(_) => ErrorKind::Transient,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }
}
