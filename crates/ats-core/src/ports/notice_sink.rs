//! NoticeSink port - ユーザー向けの非ブロッキング通知
//!
//! 失敗はすべて呼び出し元で捕捉され、ここを通じてユーザーに伝えられます。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}
