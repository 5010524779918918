//! Notice and confirmation implementations.

use std::sync::Mutex;

use crate::ports::{Confirm, Notice, NoticeLevel, NoticeSink};

/// Forwards notices to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNoticeSink;

impl NoticeSink for TracingNoticeSink {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(target: "ats::notice", "{}", notice.message),
            NoticeLevel::Error => tracing::warn!(target: "ats::notice", "{}", notice.message),
        }
    }
}

/// Keeps every notice so a front end (or a test) can show them later.
#[derive(Debug, Default)]
pub struct CollectingNoticeSink {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingNoticeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(
            &mut *self
                .notices
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|notice| notice.level == NoticeLevel::Error)
            .map(|notice| notice.message)
            .collect()
    }
}

impl NoticeSink for CollectingNoticeSink {
    fn notify(&self, notice: Notice) {
        tracing::debug!(level = ?notice.level, "notice: {}", notice.message);
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notice);
    }
}

/// Answers every confirmation with a fixed value.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!(answer = self.0, "auto-confirm: {prompt}");
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_separates_errors() {
        let sink = CollectingNoticeSink::new();
        sink.notify(Notice::info("saved"));
        sink.notify(Notice::error("Failed to update status"));

        assert_eq!(sink.errors(), vec!["Failed to update status".to_string()]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.notices().is_empty());
    }

    #[test]
    fn closures_can_confirm() {
        let gate = |prompt: &str| prompt.contains("delete");
        assert!(gate.confirm("Are you sure you want to delete this job?"));
        assert!(!AutoConfirm(false).confirm("anything"));
    }
}
