//! Job Lifecycle View - 求人の一覧・作成・編集・公開切替・削除
//!
//! - toggle_active は部分パッチではなく、`active` を反転した完全なレコードを送る
//! - delete_job は同期的な確認ゲートを通し、サーバーが成功を返してから一覧から外す

use std::sync::Arc;

use crate::app::authed::AuthedApi;
use crate::app::coordinator::{ListView, QueryCoordinator};
use crate::app::sources::JobSource;
use crate::domain::{AtsError, JobDraft, JobId, JobPosting};
use crate::ports::{Confirm, Notice, NoticeSink};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this job?";

pub struct JobBoard {
    api: AuthedApi,
    list: QueryCoordinator<JobSource>,
    confirm: Arc<dyn Confirm>,
    notices: Arc<dyn NoticeSink>,
}

impl JobBoard {
    pub fn new(
        api: AuthedApi,
        list: QueryCoordinator<JobSource>,
        confirm: Arc<dyn Confirm>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            api,
            list,
            confirm,
            notices,
        }
    }

    pub fn list(&self) -> &QueryCoordinator<JobSource> {
        &self.list
    }

    /// Postings with their application counts, newest first.
    pub async fn load(&self) -> ListView<JobPosting> {
        self.list.load().await
    }

    pub async fn create_job(&self, draft: &JobDraft) -> Result<JobPosting, AtsError> {
        draft.validate()?;
        let created = self
            .report("Failed to save job", self.api.create_job(draft).await)?;
        tracing::info!(job = %created.id, title = %created.title, "job created");
        self.list.refresh();
        Ok(created)
    }

    /// Apply `draft` to the current record and send the full record back.
    pub async fn update_job(&self, id: JobId, draft: &JobDraft) -> Result<JobPosting, AtsError> {
        draft.validate()?;
        let current = match self.list.get(id) {
            Some(job) => job,
            None => self.report("Failed to load job", self.api.get_job(id).await)?,
        };
        let updated = self.report(
            "Failed to save job",
            self.api.update_job(&current.with_draft(draft)).await,
        )?;
        tracing::info!(job = %updated.id, "job updated");
        self.list.refresh();
        Ok(updated)
    }

    pub async fn toggle_active(&self, id: JobId) -> Result<JobPosting, AtsError> {
        let current = match self.list.get(id) {
            Some(job) => job,
            None => self.report("Failed to load job", self.api.get_job(id).await)?,
        };
        let toggled = current.with_active_toggled();
        let updated = self.report(
            "Failed to update job",
            self.api.update_job(&toggled).await,
        )?;
        tracing::info!(job = %updated.id, active = updated.active, "job visibility changed");
        self.list.refresh();
        Ok(updated)
    }

    /// Ask for confirmation, delete on the server, then drop the row locally.
    ///
    /// Returns `Ok(false)` when the user declines; nothing is sent then.
    pub async fn delete_job(&self, id: JobId) -> Result<bool, AtsError> {
        if !self.confirm.confirm(DELETE_PROMPT) {
            tracing::debug!(job = %id, "delete declined");
            return Ok(false);
        }
        self.report("Failed to delete job", self.api.delete_job(id).await)?;
        self.list.remove_item(id);
        tracing::info!(job = %id, "job deleted");
        Ok(true)
    }

    fn report<T>(&self, what: &str, result: Result<T, AtsError>) -> Result<T, AtsError> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "{what}");
            self.notices.notify(Notice::error(format!("{what}: {e}")));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::app::session_store::SessionStore;
    use crate::domain::ValidationError;
    use crate::impls::{
        ApiCall, ApiCallKind, AutoConfirm, CollectingNoticeSink, InMemoryAtsApi,
        InMemorySessionStorage,
    };

    async fn board(confirm: bool) -> (Arc<InMemoryAtsApi>, Arc<CollectingNoticeSink>, JobBoard) {
        let api = Arc::new(InMemoryAtsApi::new());
        api.seed_user("Rita", "rita@example.com", "pw");
        let session = SessionStore::new(api.clone(), Arc::new(InMemorySessionStorage::new()));
        session.login("rita@example.com", "pw").await.unwrap();
        let authed = AuthedApi::new(api.clone(), session);
        let notices = Arc::new(CollectingNoticeSink::new());
        let list = QueryCoordinator::new(
            JobSource::new(authed.clone()),
            Duration::from_millis(300),
            notices.clone(),
        );
        let board = JobBoard::new(authed, list, Arc::new(AutoConfirm(confirm)), notices.clone());
        (api, notices, board)
    }

    #[tokio::test]
    async fn toggle_sends_the_full_record() {
        let (api, _notices, board) = board(true).await;
        let job = api.seed_job("Backend Engineer", true);
        board.load().await;
        api.clear_calls();

        let updated = board.toggle_active(job.id).await.unwrap();
        assert!(!updated.active);

        let sent = api
            .calls_of(ApiCallKind::UpdateJob)
            .into_iter()
            .next()
            .unwrap();
        let ApiCall::UpdateJob { job: sent } = sent else {
            panic!("expected an update call");
        };
        assert_eq!(sent.title, "Backend Engineer");
        assert_eq!(sent.created_at, job.created_at);
        assert!(!sent.active);

        let view = board.list().settled().await;
        assert!(!view.items[0].active);
    }

    #[tokio::test]
    async fn declined_delete_sends_nothing() {
        let (api, _notices, board) = board(false).await;
        let job = api.seed_job("Backend Engineer", true);
        board.load().await;
        api.clear_calls();

        assert!(!board.delete_job(job.id).await.unwrap());
        assert!(api.calls().is_empty());
        assert_eq!(board.list().items().len(), 1);
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_row() {
        let (api, notices, board) = board(true).await;
        let job = api.seed_job("Backend Engineer", true);
        board.load().await;
        api.fail_next(ApiCallKind::DeleteJob, AtsError::Transient("500".into()));

        assert!(board.delete_job(job.id).await.is_err());
        assert_eq!(board.list().items().len(), 1);
        assert_eq!(notices.errors().len(), 1);

        assert!(board.delete_job(job.id).await.unwrap());
        assert!(board.list().items().is_empty());
        assert!(api.job(job.id).is_none());
    }

    #[tokio::test]
    async fn blank_title_is_rejected_locally() {
        let (api, _notices, board) = board(true).await;
        api.clear_calls();

        let err = board.create_job(&JobDraft::new("   ")).await.unwrap_err();
        assert_eq!(
            err,
            AtsError::Validation(ValidationError::MissingField("title"))
        );
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn create_and_edit_refresh_the_board() {
        let (api, _notices, board) = board(true).await;
        let created = board
            .create_job(&JobDraft::new("Data Engineer").description("Pipelines"))
            .await
            .unwrap();
        assert_eq!(created.created_by.as_deref(), Some("Rita"));
        assert_eq!(board.list().settled().await.items.len(), 1);

        let edited = board
            .update_job(created.id, &JobDraft::new("Senior Data Engineer"))
            .await
            .unwrap();
        assert_eq!(edited.title, "Senior Data Engineer");
        assert!(edited.active);
        assert_eq!(
            board.list().settled().await.items[0].title,
            "Senior Data Engineer"
        );
        assert_eq!(api.calls_of(ApiCallKind::CreateJob).len(), 1);
    }
}
