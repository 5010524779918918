//! AuthedApi - 保護された API 呼び出しの唯一の入口
//!
//! 全ての保護 API はここを通ります。
//! - Session が無ければネットワークに出ずに `AtsError::Auth`
//! - サーバーが認証を拒否したら（期限切れトークンなど）、その credential の Session を破棄する
//!
//! 呼び出し側ごとに期限切れ処理を書かない。

use std::future::Future;
use std::sync::Arc;

use crate::app::session_store::SessionStore;
use crate::domain::{
    Application, ApplicationId, ApplicationStatus, AtsError, Credential, DashboardStats, JobDraft,
    JobId, JobPosting,
};
use crate::ports::AtsApi;

#[derive(Clone)]
pub struct AuthedApi {
    api: Arc<dyn AtsApi>,
    session: SessionStore,
}

impl AuthedApi {
    pub fn new(api: Arc<dyn AtsApi>, session: SessionStore) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Run `call` with the current credential and intercept auth rejections.
    async fn with_credential<'a, T, F, Fut>(&'a self, call: F) -> Result<T, AtsError>
    where
        F: FnOnce(&'a dyn AtsApi, Credential) -> Fut,
        Fut: Future<Output = Result<T, AtsError>> + 'a,
    {
        let Some(session) = self.session.current() else {
            return Err(AtsError::Auth("not signed in".to_string()));
        };
        let credential = session.credential;
        let result = call(self.api.as_ref(), credential.clone()).await;
        if let Err(e) = &result {
            if e.is_auth() {
                self.session.invalidate(&credential);
            }
        }
        result
    }

    pub async fn list_jobs(&self) -> Result<Vec<JobPosting>, AtsError> {
        self.with_credential(|api, credential| async move { api.list_jobs(&credential).await })
            .await
    }

    pub async fn get_job(&self, id: JobId) -> Result<JobPosting, AtsError> {
        self.with_credential(|api, credential| async move {
            api.get_job(Some(&credential), id).await
        })
        .await
    }

    pub async fn create_job(&self, draft: &JobDraft) -> Result<JobPosting, AtsError> {
        self.with_credential(|api, credential| async move {
            api.create_job(&credential, draft).await
        })
        .await
    }

    pub async fn update_job(&self, job: &JobPosting) -> Result<JobPosting, AtsError> {
        self.with_credential(|api, credential| async move {
            api.update_job(&credential, job).await
        })
        .await
    }

    pub async fn delete_job(&self, id: JobId) -> Result<(), AtsError> {
        self.with_credential(|api, credential| async move {
            api.delete_job(&credential, id).await
        })
        .await
    }

    pub async fn list_applications(
        &self,
        job: Option<JobId>,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, AtsError> {
        self.with_credential(|api, credential| async move {
            api.list_applications(&credential, job, status).await
        })
        .await
    }

    pub async fn search_applications(&self, query: &str) -> Result<Vec<Application>, AtsError> {
        self.with_credential(|api, credential| async move {
            api.search_applications(&credential, query).await
        })
        .await
    }

    pub async fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, AtsError> {
        self.with_credential(|api, credential| async move {
            api.update_status(&credential, id, status).await
        })
        .await
    }

    pub async fn stats(&self) -> Result<DashboardStats, AtsError> {
        self.with_credential(|api, credential| async move { api.stats(&credential).await })
            .await
    }
}
