//! AtsApi port - サーバー API（外部コラボレーター）
//!
//! サーバーが全ての永続データの正本です。このポートは HTTP/JSON 契約をそのまま写した
//! 抽象化で、トランスポートの詳細（タイムアウトなど）は実装側の責務です。
//!
//! # 実装
//! - `HttpAtsApi`: reqwest による本番用
//! - `InMemoryAtsApi`: 開発・テスト用（遅延と失敗を注入可能）

use async_trait::async_trait;

use crate::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationSubmission, AtsError, Credential,
    DashboardStats, JobDraft, JobId, JobPosting, Session, StagedAttachment,
};

/// Server contract consumed by the client core.
///
/// Protected operations take the credential explicitly; the port never
/// looks up ambient session state.
#[async_trait]
pub trait AtsApi: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, email: &str, password: &str) -> Result<Session, AtsError>;

    /// `POST /auth/register`
    async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AtsError>;

    /// `GET /jobs/all`, every posting with its application count.
    async fn list_jobs(&self, credential: &Credential) -> Result<Vec<JobPosting>, AtsError>;

    /// `GET /jobs/:id`. Public when called without a credential.
    async fn get_job(
        &self,
        credential: Option<&Credential>,
        id: JobId,
    ) -> Result<JobPosting, AtsError>;

    /// `POST /jobs`
    async fn create_job(
        &self,
        credential: &Credential,
        draft: &JobDraft,
    ) -> Result<JobPosting, AtsError>;

    /// `PUT /jobs/:id` with the full record.
    async fn update_job(
        &self,
        credential: &Credential,
        job: &JobPosting,
    ) -> Result<JobPosting, AtsError>;

    /// `DELETE /jobs/:id`
    async fn delete_job(&self, credential: &Credential, id: JobId) -> Result<(), AtsError>;

    /// `GET /applications?jobId=&status=`; no filters means all applications.
    async fn list_applications(
        &self,
        credential: &Credential,
        job: Option<JobId>,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, AtsError>;

    /// `GET /applications/search?query=`, free text over candidate name and email.
    async fn search_applications(
        &self,
        credential: &Credential,
        query: &str,
    ) -> Result<Vec<Application>, AtsError>;

    /// `POST /jobs/:id/apply` as multipart. Public.
    async fn submit_application(
        &self,
        job: JobId,
        submission: &ApplicationSubmission,
        resume: Option<&StagedAttachment>,
    ) -> Result<Application, AtsError>;

    /// `PUT /applications/:id/status`
    async fn update_status(
        &self,
        credential: &Credential,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, AtsError>;

    /// `GET /applications/stats`
    async fn stats(&self, credential: &Credential) -> Result<DashboardStats, AtsError>;
}
