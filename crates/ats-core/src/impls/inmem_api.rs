//! InMemoryAtsApi - 開発・テスト用のサーバー実装
//!
//! # 学習ポイント
//! - サーバー契約（AtsApi）をメモリ上で再現
//! - 呼び出し履歴の記録（どのクエリが何回発行されたかを検証できる）
//! - 呼び出しごとの遅延注入（応答の追い越しを再現）と、一回限りの失敗注入

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationSubmission, AtsError, Credential,
    DashboardStats, Identity, JobDraft, JobId, JobPosting, Session, StagedAttachment,
    ValidationError,
};
use crate::ports::AtsApi;

/// One recorded call, with the arguments that matter for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Login { email: String },
    Register { email: String },
    ListJobs,
    GetJob { id: JobId, authenticated: bool },
    CreateJob { title: String },
    UpdateJob { job: JobPosting },
    DeleteJob { id: JobId },
    ListApplications {
        job: Option<JobId>,
        status: Option<ApplicationStatus>,
    },
    SearchApplications { query: String },
    SubmitApplication {
        job: JobId,
        candidate_email: String,
        resume: Option<String>,
    },
    UpdateStatus {
        id: ApplicationId,
        status: ApplicationStatus,
    },
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiCallKind {
    Login,
    Register,
    ListJobs,
    GetJob,
    CreateJob,
    UpdateJob,
    DeleteJob,
    ListApplications,
    SearchApplications,
    SubmitApplication,
    UpdateStatus,
    Stats,
}

impl ApiCall {
    pub fn kind(&self) -> ApiCallKind {
        match self {
            ApiCall::Login { .. } => ApiCallKind::Login,
            ApiCall::Register { .. } => ApiCallKind::Register,
            ApiCall::ListJobs => ApiCallKind::ListJobs,
            ApiCall::GetJob { .. } => ApiCallKind::GetJob,
            ApiCall::CreateJob { .. } => ApiCallKind::CreateJob,
            ApiCall::UpdateJob { .. } => ApiCallKind::UpdateJob,
            ApiCall::DeleteJob { .. } => ApiCallKind::DeleteJob,
            ApiCall::ListApplications { .. } => ApiCallKind::ListApplications,
            ApiCall::SearchApplications { .. } => ApiCallKind::SearchApplications,
            ApiCall::SubmitApplication { .. } => ApiCallKind::SubmitApplication,
            ApiCall::UpdateStatus { .. } => ApiCallKind::UpdateStatus,
            ApiCall::Stats => ApiCallKind::Stats,
        }
    }
}

type LatencyFn = dyn Fn(&ApiCall) -> Duration + Send + Sync;

struct User {
    full_name: String,
    password: String,
}

struct ServerState {
    users: HashMap<String, User>,
    /// token -> email
    tokens: HashMap<String, String>,
    jobs: BTreeMap<JobId, JobPosting>,
    applications: BTreeMap<ApplicationId, Application>,
    next_job_id: i64,
    next_application_id: i64,
    next_token: u64,

    calls: Vec<ApiCall>,
    failures: Vec<(ApiCallKind, AtsError)>,
    latency: Option<Arc<LatencyFn>>,
}

impl ServerState {
    fn new() -> Self {
        Self {
            users: HashMap::new(),
            tokens: HashMap::new(),
            jobs: BTreeMap::new(),
            applications: BTreeMap::new(),
            next_job_id: 1,
            next_application_id: 1,
            next_token: 1,
            calls: Vec::new(),
            failures: Vec::new(),
            latency: None,
        }
    }

    fn issue_session(&mut self, email: &str) -> Session {
        let token = format!("token-{}", self.next_token);
        self.next_token += 1;
        self.tokens.insert(token.clone(), email.to_string());
        let full_name = self
            .users
            .get(email)
            .map(|user| user.full_name.clone())
            .unwrap_or_default();
        Session::new(
            Identity {
                email: email.to_string(),
                display_name: full_name,
            },
            Credential::new(token),
        )
    }

    fn authenticate(&self, credential: &Credential) -> Result<String, AtsError> {
        self.tokens
            .get(credential.as_str())
            .cloned()
            .ok_or_else(|| AtsError::Auth("invalid or expired token".to_string()))
    }

    fn insert_job(&mut self, draft: &JobDraft, created_by: Option<String>) -> JobPosting {
        let id = JobId::new(self.next_job_id);
        self.next_job_id += 1;
        let job = JobPosting {
            id,
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            active: draft.active.unwrap_or(true),
            created_at: Some(chrono::Utc::now().naive_utc()),
            created_by,
            application_count: 0,
        };
        self.jobs.insert(id, job.clone());
        job
    }

    fn insert_application(
        &mut self,
        job_id: JobId,
        submission: &ApplicationSubmission,
        status: ApplicationStatus,
        resume_name: Option<String>,
    ) -> Result<Application, AtsError> {
        let job_title = self
            .jobs
            .get(&job_id)
            .map(|job| job.title.clone())
            .ok_or_else(|| AtsError::NotFound(job_id.describe()))?;
        let id = ApplicationId::new(self.next_application_id);
        self.next_application_id += 1;
        let resume_download_url = resume_name
            .as_ref()
            .map(|name| format!("/api/files/download/{id}_{name}"));
        let application = Application {
            id,
            job_id,
            job_title,
            candidate_name: submission.candidate_name.trim().to_string(),
            candidate_email: submission.candidate_email.trim().to_string(),
            status,
            submitted_at: Some(chrono::Utc::now().naive_utc()),
            resume_original_name: resume_name,
            resume_download_url,
        };
        self.applications.insert(id, application.clone());
        Ok(application)
    }

    fn with_count(&self, job: &JobPosting) -> JobPosting {
        let count = self
            .applications
            .values()
            .filter(|application| application.job_id == job.id)
            .count();
        JobPosting {
            application_count: count as u64,
            ..job.clone()
        }
    }

    /// Newest first.
    fn applications_where(&self, keep: impl Fn(&Application) -> bool) -> Vec<Application> {
        self.applications
            .values()
            .rev()
            .filter(|application| keep(*application))
            .cloned()
            .collect()
    }
}

/// In-memory stand-in for the ATS server.
pub struct InMemoryAtsApi {
    state: Mutex<ServerState>,
}

impl Default for InMemoryAtsApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAtsApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServerState::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================
    // Seeding and inspection (no call is recorded)
    // ========================================

    pub fn seed_user(&self, full_name: &str, email: &str, password: &str) {
        self.state().users.insert(
            email.to_string(),
            User {
                full_name: full_name.to_string(),
                password: password.to_string(),
            },
        );
    }

    pub fn seed_job(&self, title: &str, active: bool) -> JobPosting {
        let draft = JobDraft {
            title: title.to_string(),
            description: None,
            active: Some(active),
        };
        self.state().insert_job(&draft, None)
    }

    pub fn seed_application(
        &self,
        job: JobId,
        candidate_name: &str,
        candidate_email: &str,
        status: ApplicationStatus,
    ) -> Result<Application, AtsError> {
        let submission = ApplicationSubmission {
            candidate_name: candidate_name.to_string(),
            candidate_email: candidate_email.to_string(),
        };
        self.state()
            .insert_application(job, &submission, status, None)
    }

    pub fn application(&self, id: ApplicationId) -> Option<Application> {
        self.state().applications.get(&id).cloned()
    }

    pub fn job(&self, id: JobId) -> Option<JobPosting> {
        let state = self.state();
        state.jobs.get(&id).map(|job| state.with_count(job))
    }

    /// Invalidate every issued token, as if they all expired server-side.
    pub fn expire_tokens(&self) {
        self.state().tokens.clear();
    }

    // ========================================
    // Test hooks
    // ========================================

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    pub fn calls_of(&self, kind: ApiCallKind) -> Vec<ApiCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// The next call of `kind` fails with `error` (after its latency).
    pub fn fail_next(&self, kind: ApiCallKind, error: AtsError) {
        self.state().failures.push((kind, error));
    }

    /// Delay every response by whatever `latency` returns for the call.
    pub fn set_latency(&self, latency: impl Fn(&ApiCall) -> Duration + Send + Sync + 'static) {
        self.state().latency = Some(Arc::new(latency));
    }

    /// Record the call, wait out its latency, then apply any injected failure.
    async fn enter(&self, call: ApiCall) -> Result<(), AtsError> {
        let (delay, failure) = {
            let mut state = self.state();
            let kind = call.kind();
            let delay = state
                .latency
                .as_ref()
                .map(|latency| latency(&call))
                .unwrap_or(Duration::ZERO);
            let failure = state
                .failures
                .iter()
                .position(|(failing, _)| *failing == kind)
                .map(|index| state.failures.remove(index).1);
            state.calls.push(call);
            (delay, failure)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AtsApi for InMemoryAtsApi {
    async fn login(&self, email: &str, password: &str) -> Result<Session, AtsError> {
        self.enter(ApiCall::Login {
            email: email.to_string(),
        })
        .await?;
        let mut state = self.state();
        let valid = state
            .users
            .get(email)
            .is_some_and(|user| user.password == password);
        if !valid {
            return Err(AtsError::Auth("Invalid email or password".to_string()));
        }
        Ok(state.issue_session(email))
    }

    async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AtsError> {
        self.enter(ApiCall::Register {
            email: email.to_string(),
        })
        .await?;
        let mut state = self.state();
        if full_name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AtsError::Auth(
                "Name, email and password are required".to_string(),
            ));
        }
        if state.users.contains_key(email) {
            return Err(AtsError::Auth("Email is already registered".to_string()));
        }
        state.users.insert(
            email.to_string(),
            User {
                full_name: full_name.to_string(),
                password: password.to_string(),
            },
        );
        Ok(state.issue_session(email))
    }

    async fn list_jobs(&self, credential: &Credential) -> Result<Vec<JobPosting>, AtsError> {
        self.enter(ApiCall::ListJobs).await?;
        let state = self.state();
        state.authenticate(credential)?;
        Ok(state
            .jobs
            .values()
            .rev()
            .map(|job| state.with_count(job))
            .collect())
    }

    async fn get_job(
        &self,
        credential: Option<&Credential>,
        id: JobId,
    ) -> Result<JobPosting, AtsError> {
        self.enter(ApiCall::GetJob {
            id,
            authenticated: credential.is_some(),
        })
        .await?;
        let state = self.state();
        if let Some(credential) = credential {
            state.authenticate(credential)?;
        }
        state
            .jobs
            .get(&id)
            .map(|job| state.with_count(job))
            .ok_or_else(|| AtsError::NotFound(id.describe()))
    }

    async fn create_job(
        &self,
        credential: &Credential,
        draft: &JobDraft,
    ) -> Result<JobPosting, AtsError> {
        self.enter(ApiCall::CreateJob {
            title: draft.title.clone(),
        })
        .await?;
        let mut state = self.state();
        let email = state.authenticate(credential)?;
        draft.validate()?;
        let created_by = state.users.get(&email).map(|user| user.full_name.clone());
        Ok(state.insert_job(draft, created_by))
    }

    async fn update_job(
        &self,
        credential: &Credential,
        job: &JobPosting,
    ) -> Result<JobPosting, AtsError> {
        self.enter(ApiCall::UpdateJob { job: job.clone() }).await?;
        let mut state = self.state();
        state.authenticate(credential)?;
        if job.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title").into());
        }
        let Some(stored) = state.jobs.get_mut(&job.id) else {
            return Err(AtsError::NotFound(job.id.describe()));
        };
        stored.title = job.title.clone();
        stored.description = job.description.clone();
        stored.active = job.active;
        let updated = stored.clone();
        Ok(state.with_count(&updated))
    }

    async fn delete_job(&self, credential: &Credential, id: JobId) -> Result<(), AtsError> {
        self.enter(ApiCall::DeleteJob { id }).await?;
        let mut state = self.state();
        state.authenticate(credential)?;
        if state.jobs.remove(&id).is_none() {
            return Err(AtsError::NotFound(id.describe()));
        }
        state
            .applications
            .retain(|_, application| application.job_id != id);
        Ok(())
    }

    async fn list_applications(
        &self,
        credential: &Credential,
        job: Option<JobId>,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, AtsError> {
        self.enter(ApiCall::ListApplications { job, status }).await?;
        let state = self.state();
        state.authenticate(credential)?;
        Ok(state.applications_where(|application| {
            job.is_none_or(|job| application.job_id == job)
                && status.is_none_or(|status| application.status == status)
        }))
    }

    async fn search_applications(
        &self,
        credential: &Credential,
        query: &str,
    ) -> Result<Vec<Application>, AtsError> {
        self.enter(ApiCall::SearchApplications {
            query: query.to_string(),
        })
        .await?;
        let state = self.state();
        state.authenticate(credential)?;
        let needle = query.trim().to_lowercase();
        Ok(state.applications_where(|application| {
            application.candidate_name.to_lowercase().contains(&needle)
                || application.candidate_email.to_lowercase().contains(&needle)
        }))
    }

    async fn submit_application(
        &self,
        job: JobId,
        submission: &ApplicationSubmission,
        resume: Option<&StagedAttachment>,
    ) -> Result<Application, AtsError> {
        let resume_name = resume.map(|attachment| attachment.file().name.clone());
        self.enter(ApiCall::SubmitApplication {
            job,
            candidate_email: submission.candidate_email.clone(),
            resume: resume_name.clone(),
        })
        .await?;
        let mut state = self.state();
        submission.validate()?;
        let accepting = state.jobs.get(&job).is_some_and(|posting| posting.active);
        if !accepting {
            return Err(AtsError::NotFound(job.describe()));
        }
        state.insert_application(job, submission, ApplicationStatus::New, resume_name)
    }

    async fn update_status(
        &self,
        credential: &Credential,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, AtsError> {
        self.enter(ApiCall::UpdateStatus { id, status }).await?;
        let mut state = self.state();
        state.authenticate(credential)?;
        let Some(application) = state.applications.get_mut(&id) else {
            return Err(AtsError::NotFound(id.describe()));
        };
        application.status = status;
        Ok(application.clone())
    }

    async fn stats(&self, credential: &Credential) -> Result<DashboardStats, AtsError> {
        self.enter(ApiCall::Stats).await?;
        let state = self.state();
        state.authenticate(credential)?;

        let mut stats = DashboardStats {
            total_jobs: state.jobs.len() as u64,
            total_applications: state.applications.len() as u64,
            ..DashboardStats::default()
        };
        for status in ApplicationStatus::ALL {
            stats.applications_by_status.insert(status, 0);
        }
        for application in state.applications.values() {
            *stats
                .applications_by_status
                .entry(application.status)
                .or_default() += 1;
            *stats
                .recent_applications_by_job
                .entry(application.job_title.clone())
                .or_default() += 1;
        }
        Ok(stats)
    }
}
