//! ClientBuilder - クライアントの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 設定値は build() 時に検証する
//! - 必須の port（API, SessionStorage）が揃っていなければ、欠けているものを全て列挙して BuildError を返す
//! - 通知・確認は省略可能（既定は TracingNoticeSink / 常に拒否する確認）

use std::sync::Arc;

use crate::app::application_form::ApplicationForm;
use crate::app::authed::AuthedApi;
use crate::app::coordinator::QueryCoordinator;
use crate::app::dashboard::Dashboard;
use crate::app::job_board::JobBoard;
use crate::app::job_detail::JobDetail;
use crate::app::route_guard::{GuardDecision, can_enter};
use crate::app::session_store::SessionStore;
use crate::app::sources::{ApplicationSource, JobSource};
use crate::app::status_updater::StatusUpdater;
use crate::config::{ClientConfig, ConfigError};
use crate::domain::{AtsError, JobId, TransitionPolicy};
use crate::impls::{AutoConfirm, FileSessionStorage, HttpAtsApi, TracingNoticeSink};
use crate::ports::{AtsApi, Confirm, NoticeSink, SessionStorage, StorageError};

/// ClientBuilder は AtsClient を構築
///
/// # 使用例
/// ```ignore
/// let client = ClientBuilder::new(config)
///     .api(Arc::new(HttpAtsApi::new(url, timeout)?))
///     .storage(Arc::new(FileSessionStorage::default_location()?))
///     .build()?;
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    api: Option<Arc<dyn AtsApi>>,
    storage: Option<Arc<dyn SessionStorage>>,
    notices: Option<Arc<dyn NoticeSink>>,
    confirm: Option<Arc<dyn Confirm>>,
    transitions: TransitionPolicy,
}

/// BuildError はクライアント構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing ports: {0:?}. These must be provided before build().")]
    MissingPorts(Vec<&'static str>),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot create HTTP client: {0}")]
    Http(AtsError),

    #[error("cannot locate session storage: {0}")]
    Storage(#[from] StorageError),
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            api: None,
            storage: None,
            notices: None,
            confirm: None,
            transitions: TransitionPolicy::default(),
        }
    }

    /// Wire the production ports from `config`: HTTP API and file storage.
    pub fn production(config: ClientConfig) -> Result<Self, BuildError> {
        let api = HttpAtsApi::new(config.api_base_url.clone(), config.request_timeout())
            .map_err(BuildError::Http)?;
        let storage = match &config.storage_dir {
            Some(dir) => FileSessionStorage::new(dir),
            None => FileSessionStorage::default_location()?,
        };
        Ok(Self::new(config)
            .api(Arc::new(api))
            .storage(Arc::new(storage)))
    }

    pub fn api(mut self, api: Arc<dyn AtsApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn notices(mut self, notices: Arc<dyn NoticeSink>) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = Some(confirm);
        self
    }

    pub fn transitions(mut self, transitions: TransitionPolicy) -> Self {
        self.transitions = transitions;
        self
    }

    /// Validate and wire everything. Restores a persisted session if there is one.
    pub fn build(self) -> Result<AtsClient, BuildError> {
        self.config.validate()?;
        let (api, storage) = match (self.api, self.storage) {
            (Some(api), Some(storage)) => (api, storage),
            (api, storage) => {
                let mut missing = Vec::new();
                if api.is_none() {
                    missing.push("api");
                }
                if storage.is_none() {
                    missing.push("storage");
                }
                return Err(BuildError::MissingPorts(missing));
            }
        };

        let session = SessionStore::new(Arc::clone(&api), storage);
        session.restore();
        Ok(AtsClient {
            authed: AuthedApi::new(Arc::clone(&api), session.clone()),
            api,
            session,
            notices: self
                .notices
                .unwrap_or_else(|| Arc::new(TracingNoticeSink)),
            confirm: self.confirm.unwrap_or_else(|| Arc::new(AutoConfirm(false))),
            transitions: self.transitions,
            config: self.config,
        })
    }
}

/// Everything a front end needs, wired from one config.
pub struct AtsClient {
    config: ClientConfig,
    api: Arc<dyn AtsApi>,
    session: SessionStore,
    authed: AuthedApi,
    notices: Arc<dyn NoticeSink>,
    confirm: Arc<dyn Confirm>,
    transitions: TransitionPolicy,
}

impl AtsClient {
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Protected calls, with token-expiry handling.
    pub fn authed(&self) -> &AuthedApi {
        &self.authed
    }

    /// Evaluate the route guard against the current session.
    pub fn guard(&self, path: &str) -> GuardDecision {
        can_enter(self.session.current().as_ref(), path, &self.config.login_path)
    }

    /// The applications list with optimistic status updates.
    pub fn applications(&self) -> StatusUpdater<ApplicationSource> {
        self.status_updater(ApplicationSource::new(self.authed.clone()))
    }

    pub fn job_board(&self) -> JobBoard {
        JobBoard::new(
            self.authed.clone(),
            QueryCoordinator::new(
                JobSource::new(self.authed.clone()),
                self.config.debounce(),
                Arc::clone(&self.notices),
            ),
            Arc::clone(&self.confirm),
            Arc::clone(&self.notices),
        )
    }

    pub async fn job_detail(&self, id: JobId) -> Result<JobDetail, AtsError> {
        let updater = self.status_updater(ApplicationSource::for_job(self.authed.clone(), id));
        JobDetail::open(&self.authed, id, updater).await
    }

    pub async fn application_form(&self, job: JobId) -> Result<ApplicationForm, AtsError> {
        ApplicationForm::open(
            Arc::clone(&self.api),
            Arc::clone(&self.notices),
            job,
            self.config.attachment_policy(),
        )
        .await
    }

    pub async fn dashboard(&self) -> Result<Dashboard, AtsError> {
        Dashboard::load(&self.authed).await
    }

    fn status_updater(&self, source: ApplicationSource) -> StatusUpdater<ApplicationSource> {
        StatusUpdater::new(
            self.authed.clone(),
            QueryCoordinator::new(source, self.config.debounce(), Arc::clone(&self.notices)),
            self.transitions.clone(),
            self.config.on_status_failure,
            Arc::clone(&self.notices),
        )
    }
}
