//! Recruiter view of one posting and the applications it received.

use crate::app::authed::AuthedApi;
use crate::app::coordinator::{ListView, QueryCoordinator};
use crate::app::sources::ApplicationSource;
use crate::app::status_updater::{PendingUpdate, StatusUpdater};
use crate::domain::{Application, ApplicationId, ApplicationStatus, AtsError, JobId, JobPosting};

pub struct JobDetail {
    job: JobPosting,
    applications: StatusUpdater<ApplicationSource>,
}

impl JobDetail {
    /// Fetch the posting while its application list loads in the background.
    ///
    /// `updater` must wrap a coordinator over `ApplicationSource::for_job(.., id)`.
    pub async fn open(
        api: &AuthedApi,
        id: JobId,
        updater: StatusUpdater<ApplicationSource>,
    ) -> Result<Self, AtsError> {
        updater.list().refresh();
        let job = api.get_job(id).await?;
        updater.list().settled().await;
        Ok(Self {
            job,
            applications: updater,
        })
    }

    pub fn job(&self) -> &JobPosting {
        &self.job
    }

    pub fn applications(&self) -> ListView<Application> {
        self.applications.list().view()
    }

    pub fn list(&self) -> &QueryCoordinator<ApplicationSource> {
        self.applications.list()
    }

    pub fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<PendingUpdate, AtsError> {
        self.applications.update_status(id, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::app::session_store::SessionStore;
    use crate::app::status_updater::StatusFailurePolicy;
    use crate::domain::TransitionPolicy;
    use crate::impls::{ApiCall, CollectingNoticeSink, InMemoryAtsApi, InMemorySessionStorage};

    #[tokio::test(start_paused = true)]
    async fn loads_job_and_applications_concurrently() {
        let api = Arc::new(InMemoryAtsApi::new());
        api.seed_user("Rita", "rita@example.com", "pw");
        let backend = api.seed_job("Backend Engineer", true).id;
        let other = api.seed_job("Designer", true).id;
        api.seed_application(backend, "Anna", "anna@example.com", ApplicationStatus::New)
            .unwrap();
        api.seed_application(other, "Bob", "bob@example.com", ApplicationStatus::New)
            .unwrap();
        let session = SessionStore::new(api.clone(), Arc::new(InMemorySessionStorage::new()));
        session.login("rita@example.com", "pw").await.unwrap();
        api.clear_calls();
        api.set_latency(|_| Duration::from_millis(100));

        let authed = AuthedApi::new(api.clone(), session);
        let notices = Arc::new(CollectingNoticeSink::new());
        let updater = StatusUpdater::new(
            authed.clone(),
            QueryCoordinator::new(
                ApplicationSource::for_job(authed.clone(), backend),
                Duration::from_millis(300),
                notices.clone(),
            ),
            TransitionPolicy::default(),
            StatusFailurePolicy::default(),
            notices,
        );

        let started = tokio::time::Instant::now();
        let detail = JobDetail::open(&authed, backend, updater).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(200));

        assert_eq!(detail.job().title, "Backend Engineer");
        assert_eq!(detail.job().application_count, 1);
        let view = detail.applications();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].candidate_name, "Anna");
        assert!(api.calls().contains(&ApiCall::ListApplications {
            job: Some(backend),
            status: None
        }));

        let id = view.items[0].id;
        detail
            .update_status(id, ApplicationStatus::Interviewed)
            .unwrap();
        assert_eq!(
            detail.list().get(id).map(|application| application.status),
            Some(ApplicationStatus::Interviewed)
        );
    }
}
