//! List sources for the query coordinator.

use async_trait::async_trait;

use crate::app::authed::AuthedApi;
use crate::app::coordinator::ListSource;
use crate::domain::{Application, AtsError, EffectiveQuery, JobId, JobPosting};

/// Applications, optionally scoped to one job (the job detail view).
pub struct ApplicationSource {
    api: AuthedApi,
    scope: Option<JobId>,
}

impl ApplicationSource {
    pub fn new(api: AuthedApi) -> Self {
        Self { api, scope: None }
    }

    pub fn for_job(api: AuthedApi, job: JobId) -> Self {
        Self {
            api,
            scope: Some(job),
        }
    }
}

#[async_trait]
impl ListSource for ApplicationSource {
    type Item = Application;

    fn label(&self) -> &'static str {
        "applications"
    }

    async fn fetch(&self, query: &EffectiveQuery) -> Result<Vec<Application>, AtsError> {
        match query {
            EffectiveQuery::All => self.api.list_applications(self.scope, None).await,
            EffectiveQuery::Filtered { job, status } => match (self.scope, *job) {
                // a filter for another job matches nothing inside the scope
                (Some(scope), Some(job)) if scope != job => Ok(Vec::new()),
                (scope, job) => self.api.list_applications(scope.or(job), *status).await,
            },
            EffectiveQuery::Search(text) => {
                let found = self.api.search_applications(text).await?;
                Ok(match self.scope {
                    // search is global on the server
                    Some(job) => found
                        .into_iter()
                        .filter(|application| application.job_id == job)
                        .collect(),
                    None => found,
                })
            }
        }
    }
}

/// All postings, for the recruiter's job board. Criteria do not apply.
pub struct JobSource {
    api: AuthedApi,
}

impl JobSource {
    pub fn new(api: AuthedApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ListSource for JobSource {
    type Item = JobPosting;

    fn label(&self) -> &'static str {
        "jobs"
    }

    async fn fetch(&self, _query: &EffectiveQuery) -> Result<Vec<JobPosting>, AtsError> {
        self.api.list_jobs().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::app::session_store::SessionStore;
    use crate::domain::ApplicationStatus;
    use crate::impls::{ApiCall, InMemoryAtsApi, InMemorySessionStorage};

    async fn authed() -> (Arc<InMemoryAtsApi>, AuthedApi) {
        let api = Arc::new(InMemoryAtsApi::new());
        api.seed_user("Rita", "rita@example.com", "pw");
        let session = SessionStore::new(api.clone(), Arc::new(InMemorySessionStorage::new()));
        session.login("rita@example.com", "pw").await.unwrap();
        api.clear_calls();
        (api.clone(), AuthedApi::new(api, session))
    }

    #[tokio::test]
    async fn scoped_source_keeps_its_job() {
        let (api, authed) = authed().await;
        let backend = api.seed_job("Backend Engineer", true).id;
        let design = api.seed_job("Product Designer", true).id;
        api.seed_application(backend, "Anna", "anna@example.com", ApplicationStatus::New)
            .unwrap();
        api.seed_application(design, "Anneli", "anneli@example.com", ApplicationStatus::New)
            .unwrap();

        let source = ApplicationSource::for_job(authed, backend);
        let all = source.fetch(&EffectiveQuery::All).await.unwrap();
        assert_eq!(all.len(), 1);

        let found = source
            .fetch(&EffectiveQuery::Search("ann".into()))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].job_id, backend);

        assert_eq!(
            api.calls()[0],
            ApiCall::ListApplications {
                job: Some(backend),
                status: None
            }
        );
    }

    #[tokio::test]
    async fn job_filter_cannot_leave_the_scope() {
        let (api, authed) = authed().await;
        let backend = api.seed_job("Backend Engineer", true).id;
        let design = api.seed_job("Product Designer", true).id;
        api.seed_application(backend, "Anna", "anna@example.com", ApplicationStatus::New)
            .unwrap();
        api.seed_application(design, "Bob", "bob@example.com", ApplicationStatus::New)
            .unwrap();
        let source = ApplicationSource::for_job(authed, backend);

        let other = source
            .fetch(&EffectiveQuery::Filtered {
                job: Some(design),
                status: None,
            })
            .await
            .unwrap();
        assert!(other.is_empty());
        assert!(api.calls().is_empty());

        let same = source
            .fetch(&EffectiveQuery::Filtered {
                job: Some(backend),
                status: Some(ApplicationStatus::New),
            })
            .await
            .unwrap();
        assert_eq!(same.len(), 1);
        assert_eq!(same[0].candidate_name, "Anna");
    }

    #[tokio::test]
    async fn job_source_ignores_criteria() {
        let (api, authed) = authed().await;
        api.seed_job("Backend Engineer", false);
        let jobs = JobSource::new(authed)
            .fetch(&EffectiveQuery::Search("x".into()))
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(!jobs[0].active);
    }
}
