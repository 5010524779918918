//! Route Guard - 画面遷移の可否を判定する純粋関数
//!
//! 状態を持たず、遷移のたびに Session の有無だけを見て判定します。

use crate::domain::{JobId, Session};

/// Every view the client knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    /// Public job page.
    Careers(JobId),
    /// Public application form.
    Apply(JobId),
    Dashboard,
    Jobs,
    NewJob,
    JobDetail(JobId),
    EditJob(JobId),
    Applications,
    /// Anything else; falls back to the dashboard, so it is protected too.
    Unknown(String),
}

impl Route {
    /// Parse a path. Query strings, fragments and a trailing slash are ignored.
    pub fn parse(path: &str) -> Self {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        fn id(raw: &str) -> Option<JobId> {
            raw.parse().ok()
        }

        let route = match segments.as_slice() {
            [] | ["dashboard"] => Some(Route::Dashboard),
            ["login"] => Some(Route::Login),
            ["register"] => Some(Route::Register),
            ["careers", raw] => id(raw).map(Route::Careers),
            ["careers", raw, "apply"] => id(raw).map(Route::Apply),
            ["jobs"] => Some(Route::Jobs),
            ["jobs", "new"] => Some(Route::NewJob),
            ["jobs", raw] => id(raw).map(Route::JobDetail),
            ["jobs", raw, "edit"] => id(raw).map(Route::EditJob),
            ["applications"] => Some(Route::Applications),
            _ => None,
        };
        route.unwrap_or_else(|| Route::Unknown(path.to_string()))
    }

    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Route::Login | Route::Register | Route::Careers(_) | Route::Apply(_)
        )
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Careers(id) => format!("/careers/{id}"),
            Route::Apply(id) => format!("/careers/{id}/apply"),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Jobs => "/jobs".to_string(),
            Route::NewJob => "/jobs/new".to_string(),
            Route::JobDetail(id) => format!("/jobs/{id}"),
            Route::EditJob(id) => format!("/jobs/{id}/edit"),
            Route::Applications => "/applications".to_string(),
            Route::Unknown(path) => path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Decide whether `requested_path` may render for `session`.
pub fn can_enter(session: Option<&Session>, requested_path: &str, login_path: &str) -> GuardDecision {
    let route = Route::parse(requested_path);
    if route.is_public() || session.is_some() {
        GuardDecision::Allow
    } else {
        tracing::debug!(path = requested_path, "no session, redirecting to login");
        GuardDecision::Redirect(login_path.to_string())
    }
}
