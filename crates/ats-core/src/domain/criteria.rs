//! Query criteria and the precedence rule that turns them into one effective query.

use std::fmt;

use super::ids::JobId;
use super::status::ApplicationStatus;

/// Raw search/filter input as the user currently holds it.
///
/// Free text and structured filters may both be set at once; only one of
/// them ever takes effect (see [`QueryCriteria::effective`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryCriteria {
    pub free_text: String,
    pub job_filter: Option<JobId>,
    pub status_filter: Option<ApplicationStatus>,
}

impl QueryCriteria {
    pub fn search_text(&self) -> Option<&str> {
        let text = self.free_text.trim();
        (!text.is_empty()).then_some(text)
    }

    pub fn has_filters(&self) -> bool {
        self.job_filter.is_some() || self.status_filter.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.search_text().is_none() && !self.has_filters()
    }

    /// Non-empty free text wins and suppresses the filters; otherwise the
    /// filters apply; otherwise the unfiltered list.
    pub fn effective(&self) -> EffectiveQuery {
        if let Some(text) = self.search_text() {
            return EffectiveQuery::Search(text.to_string());
        }
        if self.has_filters() {
            return EffectiveQuery::Filtered {
                job: self.job_filter,
                status: self.status_filter,
            };
        }
        EffectiveQuery::All
    }
}

/// The query actually sent to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectiveQuery {
    /// `GET /applications`
    All,
    /// `GET /applications?jobId=&status=`
    Filtered {
        job: Option<JobId>,
        status: Option<ApplicationStatus>,
    },
    /// `GET /applications/search?query=`
    Search(String),
}

impl EffectiveQuery {
    /// Query-string pairs in the order the server expects them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            EffectiveQuery::All => Vec::new(),
            EffectiveQuery::Filtered { job, status } => {
                let mut pairs = Vec::new();
                if let Some(job) = job {
                    pairs.push(("jobId", job.to_string()));
                }
                if let Some(status) = status {
                    pairs.push(("status", status.as_str().to_string()));
                }
                pairs
            }
            EffectiveQuery::Search(text) => vec![("query", text.clone())],
        }
    }
}

impl fmt::Display for EffectiveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectiveQuery::All => f.write_str("all"),
            EffectiveQuery::Search(text) => write!(f, "search '{text}'"),
            EffectiveQuery::Filtered { .. } => {
                let pairs = self
                    .query_pairs()
                    .into_iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect::<Vec<_>>();
                write!(f, "filter {}", pairs.join("&"))
            }
        }
    }
}
