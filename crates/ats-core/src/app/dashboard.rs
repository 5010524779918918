//! Dashboard: totals, per-status counts and the most recent applications.

use crate::app::authed::AuthedApi;
use crate::domain::{Application, AtsError, DashboardStats};

/// How many applications the dashboard lists.
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent: Vec<Application>,
}

impl Dashboard {
    /// Fetch stats and the application list concurrently.
    pub async fn load(api: &AuthedApi) -> Result<Self, AtsError> {
        let (stats, applications) =
            tokio::try_join!(api.stats(), api.list_applications(None, None))?;
        Ok(Self {
            stats,
            recent: applications.into_iter().take(RECENT_LIMIT).collect(),
        })
    }
}
