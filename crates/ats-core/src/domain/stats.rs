use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::status::ApplicationStatus;

/// Totals shown on the recruiter dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_jobs: u64,
    pub total_applications: u64,
    #[serde(default)]
    pub applications_by_status: BTreeMap<ApplicationStatus, u64>,
    /// Job title -> number of applications.
    #[serde(default)]
    pub recent_applications_by_job: BTreeMap<String, u64>,
}

impl DashboardStats {
    pub fn count(&self, status: ApplicationStatus) -> u64 {
        self.applications_by_status
            .get(&status)
            .copied()
            .unwrap_or(0)
    }
}
