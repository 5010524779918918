//! Candidate applications.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::ids::{ApplicationId, JobId};
use super::record::Record;
use super::status::ApplicationStatus;

/// An application submitted by a candidate.
///
/// Created by an unauthenticated submission; afterwards only its status changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    #[serde(default)]
    pub job_title: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub submitted_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub resume_original_name: Option<String>,
    #[serde(default)]
    pub resume_download_url: Option<String>,
}

impl Application {
    pub fn resume(&self) -> Option<ResumeRef> {
        let download_url = self.resume_download_url.clone()?;
        Some(ResumeRef {
            original_name: self.resume_original_name.clone(),
            download_url,
        })
    }
}

impl Record for Application {
    type Key = ApplicationId;

    fn key(&self) -> ApplicationId {
        self.id
    }
}

/// Where an application's resume can be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeRef {
    pub original_name: Option<String>,
    /// Server-relative path, e.g. `/api/files/download/abc_cv.pdf`.
    pub download_url: String,
}

impl ResumeRef {
    /// Absolute link. The download path already carries `/api`, so it is
    /// joined onto the API base URL with its trailing `/api` stripped.
    pub fn absolute_url(&self, api_base_url: &str) -> String {
        let base = api_base_url.trim_end_matches('/');
        let base = base.strip_suffix("/api").unwrap_or(base);
        format!("{base}{}", self.download_url)
    }

    pub fn display_name(&self) -> &str {
        self.original_name.as_deref().unwrap_or("Download")
    }
}

/// Text fields of a public application form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationSubmission {
    pub candidate_name: String,
    pub candidate_email: String,
}

impl ApplicationSubmission {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.candidate_name.trim().is_empty() {
            return Err(ValidationError::MissingField("candidateName"));
        }
        if self.candidate_email.trim().is_empty() {
            return Err(ValidationError::MissingField("candidateEmail"));
        }
        Ok(())
    }
}
