//! Job postings as the server reports them, and the draft sent when creating one.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::ids::JobId;
use super::record::Record;

/// A job posting.
///
/// `active == false` hides the posting from public discovery but not from
/// the recruiter's management views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, rename = "createdByName")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub application_count: u64,
}

impl JobPosting {
    /// The full record with `active` flipped. Updates always send the whole record.
    pub fn with_active_toggled(&self) -> Self {
        Self {
            active: !self.active,
            ..self.clone()
        }
    }

    /// The full record with the draft's editable fields applied.
    pub fn with_draft(&self, draft: &JobDraft) -> Self {
        Self {
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            active: draft.active.unwrap_or(self.active),
            ..self.clone()
        }
    }
}

impl Record for JobPosting {
    type Key = JobId;

    fn key(&self) -> JobId {
        self.id
    }
}

/// Editable fields of a job posting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl JobDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title"));
        }
        Ok(())
    }
}
