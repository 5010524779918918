//! Public job view and application form (no session needed).

use std::sync::Arc;

use crate::app::attachment::{AttachmentPolicy, AttachmentSlot};
use crate::domain::{
    Application, ApplicationSubmission, AtsError, CandidateFile, JobId, JobPosting,
    StagedAttachment, ValidationError,
};
use crate::ports::{AtsApi, Notice, NoticeSink};

/// Fetch a posting on the public path. Inactive postings read as not found.
pub async fn open_public_job(api: &dyn AtsApi, id: JobId) -> Result<JobPosting, AtsError> {
    let job = api.get_job(None, id).await?;
    if !job.active {
        return Err(AtsError::NotFound(
            "this position is no longer accepting applications".to_string(),
        ));
    }
    Ok(job)
}

pub struct ApplicationForm {
    api: Arc<dyn AtsApi>,
    notices: Arc<dyn NoticeSink>,
    job: JobPosting,
    submission: ApplicationSubmission,
    resume: AttachmentSlot,
}

impl ApplicationForm {
    pub async fn open(
        api: Arc<dyn AtsApi>,
        notices: Arc<dyn NoticeSink>,
        job: JobId,
        policy: AttachmentPolicy,
    ) -> Result<Self, AtsError> {
        let job = open_public_job(api.as_ref(), job).await?;
        Ok(Self {
            api,
            notices,
            job,
            submission: ApplicationSubmission::default(),
            resume: AttachmentSlot::new(policy),
        })
    }

    pub fn job(&self) -> &JobPosting {
        &self.job
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.submission.candidate_name = name.into();
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.submission.candidate_email = email.into();
    }

    /// Stage a resume. A rejected file leaves the previous one in place.
    pub fn select_resume(&mut self, file: &CandidateFile) -> Result<&StagedAttachment, ValidationError> {
        self.resume.select(file)
    }

    pub fn resume(&self) -> Option<&StagedAttachment> {
        self.resume.staged()
    }

    pub fn clear_resume(&mut self) {
        self.resume.clear();
    }

    /// Send the application. The staged resume is discarded only on success.
    pub async fn submit(&mut self) -> Result<Application, AtsError> {
        self.submission.validate()?;
        let result = self
            .api
            .submit_application(self.job.id, &self.submission, self.resume.staged())
            .await;
        match result {
            Ok(application) => {
                tracing::info!(job = %self.job.id, application = %application.id, "application submitted");
                self.resume.clear();
                self.notices
                    .notify(Notice::info("Application submitted successfully"));
                Ok(application)
            }
            Err(e) => {
                tracing::warn!(job = %self.job.id, error = %e, "application submit failed");
                self.notices
                    .notify(Notice::error(format!("Failed to submit application: {e}")));
                Err(e)
            }
        }
    }
}
