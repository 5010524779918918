//! HTTP implementation of the ATS API on top of reqwest.
//!
//! Handles the bearer token, JSON bodies and the multipart application upload,
//! and maps HTTP statuses onto the client error taxonomy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationSubmission, AtsError, Credential,
    DashboardStats, Identity, JobDraft, JobId, JobPosting, Session, StagedAttachment,
};
use crate::ports::AtsApi;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    full_name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    email: String,
    full_name: String,
}

impl From<AuthResponse> for Session {
    fn from(response: AuthResponse) -> Self {
        Session::new(
            Identity {
                email: response.email,
                display_name: response.full_name,
            },
            Credential::new(response.token),
        )
    }
}

#[derive(Debug, Serialize)]
struct StatusUpdateRequest {
    status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    /// The server's text when it says the record does not exist.
    ///
    /// Some backends answer a missing id with 500 and `"Job not found"` in
    /// `message`, with the generic reason in `error`.
    fn missing_record(&self) -> Option<&str> {
        [self.message.as_deref(), self.error.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|text| {
                let text = text.to_ascii_lowercase();
                text.ends_with("not found") || text.contains("no longer accepting applications")
            })
    }
}

/// Which class of endpoint a response came from; decides how 4xx is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    /// `/auth/*`: every rejection is an authentication failure.
    Auth,
    /// Anything else.
    Resource,
}

impl From<reqwest::Error> for AtsError {
    fn from(error: reqwest::Error) -> Self {
        AtsError::Transient(error.to_string())
    }
}

/// Map a non-success response onto the error taxonomy.
fn error_for_status(status: StatusCode, body: &str, endpoint: Endpoint, what: &str) -> AtsError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let missing = parsed
        .as_ref()
        .and_then(ErrorBody::missing_record)
        .map(str::to_string);
    let detail = parsed
        .and_then(|body| body.error.or(body.message))
        .filter(|detail| !detail.trim().is_empty());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AtsError::Auth(
            detail.unwrap_or_else(|| "session is no longer valid".to_string()),
        ),
        _ if endpoint == Endpoint::Auth && status.is_client_error() => {
            AtsError::Auth(detail.unwrap_or_else(|| format!("rejected ({status})")))
        }
        _ => match missing {
            Some(missing) => AtsError::NotFound(missing),
            None if status == StatusCode::NOT_FOUND => {
                AtsError::NotFound(detail.unwrap_or_else(|| what.to_string()))
            }
            None => AtsError::Transient(match detail {
                Some(detail) => format!("{what}: {detail} ({status})"),
                None => format!("{what}: {status}"),
            }),
        },
    }
}

pub struct HttpAtsApi {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpAtsApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AtsError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        credential: Option<&Credential>,
    ) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.http_client.request(method, url);
        match credential {
            Some(credential) => request.bearer_auth(credential.as_str()),
            None => request,
        }
    }

    async fn send_raw(
        &self,
        request: RequestBuilder,
        endpoint: Endpoint,
        what: &str,
    ) -> Result<reqwest::Response, AtsError> {
        let start = std::time::Instant::now();
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(what, %status, elapsed = ?start.elapsed(), "response received");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, &body, endpoint, what))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: Endpoint,
        what: &str,
    ) -> Result<T, AtsError> {
        let response = self.send_raw(request, endpoint, what).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AtsError::Transient(format!("{what}: unexpected response body: {e}")))
    }
}

#[async_trait]
impl AtsApi for HttpAtsApi {
    async fn login(&self, email: &str, password: &str) -> Result<Session, AtsError> {
        let request = self
            .request(Method::POST, "/auth/login", None)
            .json(&LoginRequest { email, password });
        let response: AuthResponse = self.send_json(request, Endpoint::Auth, "login").await?;
        Ok(response.into())
    }

    async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AtsError> {
        let request = self
            .request(Method::POST, "/auth/register", None)
            .json(&RegisterRequest {
                full_name,
                email,
                password,
            });
        let response: AuthResponse = self
            .send_json(request, Endpoint::Auth, "register")
            .await?;
        Ok(response.into())
    }

    async fn list_jobs(&self, credential: &Credential) -> Result<Vec<JobPosting>, AtsError> {
        let request = self.request(Method::GET, "/jobs/all", Some(credential));
        self.send_json(request, Endpoint::Resource, "jobs").await
    }

    async fn get_job(
        &self,
        credential: Option<&Credential>,
        id: JobId,
    ) -> Result<JobPosting, AtsError> {
        let request = self.request(Method::GET, &format!("/jobs/{id}"), credential);
        self.send_json(request, Endpoint::Resource, &id.describe())
            .await
    }

    async fn create_job(
        &self,
        credential: &Credential,
        draft: &JobDraft,
    ) -> Result<JobPosting, AtsError> {
        let request = self
            .request(Method::POST, "/jobs", Some(credential))
            .json(draft);
        self.send_json(request, Endpoint::Resource, "create job")
            .await
    }

    async fn update_job(
        &self,
        credential: &Credential,
        job: &JobPosting,
    ) -> Result<JobPosting, AtsError> {
        let request = self
            .request(Method::PUT, &format!("/jobs/{}", job.id), Some(credential))
            .json(job);
        self.send_json(request, Endpoint::Resource, &job.id.describe())
            .await
    }

    async fn delete_job(&self, credential: &Credential, id: JobId) -> Result<(), AtsError> {
        let request = self.request(Method::DELETE, &format!("/jobs/{id}"), Some(credential));
        self.send_raw(request, Endpoint::Resource, &id.describe())
            .await?;
        Ok(())
    }

    async fn list_applications(
        &self,
        credential: &Credential,
        job: Option<JobId>,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, AtsError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(job) = job {
            query.push(("jobId", job.to_string()));
        }
        if let Some(status) = status {
            query.push(("status", status.as_str().to_string()));
        }
        let request = self
            .request(Method::GET, "/applications", Some(credential))
            .query(&query);
        self.send_json(request, Endpoint::Resource, "applications")
            .await
    }

    async fn search_applications(
        &self,
        credential: &Credential,
        query: &str,
    ) -> Result<Vec<Application>, AtsError> {
        let request = self
            .request(Method::GET, "/applications/search", Some(credential))
            .query(&[("query", query)]);
        self.send_json(request, Endpoint::Resource, "application search")
            .await
    }

    async fn submit_application(
        &self,
        job: JobId,
        submission: &ApplicationSubmission,
        resume: Option<&StagedAttachment>,
    ) -> Result<Application, AtsError> {
        let mut form = reqwest::multipart::Form::new()
            .text("candidateName", submission.candidate_name.clone())
            .text("candidateEmail", submission.candidate_email.clone());
        if let Some(resume) = resume {
            let bytes = tokio::fs::read(&resume.file().path).await.map_err(|e| {
                AtsError::Transient(format!("cannot read {}: {e}", resume.file().name))
            })?;
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(resume.file().name.clone())
                .mime_str(resume.mime_type())?;
            form = form.part("resume", part);
        }
        let request = self
            .request(Method::POST, &format!("/jobs/{job}/apply"), None)
            .multipart(form);
        self.send_json(request, Endpoint::Resource, &job.describe())
            .await
    }

    async fn update_status(
        &self,
        credential: &Credential,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, AtsError> {
        let request = self
            .request(
                Method::PUT,
                &format!("/applications/{id}/status"),
                Some(credential),
            )
            .json(&StatusUpdateRequest { status });
        self.send_json(request, Endpoint::Resource, &id.describe())
            .await
    }

    async fn stats(&self, credential: &Credential) -> Result<DashboardStats, AtsError> {
        let request = self.request(Method::GET, "/applications/stats", Some(credential));
        self.send_json(request, Endpoint::Resource, "stats").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::UNAUTHORIZED, Endpoint::Resource, "")]
    #[case(StatusCode::FORBIDDEN, Endpoint::Resource, "")]
    #[case(StatusCode::BAD_REQUEST, Endpoint::Auth, r#"{"error":"Email already exists"}"#)]
    #[case(StatusCode::CONFLICT, Endpoint::Auth, "")]
    fn auth_rejections_map_to_auth_errors(
        #[case] status: StatusCode,
        #[case] endpoint: Endpoint,
        #[case] body: &str,
    ) {
        assert!(error_for_status(status, body, endpoint, "x").is_auth());
    }

    #[test]
    fn server_error_detail_is_kept() {
        let err = error_for_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Email already exists"}"#,
            Endpoint::Auth,
            "register",
        );
        assert_eq!(err, AtsError::Auth("Email already exists".into()));
    }

    #[test]
    fn not_found_and_server_errors() {
        let err = error_for_status(StatusCode::NOT_FOUND, "", Endpoint::Resource, "job 9");
        assert_eq!(err, AtsError::NotFound("job 9".into()));

        let err = error_for_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            "<html>oops</html>",
            Endpoint::Resource,
            "stats",
        );
        assert_eq!(
            err,
            AtsError::Transient("stats: 500 Internal Server Error".into())
        );
    }

    #[rstest]
    #[case(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"status":500,"error":"Internal Server Error","message":"Job not found","path":"/api/jobs/9"}"#,
        "Job not found"
    )]
    #[case(StatusCode::BAD_REQUEST, r#"{"error":"Application not found"}"#, "Application not found")]
    #[case(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"message":"This job is no longer accepting applications"}"#,
        "This job is no longer accepting applications"
    )]
    fn missing_records_map_to_not_found_whatever_the_status(
        #[case] status: StatusCode,
        #[case] body: &str,
        #[case] expected: &str,
    ) {
        let err = error_for_status(status, body, Endpoint::Resource, "job 9");
        assert_eq!(err, AtsError::NotFound(expected.into()));
    }

    #[test]
    fn bad_request_on_resources_is_transient() {
        let err = error_for_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Job title is required"}"#,
            Endpoint::Resource,
            "create job",
        );
        assert_eq!(
            err,
            AtsError::Transient("create job: Job title is required (400 Bad Request)".into())
        );
    }

    #[test]
    fn base_url_is_normalised() {
        let api = HttpAtsApi::new("http://localhost:8080/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(api.base_url(), "http://localhost:8080/api");
    }
}
