//! REST client for the RunningHub proxy endpoints.
//!
//! Wraps file upload (multipart), job submission and status queries
//! using [`reqwest`], and normalizes every response through
//! [`crate::messages`].

use async_trait::async_trait;
use reqwest::StatusCode;

use mediagen_core::job::StatusReport;
use mediagen_core::media::{ResultKind, UploadedMedia};
use mediagen_core::params::SubmitRequest;
use mediagen_core::types::{RemoteFileReference, TaskId};

use crate::backend::GenerationBackend;
use crate::config::RunningHubConfig;
use crate::error::{StatusQueryError, SubmissionError, UploadError};
use crate::messages::{
    normalize_status, normalize_submit, normalize_upload, status_body, submit_body,
    RawStatusResponse, RawSubmitResponse, RawUploadResponse,
};

/// HTTP client for one RunningHub proxy.
pub struct RunningHubApi {
    client: reqwest::Client,
    config: RunningHubConfig,
}

/// A non-2xx response, kept for error reporting.
struct HttpFailure {
    status: StatusCode,
    body: String,
}

impl RunningHubApi {
    pub fn new(config: RunningHubConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (e.g. to share a connection pool with the result presenter).
    pub fn with_client(client: reqwest::Client, config: RunningHubConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &RunningHubConfig {
        &self.config
    }

    /// Upload one file as the multipart field `file`.
    pub async fn upload_file(
        &self,
        media: &UploadedMedia,
    ) -> Result<RemoteFileReference, UploadError> {
        let part = reqwest::multipart::Part::bytes(media.bytes().to_vec())
            .file_name(media.file_name().to_string())
            .mime_str(media.mime_type())?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.config.upload_url())
            .timeout(self.config.request_timeout)
            .multipart(form)
            .send()
            .await?;

        let response = Self::ensure_success(response)
            .await
            .map_err(|f| UploadError::Http {
                status: f.status.as_u16(),
                body: f.body,
            })?;
        let raw: RawUploadResponse = response.json().await?;
        let file = normalize_upload(raw)?;

        tracing::debug!(
            file_name = media.file_name(),
            bytes = media.size(),
            file_id = %file,
            "Uploaded media",
        );
        Ok(file)
    }

    /// Submit a generation request and return the backend task id.
    pub async fn submit_job(&self, request: &SubmitRequest) -> Result<TaskId, SubmissionError> {
        let response = self
            .client
            .post(self.config.submit_url())
            .timeout(self.config.request_timeout)
            .json(&submit_body(request))
            .send()
            .await?;

        let response = Self::ensure_success(response)
            .await
            .map_err(|f| SubmissionError::Http {
                status: f.status.as_u16(),
                body: f.body,
            })?;
        let raw: RawSubmitResponse = response.json().await?;
        normalize_submit(raw)
    }

    /// Query the status of a task.
    ///
    /// The query is aborted after
    /// [`status_timeout`](RunningHubConfig::status_timeout). Connection
    /// failures, timeouts, 5xx/408/429 responses and unreadable bodies
    /// are reported as [`StatusQueryError::Transport`]; other non-2xx
    /// responses as [`StatusQueryError::Logic`].
    pub async fn fetch_status(
        &self,
        task_id: &TaskId,
        expected: ResultKind,
    ) -> Result<StatusReport, StatusQueryError> {
        let response = self
            .client
            .post(self.config.status_url())
            .timeout(self.config.status_timeout)
            .json(&status_body(task_id))
            .send()
            .await
            .map_err(|e| StatusQueryError::Transport(e.to_string()))?;

        let response = Self::ensure_success(response).await.map_err(|f| {
            let detail = format!("HTTP {}: {}", f.status.as_u16(), f.body);
            if is_transient(f.status) {
                StatusQueryError::Transport(detail)
            } else {
                StatusQueryError::Logic(detail)
            }
        })?;

        let raw: RawStatusResponse = response
            .json()
            .await
            .map_err(|e| StatusQueryError::Transport(format!("unreadable status body: {e}")))?;

        Ok(normalize_status(raw, expected))
    }

    // ---- private helpers ----

    /// Return the response unchanged on 2xx, or its status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, HttpFailure> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(HttpFailure { status, body });
        }
        Ok(response)
    }
}

/// Status codes worth retrying.
fn is_transient(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl GenerationBackend for RunningHubApi {
    async fn upload(&self, media: &UploadedMedia) -> Result<RemoteFileReference, UploadError> {
        self.upload_file(media).await
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<TaskId, SubmissionError> {
        self.submit_job(request).await
    }

    async fn query_status(
        &self,
        task_id: &TaskId,
        expected: ResultKind,
    ) -> Result<StatusReport, StatusQueryError> {
        self.fetch_status(task_id, expected).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses() {
        assert!(is_transient(StatusCode::BAD_GATEWAY));
        assert!(is_transient(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient(StatusCode::REQUEST_TIMEOUT));
        assert!(!is_transient(StatusCode::NOT_FOUND));
        assert!(!is_transient(StatusCode::UNAUTHORIZED));
    }
}
