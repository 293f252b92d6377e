//! The seam between the generation pipeline and the remote service.
//!
//! [`RunningHubApi`](crate::api::RunningHubApi) is the production
//! implementation; tests drive the polling engine and the session with
//! scripted implementations.

use async_trait::async_trait;

use mediagen_core::job::StatusReport;
use mediagen_core::media::{ResultKind, UploadedMedia};
use mediagen_core::params::SubmitRequest;
use mediagen_core::types::{RemoteFileReference, TaskId};

use crate::error::{StatusQueryError, SubmissionError, UploadError};

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Transfer one file and return the token the job system knows it by.
    async fn upload(&self, media: &UploadedMedia) -> Result<RemoteFileReference, UploadError>;

    /// Submit a generation job. Never retried.
    async fn submit(&self, request: &SubmitRequest) -> Result<TaskId, SubmissionError>;

    /// Ask for the current status of a job.
    async fn query_status(
        &self,
        task_id: &TaskId,
        expected: ResultKind,
    ) -> Result<StatusReport, StatusQueryError>;
}
