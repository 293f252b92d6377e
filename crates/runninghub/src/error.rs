//! Error taxonomy for the upload / submit / poll pipeline.
//!
//! Only [`StatusQueryError::Transport`] is retried, and only by the
//! polling engine. Every other failure is surfaced immediately and
//! leaves the session idle so the user can start again.

use mediagen_core::error::CoreError;

/// The upload endpoint refused or lost a file.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("Upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint returned a non-2xx status code.
    #[error("Upload failed ({status}): {body}")]
    Http { status: u16, body: String },

    /// The endpoint answered `success: false`.
    #[error("Upload rejected: {message}")]
    Rejected { message: String },

    /// The response carried no file identifier.
    #[error("Upload response did not include a file identifier")]
    MissingFileId,
}

/// The submit endpoint did not accept the job.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Submit request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Submit failed ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Generation request rejected: {message}")]
    Rejected { message: String },

    #[error("Submit response did not include a task identifier")]
    MissingTaskId,
}

/// A single status query failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StatusQueryError {
    /// Transient failure (connection, timeout, 5xx, garbled body).
    #[error("Network error while checking status: {0}")]
    Transport(String),

    /// The endpoint answered but the request can never succeed.
    #[error("Status query rejected: {0}")]
    Logic(String),
}

/// Everything that can end a generation attempt without a result.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The request failed validation before anything was sent.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// Status queries kept failing at the transport layer.
    #[error("Lost contact with the generation service after {retries} retries: {message}")]
    PollTransport { retries: u32, message: String },

    /// The backend reported failure or an unrecognized status.
    #[error("{0}")]
    PollLogic(String),

    /// The attempt ceiling was reached while the job was still running.
    #[error("{message} ({attempts} status checks)")]
    PollTimeout { attempts: u32, message: String },

    /// A newer generation was started before this one was submitted.
    #[error("Superseded by a newer generation")]
    Superseded,
}
