//! RunningHub proxy response shapes and their normalization.
//!
//! The proxy endpoints disagree on layout: some nest payloads under
//! `data`, others are flat, and image results sometimes arrive in a
//! `videoUrl` field. Each raw shape is deserialized leniently and then
//! folded into one canonical type, so nothing past this module sees
//! the inconsistency.

use serde::Deserialize;

use mediagen_core::job::{JobResult, StatusReport};
use mediagen_core::media::ResultKind;
use mediagen_core::params::{JobParams, SubmitRequest};
use mediagen_core::types::{RemoteFileReference, TaskId};

use crate::error::{SubmissionError, UploadError};

// ---------------------------------------------------------------------------
// Status words
// ---------------------------------------------------------------------------

const IN_PROGRESS_STATUSES: &[&str] = &["running", "pending", "processing", "queued"];
const SUCCESS_STATUSES: &[&str] = &["completed", "success", "succeeded"];
const FAILURE_STATUSES: &[&str] = &["failed", "error"];

// ---------------------------------------------------------------------------
// Raw shapes
// ---------------------------------------------------------------------------

/// `POST <upload>` response: `{success, fileId}` or `{success, data: {fileId}}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawUploadResponse {
    pub success: bool,
    pub file_id: Option<String>,
    pub file_name: Option<String>,
    pub data: Option<RawUploadData>,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawUploadData {
    pub file_id: Option<String>,
    pub file_name: Option<String>,
}

/// `POST <submit>` response: `{success, data: {taskId}}` or `{success, taskId}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSubmitResponse {
    pub success: bool,
    pub task_id: Option<String>,
    pub data: Option<RawSubmitData>,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSubmitData {
    pub task_id: Option<String>,
}

/// `<status>` response, nested or flat.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStatusResponse {
    pub success: Option<bool>,
    pub status: Option<String>,
    pub data: Option<RawStatusData>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub result_url: Option<String>,
    pub progress: Option<f64>,
    pub estimated_time: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStatusData {
    pub status: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub url: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Extract the remote file token from an upload response.
pub fn normalize_upload(raw: RawUploadResponse) -> Result<RemoteFileReference, UploadError> {
    if !raw.success {
        let message = non_empty(raw.error)
            .or(non_empty(raw.message))
            .unwrap_or_else(|| "upload was not accepted".to_string());
        return Err(UploadError::Rejected { message });
    }

    let (data_id, data_name) = raw
        .data
        .map(|d| (d.file_id, d.file_name))
        .unwrap_or_default();

    non_empty(raw.file_id)
        .or(non_empty(data_id))
        .or(non_empty(raw.file_name))
        .or(non_empty(data_name))
        .map(RemoteFileReference::new)
        .ok_or(UploadError::MissingFileId)
}

/// Extract the task id from a submit response.
pub fn normalize_submit(raw: RawSubmitResponse) -> Result<TaskId, SubmissionError> {
    if !raw.success {
        let message = non_empty(raw.error)
            .or(non_empty(raw.message))
            .unwrap_or_else(|| "generation request was not accepted".to_string());
        return Err(SubmissionError::Rejected { message });
    }

    non_empty(raw.data.and_then(|d| d.task_id))
        .or(non_empty(raw.task_id))
        .map(TaskId::new)
        .ok_or(SubmissionError::MissingTaskId)
}

/// Fold a status response into a [`StatusReport`].
///
/// `expected` is the tool's result kind: the field name the URL came
/// from is not trusted to say whether it is an image or a video.
pub fn normalize_status(raw: RawStatusResponse, expected: ResultKind) -> StatusReport {
    let data = raw.data.unwrap_or_default();
    let message = non_empty(data.error)
        .or(non_empty(data.message))
        .or(non_empty(raw.error))
        .or(non_empty(raw.message));

    if raw.success == Some(false) {
        return StatusReport::Failed { message };
    }

    let status = non_empty(data.status)
        .or(non_empty(raw.status))
        .map(|s| s.trim().to_ascii_lowercase());
    let url = non_empty(data.image_url)
        .or(non_empty(data.video_url))
        .or(non_empty(data.url))
        .or(non_empty(raw.image_url))
        .or(non_empty(raw.video_url))
        .or(non_empty(raw.result_url));

    match status.as_deref() {
        Some(s) if IN_PROGRESS_STATUSES.contains(&s) => StatusReport::InProgress {
            backend_progress: raw.progress,
            message,
        },
        Some(s) if SUCCESS_STATUSES.contains(&s) => match url {
            Some(url) => StatusReport::Completed(JobResult {
                url,
                kind: expected,
            }),
            None => StatusReport::Failed {
                message: Some("Generation completed without a result URL".into()),
            },
        },
        Some(s) if FAILURE_STATUSES.contains(&s) => StatusReport::Failed { message },
        Some(other) => StatusReport::Failed {
            message: Some(format!("Unrecognized generation status: {other}")),
        },
        None => StatusReport::Failed {
            message: Some("Status response did not include a status".into()),
        },
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// JSON body for the submit endpoint.
pub fn submit_body(request: &SubmitRequest) -> serde_json::Value {
    let mut body = serde_json::json!({ "action": request.action });

    let fields: Vec<(&str, serde_json::Value)> = match &request.params {
        JobParams::SingleImage { image } => vec![("imageFileId", image.as_str().into())],
        JobParams::TwoImages { source, target } => vec![
            ("sourceFileId", source.as_str().into()),
            ("targetFileId", target.as_str().into()),
        ],
        JobParams::ImageWithPrompt { image, prompt } => vec![
            ("imageFileId", image.as_str().into()),
            ("prompt", prompt.as_str().into()),
        ],
        JobParams::TextOnly { prompt } => vec![("prompt", prompt.as_str().into())],
        JobParams::ImagePair {
            first,
            second,
            prompt,
        } => {
            let mut fields = vec![
                ("firstFileId", first.as_str().into()),
                ("secondFileId", second.as_str().into()),
            ];
            if let Some(prompt) = prompt {
                fields.push(("prompt", prompt.as_str().into()));
            }
            fields
        }
    };

    if let Some(map) = body.as_object_mut() {
        for (key, value) in fields {
            map.insert(key.to_string(), value);
        }
        if let Some(webapp_id) = &request.webapp_id {
            map.insert("webappId".into(), webapp_id.as_str().into());
        }
    }
    body
}

/// JSON body for the status endpoint.
pub fn status_body(task_id: &TaskId) -> serde_json::Value {
    serde_json::json!({ "taskId": task_id.as_str() })
}
