#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use mediagen_core::job::{JobResult, StatusReport};
use mediagen_core::media::{ResultKind, UploadedMedia};
use mediagen_core::params::SubmitRequest;
use mediagen_core::types::{RemoteFileReference, TaskId};
use mediagen_runninghub::backend::GenerationBackend;
use mediagen_runninghub::error::{StatusQueryError, SubmissionError, UploadError};

/// Smallest byte sequence that sniffs as a PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

pub fn png(name: &str) -> UploadedMedia {
    UploadedMedia::from_bytes(name, PNG_BYTES.to_vec()).expect("valid png header")
}

pub fn running() -> Result<StatusReport, StatusQueryError> {
    Ok(StatusReport::InProgress {
        backend_progress: None,
        message: None,
    })
}

pub fn completed(url: &str) -> Result<StatusReport, StatusQueryError> {
    Ok(StatusReport::Completed(JobResult {
        url: url.to_string(),
        kind: ResultKind::Image,
    }))
}

pub fn transport() -> Result<StatusReport, StatusQueryError> {
    Err(StatusQueryError::Transport("connection reset".into()))
}

/// Backend whose responses are scripted per task.
///
/// Status queries pop the next scripted response for the task; once the
/// script is exhausted every query reports the job as still running.
#[derive(Default)]
pub struct ScriptedBackend {
    fail_uploads: bool,
    reject_submit: bool,
    task_ids: Mutex<VecDeque<String>>,
    scripts: Mutex<HashMap<String, VecDeque<Result<StatusReport, StatusQueryError>>>>,
    query_delays: Mutex<HashMap<String, Duration>>,
    uploads: Mutex<Vec<String>>,
    submits: Mutex<Vec<SubmitRequest>>,
    status_calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedBackend {
    pub fn with_tasks(task_ids: &[&str]) -> Self {
        let backend = Self::default();
        backend
            .task_ids
            .lock()
            .unwrap()
            .extend(task_ids.iter().map(|id| id.to_string()));
        backend
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn rejecting_submits(mut self) -> Self {
        self.reject_submit = true;
        self
    }

    pub fn script(&self, task_id: &str, responses: Vec<Result<StatusReport, StatusQueryError>>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_default()
            .extend(responses);
    }

    /// Make every status query for `task_id` take `delay`.
    pub fn delay_queries(&self, task_id: &str, delay: Duration) {
        self.query_delays
            .lock()
            .unwrap()
            .insert(task_id.to_string(), delay);
    }

    pub fn status_calls(&self, task_id: &str) -> u32 {
        self.status_calls
            .lock()
            .unwrap()
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn submit_count(&self) -> usize {
        self.submits.lock().unwrap().len()
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn last_submit(&self) -> Option<SubmitRequest> {
        self.submits.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn upload(&self, media: &UploadedMedia) -> Result<RemoteFileReference, UploadError> {
        self.uploads
            .lock()
            .unwrap()
            .push(media.file_name().to_string());
        if self.fail_uploads {
            return Err(UploadError::Rejected {
                message: "storage unavailable".into(),
            });
        }
        Ok(RemoteFileReference::new(format!("ref-{}", media.file_name())))
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<TaskId, SubmissionError> {
        self.submits.lock().unwrap().push(request.clone());
        if self.reject_submit {
            return Err(SubmissionError::Rejected {
                message: "quota exceeded".into(),
            });
        }
        self.task_ids
            .lock()
            .unwrap()
            .pop_front()
            .map(TaskId::new)
            .ok_or(SubmissionError::MissingTaskId)
    }

    async fn query_status(
        &self,
        task_id: &TaskId,
        _expected: ResultKind,
    ) -> Result<StatusReport, StatusQueryError> {
        *self
            .status_calls
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_default() += 1;

        let delay = self.query_delays.lock().unwrap().get(task_id.as_str()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(task_id.as_str())
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(running)
    }
}
