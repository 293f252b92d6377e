//! Events emitted by a [`GenerationSession`](crate::session::GenerationSession).
//!
//! They mirror the session's state transitions for consumers that
//! prefer a stream of changes over watching snapshots.

use serde::Serialize;

use mediagen_core::job::JobResult;
use mediagen_core::tools::ToolKind;
use mediagen_core::types::TaskId;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// The job was accepted by the backend and polling has begun.
    Submitted { tool: ToolKind, task_id: TaskId },

    /// A status query reported the job still running.
    Progress {
        task_id: TaskId,
        /// Estimated completion percentage (0-99).
        percent: u8,
        phase_label: String,
    },

    /// The job finished and its result is available.
    Completed { task_id: TaskId, result: JobResult },

    /// Upload, submission or polling failed.
    Failed {
        /// `None` when the failure happened before submission.
        task_id: Option<TaskId>,
        error: String,
    },

    /// The attempt ceiling was reached while the job was still running.
    TimedOut { task_id: TaskId, attempts: u32 },

    /// The session stopped tracking a job that had not finished.
    Abandoned { task_id: TaskId },
}
