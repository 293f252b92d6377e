//! The generation job and its polling state machine.
//!
//! `Pending -> Running -> {Completed | Failed | TimedOut}`. Terminal
//! states are final: once reached, every further report is ignored.
//! The async driver lives in `mediagen-runninghub`; this module only
//! decides what each poll outcome does to the job and when to poll
//! next.

use std::time::Duration;

use serde::Serialize;

use crate::media::ResultKind;
use crate::polling::PollPolicy;
use crate::progress::{ProgressCurve, ProgressEstimate, RUNNING_CEILING};
use crate::types::{TaskId, Timestamp};

/// Shown when the attempt ceiling is reached while the job still runs.
pub const TIMEOUT_MESSAGE: &str =
    "Generation is taking longer than expected. Please try again later.";

/// Shown when the backend reports a failure without a message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Generation failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

/// Canonical result of a completed job, whatever field name the
/// endpoint used for the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    pub url: String,
    pub kind: ResultKind,
}

/// Normalized outcome of one successful status query.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReport {
    InProgress {
        /// Progress figure the backend sent, if any. Informational only.
        backend_progress: Option<f64>,
        message: Option<String>,
    },
    Completed(JobResult),
    Failed {
        message: Option<String>,
    },
}

/// What the poll driver should do after applying an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Reschedule(Duration),
    Stop,
}

/// A submitted generation job as tracked by one session.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub task_id: TaskId,
    pub submitted_at: Timestamp,
    pub status: JobStatus,
    /// In-progress responses seen so far.
    pub attempt_count: u32,
    /// Consecutive transport failures since the last successful query.
    pub transport_retries: u32,
    pub last_error: Option<String>,
    pub progress: ProgressEstimate,
    pub result: Option<JobResult>,
}

impl Job {
    /// A freshly submitted job, in `Pending` with 0% progress.
    pub fn new(task_id: TaskId, submitted_at: Timestamp) -> Self {
        Self {
            task_id,
            submitted_at,
            status: JobStatus::Pending,
            attempt_count: 0,
            transport_retries: 0,
            last_error: None,
            progress: ProgressEstimate::queued(),
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a status report received `elapsed` after submission.
    pub fn apply_report(
        &mut self,
        report: StatusReport,
        elapsed: Duration,
        policy: &PollPolicy,
        curve: &dyn ProgressCurve,
    ) -> PollStep {
        if self.is_terminal() {
            return PollStep::Stop;
        }

        self.transport_retries = 0;
        self.last_error = None;

        match report {
            StatusReport::Completed(result) => {
                self.status = JobStatus::Completed;
                self.progress = ProgressEstimate::completed();
                self.result = Some(result);
                PollStep::Stop
            }
            StatusReport::Failed { message } => {
                self.status = JobStatus::Failed;
                self.last_error = Some(
                    message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
                );
                PollStep::Stop
            }
            StatusReport::InProgress { .. } => {
                self.attempt_count += 1;
                if self.attempt_count >= policy.max_attempts {
                    self.status = JobStatus::TimedOut;
                    self.last_error = Some(TIMEOUT_MESSAGE.to_string());
                    return PollStep::Stop;
                }
                self.status = JobStatus::Running;
                self.advance_progress(curve.estimate(elapsed));
                PollStep::Reschedule(policy.interval)
            }
        }
    }

    /// Record a status query that failed before reaching the backend.
    ///
    /// Transport failures use their own retry budget and never count
    /// toward the attempt ceiling.
    pub fn apply_transport_error(&mut self, message: String, policy: &PollPolicy) -> PollStep {
        if self.is_terminal() {
            return PollStep::Stop;
        }

        self.transport_retries += 1;
        self.last_error = Some(message);

        if self.transport_retries > policy.max_transport_retries {
            self.status = JobStatus::Failed;
            return PollStep::Stop;
        }
        PollStep::Reschedule(policy.retry_backoff.delay_for(self.transport_retries))
    }

    /// Keep progress monotonic and strictly below 100 while running.
    fn advance_progress(&mut self, estimate: ProgressEstimate) {
        let percent = estimate.percent.min(RUNNING_CEILING);
        if percent >= self.progress.percent {
            self.progress = ProgressEstimate {
                percent,
                phase_label: estimate.phase_label,
            };
        }
    }
}
