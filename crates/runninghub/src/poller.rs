//! Polling engine: drives a [`Job`] to a terminal state.
//!
//! Exactly one status query is in flight at a time. The next query is
//! scheduled only after the previous one completes, so slow responses
//! throttle the loop on their own. Cancellation is honoured both while
//! waiting and while a query is outstanding.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use mediagen_core::job::{Job, JobResult, JobStatus, PollStep, StatusReport};
use mediagen_core::media::ResultKind;
use mediagen_core::polling::PollPolicy;
use mediagen_core::progress::ProgressCurve;
use mediagen_core::tools::ToolProfile;

use crate::backend::GenerationBackend;
use crate::error::{GenerationError, StatusQueryError};

/// Polls one backend according to one tool's policy and curve.
pub struct PollingEngine<B: ?Sized> {
    backend: Arc<B>,
    policy: PollPolicy,
    curve: Arc<dyn ProgressCurve>,
    expected: ResultKind,
}

impl<B: GenerationBackend + ?Sized> PollingEngine<B> {
    pub fn new(
        backend: Arc<B>,
        policy: PollPolicy,
        curve: Arc<dyn ProgressCurve>,
        expected: ResultKind,
    ) -> Self {
        Self {
            backend,
            policy,
            curve,
            expected,
        }
    }

    /// Engine configured from a tool profile's policy and curve preset.
    pub fn for_profile(backend: Arc<B>, profile: &ToolProfile) -> Self {
        Self::new(
            backend,
            profile.policy.clone(),
            Arc::new(profile.curve.curve()),
            profile.output,
        )
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll until `job` reaches a terminal state.
    ///
    /// `started` is when the job was submitted; progress is estimated
    /// from the time elapsed since then. `observe` sees the job after
    /// every query and returns [`ControlFlow::Break`] once the caller no
    /// longer tracks it.
    ///
    /// Returns `None` if cancelled or abandoned through `observe`,
    /// otherwise the job in its terminal state.
    pub async fn run<F>(
        &self,
        mut job: Job,
        started: Instant,
        cancel: &CancellationToken,
        mut observe: F,
    ) -> Option<Job>
    where
        F: FnMut(&Job) -> ControlFlow<()> + Send,
    {
        let mut delay = self.policy.interval;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(task_id = %job.task_id, "Polling cancelled while waiting");
                    return None;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(task_id = %job.task_id, "Polling cancelled mid-query");
                    return None;
                }
                outcome = self.backend.query_status(&job.task_id, self.expected) => outcome,
            };

            let step = match outcome {
                Ok(report) => job.apply_report(
                    report,
                    started.elapsed(),
                    &self.policy,
                    self.curve.as_ref(),
                ),
                Err(StatusQueryError::Transport(message)) => {
                    tracing::warn!(
                        task_id = %job.task_id,
                        retry = job.transport_retries + 1,
                        max_retries = self.policy.max_transport_retries,
                        error = %message,
                        "Status query failed",
                    );
                    job.apply_transport_error(message, &self.policy)
                }
                Err(StatusQueryError::Logic(message)) => job.apply_report(
                    StatusReport::Failed {
                        message: Some(message),
                    },
                    started.elapsed(),
                    &self.policy,
                    self.curve.as_ref(),
                ),
            };

            if observe(&job).is_break() {
                tracing::debug!(task_id = %job.task_id, "Poll chain is stale, stopping");
                return None;
            }

            match step {
                PollStep::Reschedule(next) => {
                    tracing::debug!(
                        task_id = %job.task_id,
                        attempt = job.attempt_count,
                        percent = job.progress.percent,
                        phase = %job.progress.phase_label,
                        "Job still running",
                    );
                    delay = next;
                }
                PollStep::Stop => {
                    tracing::info!(
                        task_id = %job.task_id,
                        status = ?job.status,
                        attempts = job.attempt_count,
                        elapsed_secs = started.elapsed().as_secs(),
                        "Polling finished",
                    );
                    return Some(job);
                }
            }
        }
    }
}

/// Translate a terminal job into the pipeline's result type.
pub fn into_outcome(job: &Job) -> Result<JobResult, GenerationError> {
    let message = || {
        job.last_error
            .clone()
            .unwrap_or_else(|| mediagen_core::job::GENERIC_FAILURE_MESSAGE.to_string())
    };

    match job.status {
        JobStatus::Completed => job
            .result
            .clone()
            .ok_or_else(|| GenerationError::PollLogic(message())),
        JobStatus::TimedOut => Err(GenerationError::PollTimeout {
            attempts: job.attempt_count,
            message: message(),
        }),
        // Logic failures reset the retry counter; only transport
        // exhaustion leaves it non-zero.
        JobStatus::Failed if job.transport_retries > 0 => Err(GenerationError::PollTransport {
            retries: job.transport_retries - 1,
            message: message(),
        }),
        JobStatus::Failed => Err(GenerationError::PollLogic(message())),
        JobStatus::Pending | JobStatus::Running => Err(GenerationError::PollLogic(
            "Generation has not finished".into(),
        )),
    }
}
