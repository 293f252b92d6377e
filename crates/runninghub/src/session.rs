//! One user's generation session for one tool.
//!
//! A session tracks at most one job. Starting a new generation bumps
//! the session's generation counter and cancels the previous poll
//! chain; the backend job itself keeps running unobserved. Every state
//! change is applied through [`watch::Sender::send_if_modified`] and
//! only when the writer's generation is still current, so a chain that
//! was abandoned mid-query can never overwrite newer state.
//!
//! Observers either watch [`SessionSnapshot`]s via
//! [`GenerationSession::subscribe`] or receive [`GenerationEvent`]s via
//! [`GenerationSession::events`].

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use mediagen_core::job::{Job, JobStatus};
use mediagen_core::media::UploadedMedia;
use mediagen_core::params::JobParams;
use mediagen_core::progress::ProgressEstimate;
use mediagen_core::tools::ToolProfile;
use mediagen_core::types::TaskId;

use crate::backend::GenerationBackend;
use crate::error::GenerationError;
use crate::events::GenerationEvent;
use crate::poller::{into_outcome, PollingEngine};
use crate::submitter::{submit_job, upload_inputs};

/// Broadcast channel capacity for session events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What the session is doing right now.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Uploading,
    Submitting,
    Polling { job: Job },
    Completed { job: Job },
    TimedOut { job: Job },
    Failed { error: String, job: Option<Job> },
}

impl SessionPhase {
    /// Whether a generation is underway.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Uploading | Self::Submitting | Self::Polling { .. })
    }

    pub fn job(&self) -> Option<&Job> {
        match self {
            Self::Polling { job } | Self::Completed { job } | Self::TimedOut { job } => Some(job),
            Self::Failed { job, .. } => job.as_ref(),
            Self::Idle | Self::Uploading | Self::Submitting => None,
        }
    }

    pub fn progress(&self) -> Option<&ProgressEstimate> {
        self.job().map(|job| &job.progress)
    }

    fn for_job(job: &Job) -> Self {
        match job.status {
            JobStatus::Pending | JobStatus::Running => Self::Polling { job: job.clone() },
            JobStatus::Completed => Self::Completed { job: job.clone() },
            JobStatus::TimedOut => Self::TimedOut { job: job.clone() },
            JobStatus::Failed => Self::Failed {
                error: into_outcome(job)
                    .err()
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
                job: Some(job.clone()),
            },
        }
    }
}

/// Observable session state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Incremented every time a generation starts or is abandoned.
    pub generation: u64,
    pub phase: SessionPhase,
}

/// The chain currently allowed to mutate session state.
struct ActiveChain {
    generation: u64,
    cancel: CancellationToken,
}

struct Shared {
    state_tx: watch::Sender<SessionSnapshot>,
    event_tx: broadcast::Sender<GenerationEvent>,
    active: Mutex<Option<ActiveChain>>,
}

impl Shared {
    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveChain>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` only if `generation` is still current.
    fn update_if_current(&self, generation: u64, f: impl FnOnce(&mut SessionPhase)) -> bool {
        self.state_tx.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                return false;
            }
            f(&mut snapshot.phase);
            true
        })
    }

    fn emit(&self, event: GenerationEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    /// Cancel the active chain and move to a new generation showing
    /// `phase`. Returns the new generation and its cancellation token.
    fn advance(&self, phase: SessionPhase) -> (u64, CancellationToken) {
        let mut active = self.lock_active();
        if let Some(previous) = active.take() {
            previous.cancel.cancel();
        }

        let mut generation = 0;
        let mut abandoned = None;
        self.state_tx.send_modify(|snapshot| {
            if let SessionPhase::Polling { job } = &snapshot.phase {
                abandoned = Some(job.task_id.clone());
            }
            snapshot.generation += 1;
            snapshot.phase = phase;
            generation = snapshot.generation;
        });

        if let Some(task_id) = abandoned {
            tracing::info!(task_id = %task_id, "Abandoned unfinished job");
            self.emit(GenerationEvent::Abandoned { task_id });
        }

        let cancel = CancellationToken::new();
        *active = Some(ActiveChain {
            generation,
            cancel: cancel.clone(),
        });
        (generation, cancel)
    }

    /// Forget the active chain if it still belongs to `generation`.
    fn release(&self, generation: u64) {
        let mut active = self.lock_active();
        if active.as_ref().is_some_and(|chain| chain.generation == generation) {
            *active = None;
        }
    }
}

/// Runs generations for one tool against one backend.
pub struct GenerationSession<B: ?Sized> {
    id: Uuid,
    backend: Arc<B>,
    profile: ToolProfile,
    webapp_id: Option<String>,
    shared: Arc<Shared>,
}

impl<B: GenerationBackend + ?Sized + 'static> GenerationSession<B> {
    pub fn new(backend: Arc<B>, profile: ToolProfile) -> Self {
        let (state_tx, _) = watch::channel(SessionSnapshot {
            generation: 0,
            phase: SessionPhase::Idle,
        });
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            id: Uuid::now_v7(),
            backend,
            profile,
            webapp_id: None,
            shared: Arc::new(Shared {
                state_tx,
                event_tx,
                active: Mutex::new(None),
            }),
        }
    }

    /// Forward a RunningHub web-app id with every submission.
    pub fn with_webapp_id(mut self, webapp_id: Option<String>) -> Self {
        self.webapp_id = webapp_id;
        self
    }

    pub fn profile(&self) -> &ToolProfile {
        &self.profile
    }

    /// Watch session snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.state_tx.subscribe()
    }

    /// Receive session events from now on.
    pub fn events(&self) -> broadcast::Receiver<GenerationEvent> {
        self.shared.event_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.state_tx.borrow().clone()
    }

    /// Upload, submit and start polling a new generation.
    ///
    /// Any generation already in progress is abandoned first. Returns
    /// once the job is submitted; polling continues in the background
    /// and is observable through [`subscribe`](Self::subscribe).
    pub async fn start(
        &self,
        params: JobParams<UploadedMedia>,
    ) -> Result<TaskId, GenerationError> {
        params.validate(self.profile.input)?;

        let first_phase = if params.files().is_empty() {
            SessionPhase::Submitting
        } else {
            SessionPhase::Uploading
        };
        let (generation, cancel) = self.shared.advance(first_phase);

        tracing::info!(
            session_id = %self.id,
            tool = %self.profile.kind,
            generation,
            "Starting generation",
        );

        let uploaded = tokio::select! {
            _ = cancel.cancelled() => return Err(GenerationError::Superseded),
            uploaded = upload_inputs(self.backend.as_ref(), &params) => uploaded,
        };
        let uploaded = match uploaded {
            Ok(uploaded) => uploaded,
            Err(e) => return Err(self.fail_before_polling(generation, e.into())),
        };

        if !self
            .shared
            .update_if_current(generation, |phase| *phase = SessionPhase::Submitting)
        {
            return Err(GenerationError::Superseded);
        }

        let submitted = tokio::select! {
            _ = cancel.cancelled() => return Err(GenerationError::Superseded),
            submitted = submit_job(
                self.backend.as_ref(),
                &self.profile,
                self.webapp_id.clone(),
                uploaded,
            ) => submitted,
        };
        let task_id = match submitted {
            Ok(task_id) => task_id,
            Err(e) => return Err(self.fail_before_polling(generation, e.into())),
        };

        let job = Job::new(task_id.clone(), chrono::Utc::now());
        if !self.shared.update_if_current(generation, |phase| {
            *phase = SessionPhase::Polling { job: job.clone() }
        }) {
            tracing::warn!(
                session_id = %self.id,
                task_id = %task_id,
                "Generation superseded after submission; job left running unobserved",
            );
            return Err(GenerationError::Superseded);
        }
        self.shared.emit(GenerationEvent::Submitted {
            tool: self.profile.kind,
            task_id: task_id.clone(),
        });

        self.spawn_poll_chain(generation, cancel, job);
        Ok(task_id)
    }

    /// Stop tracking the current generation and return to idle.
    ///
    /// The backend job, if any, is not cancelled.
    pub fn abandon(&self) {
        let (generation, _) = self.shared.advance(SessionPhase::Idle);
        self.shared.release(generation);
    }

    /// Wait until the current generation stops being busy, or a newer
    /// generation replaces it.
    pub async fn wait_until_settled(&self) -> SessionSnapshot {
        let mut rx = self.subscribe();
        let generation = rx.borrow().generation;
        let settled = rx
            .wait_for(|snapshot| snapshot.generation != generation || !snapshot.phase.is_busy())
            .await
            .map(|snapshot| snapshot.clone());
        // The sender lives as long as `self`, so this cannot fail in practice.
        settled.unwrap_or_else(|_| self.snapshot())
    }

    // ---- private helpers ----

    fn fail_before_polling(&self, generation: u64, error: GenerationError) -> GenerationError {
        tracing::warn!(
            session_id = %self.id,
            tool = %self.profile.kind,
            error = %error,
            "Generation failed before polling",
        );
        let message = error.to_string();
        if self.shared.update_if_current(generation, |phase| {
            *phase = SessionPhase::Failed {
                error: message.clone(),
                job: None,
            }
        }) {
            self.shared.emit(GenerationEvent::Failed {
                task_id: None,
                error: message,
            });
        }
        self.shared.release(generation);
        error
    }

    fn spawn_poll_chain(&self, generation: u64, cancel: CancellationToken, job: Job) {
        let shared = Arc::clone(&self.shared);
        let engine = PollingEngine::for_profile(Arc::clone(&self.backend), &self.profile);
        let started = Instant::now();

        tokio::spawn(async move {
            let mut last_percent = job.progress.percent;
            let observe = |job: &Job| {
                if !shared.update_if_current(generation, |phase| *phase = SessionPhase::for_job(job))
                {
                    return ControlFlow::Break(());
                }
                if let Some(event) = event_for(job, &mut last_percent) {
                    shared.emit(event);
                }
                ControlFlow::Continue(())
            };

            engine.run(job, started, &cancel, observe).await;
            shared.release(generation);
        });
    }
}

impl<B: ?Sized> Drop for GenerationSession<B> {
    fn drop(&mut self) {
        if let Some(chain) = self
            .shared
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            chain.cancel.cancel();
        }
    }
}

/// The event describing `job` after a poll, if any.
fn event_for(job: &Job, last_percent: &mut u8) -> Option<GenerationEvent> {
    let task_id = job.task_id.clone();
    match job.status {
        JobStatus::Pending | JobStatus::Running => {
            if job.progress.percent == *last_percent {
                return None;
            }
            *last_percent = job.progress.percent;
            Some(GenerationEvent::Progress {
                task_id,
                percent: job.progress.percent,
                phase_label: job.progress.phase_label.clone(),
            })
        }
        JobStatus::Completed => job
            .result
            .clone()
            .map(|result| GenerationEvent::Completed { task_id, result }),
        JobStatus::TimedOut => Some(GenerationEvent::TimedOut {
            task_id,
            attempts: job.attempt_count,
        }),
        JobStatus::Failed => Some(GenerationEvent::Failed {
            task_id: Some(task_id),
            error: into_outcome(job)
                .err()
                .map(|e| e.to_string())
                .unwrap_or_default(),
        }),
    }
}
