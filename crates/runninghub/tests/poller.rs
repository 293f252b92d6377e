mod common;

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use mediagen_core::job::{Job, JobStatus};
use mediagen_core::tools::ToolKind;
use mediagen_core::types::TaskId;
use mediagen_runninghub::error::GenerationError;
use mediagen_runninghub::poller::{into_outcome, PollingEngine};

use common::{completed, running, transport, ScriptedBackend};

fn job(task_id: &str) -> Job {
    Job::new(TaskId::new(task_id), chrono::Utc::now())
}

fn engine(backend: &Arc<ScriptedBackend>) -> PollingEngine<ScriptedBackend> {
    PollingEngine::for_profile(Arc::clone(backend), &ToolKind::ImageEnhance.profile())
}

#[tokio::test(start_paused = true)]
async fn waits_one_interval_between_queries() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.script("t", vec![running(), running(), completed("https://x/t.png")]);
    let engine = engine(&backend);
    let started = Instant::now();

    let finished = engine
        .run(job("t"), started, &CancellationToken::new(), |_| ControlFlow::Continue(()))
        .await
        .unwrap();

    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    assert_eq!(into_outcome(&finished).unwrap().url, "https://x/t.png");
}

#[tokio::test(start_paused = true)]
async fn transport_retries_back_off() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.script(
        "t",
        vec![transport(), transport(), transport(), completed("https://x/t.png")],
    );
    let engine = engine(&backend);
    let started = Instant::now();

    let finished = engine
        .run(job("t"), started, &CancellationToken::new(), |_| ControlFlow::Continue(()))
        .await
        .unwrap();

    // 2s interval, then 10s, 15s and 20s of backoff.
    assert_eq!(started.elapsed(), Duration::from_secs(47));
    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.transport_retries, 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_map_to_transport_error() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.script("t", std::iter::repeat_with(transport).take(4).collect());
    let engine = engine(&backend);

    let finished = engine
        .run(job("t"), Instant::now(), &CancellationToken::new(), |_| {
            ControlFlow::Continue(())
        })
        .await
        .unwrap();

    assert_matches!(
        into_outcome(&finished),
        Err(GenerationError::PollTransport { retries: 3, .. })
    );
}

#[tokio::test(start_paused = true)]
async fn observer_break_stops_the_loop() {
    let backend = Arc::new(ScriptedBackend::default());
    let engine = engine(&backend);
    let mut seen = 0;

    let outcome = engine
        .run(job("t"), Instant::now(), &CancellationToken::new(), |_| {
            seen += 1;
            if seen == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await;

    assert!(outcome.is_none());
    assert_eq!(backend.status_calls("t"), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_an_outstanding_query() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.delay_queries("t", Duration::from_secs(60));
    let engine = engine(&backend);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = engine
        .run(job("t"), started, &cancel, |_| ControlFlow::Continue(()))
        .await;

    assert!(outcome.is_none());
    assert_eq!(started.elapsed(), Duration::from_secs(5));
    assert_eq!(backend.status_calls("t"), 1);
}

#[test]
fn unfinished_jobs_have_no_outcome() {
    assert_matches!(into_outcome(&job("t")), Err(GenerationError::PollLogic(_)));
}
