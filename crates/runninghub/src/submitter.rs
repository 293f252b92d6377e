//! Upload adapter and job submitter.
//!
//! Turns validated local media into remote file references, then sends
//! a single submission. Pair tools upload both of their files
//! concurrently; everything else runs sequentially. Submission is never
//! retried.

use mediagen_core::media::UploadedMedia;
use mediagen_core::params::{JobParams, SubmitRequest};
use mediagen_core::tools::ToolProfile;
use mediagen_core::types::{RemoteFileReference, TaskId};

use crate::backend::GenerationBackend;
use crate::error::{SubmissionError, UploadError};

/// Upload every file in `params`, preserving its shape.
///
/// Stops at the first failed upload, so a rejected file never leads to
/// a submit call.
pub async fn upload_inputs<B>(
    backend: &B,
    params: &JobParams<UploadedMedia>,
) -> Result<JobParams<RemoteFileReference>, UploadError>
where
    B: GenerationBackend + ?Sized,
{
    for media in params.files() {
        if media.exceeds_size_guideline() {
            tracing::warn!(
                file_name = media.file_name(),
                bytes = media.size(),
                "File is larger than the recommended 10 MB; upload may be slow or rejected",
            );
        }
    }

    let uploaded = match params.files().as_slice() {
        [first, second] => {
            let (a, b) = futures::try_join!(backend.upload(first), backend.upload(second))?;
            vec![a, b]
        }
        files => {
            let mut refs = Vec::with_capacity(files.len());
            for media in files {
                refs.push(backend.upload(media).await?);
            }
            refs
        }
    };

    let mut refs = uploaded.into_iter();
    params
        .borrowed()
        .try_map_files(|_| refs.next().ok_or(UploadError::MissingFileId))
}

/// Build a [`SubmitRequest`] for `profile` and submit it.
pub async fn submit_job<B>(
    backend: &B,
    profile: &ToolProfile,
    webapp_id: Option<String>,
    params: JobParams<RemoteFileReference>,
) -> Result<TaskId, SubmissionError>
where
    B: GenerationBackend + ?Sized,
{
    let request = SubmitRequest {
        action: profile.action.clone(),
        webapp_id,
        params,
    };
    let task_id = backend.submit(&request).await?;

    tracing::info!(
        tool = %profile.kind,
        task_id = %task_id,
        "Generation job submitted",
    );
    Ok(task_id)
}
