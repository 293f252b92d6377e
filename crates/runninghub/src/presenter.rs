//! Result presentation: preview, download and share.
//!
//! None of these operations can leave the user without their result.
//! A failed download degrades to a manual link, and a failed share
//! degrades to the clipboard and then to the bare URL.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mediagen_core::job::JobResult;
use mediagen_core::media::ResultKind;
use mediagen_core::types::TaskId;

/// Longest extension taken from a result URL.
const MAX_EXTENSION_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The result was written to `path`.
    Saved { path: PathBuf, bytes: u64 },
    /// The download failed; open `url` directly instead.
    Fallback { url: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
enum DownloadError {
    #[error("download request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("could not save file: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches finished results to local storage.
pub struct ResultPresenter {
    client: reqwest::Client,
    timeout: Duration,
}

impl ResultPresenter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// URL to show inline.
    pub fn preview_url(result: &JobResult) -> &str {
        &result.url
    }

    /// Download `result` into `dir` as `<task_id>.<ext>`.
    ///
    /// Never fails: any error yields [`DownloadOutcome::Fallback`].
    pub async fn download(&self, result: &JobResult, task_id: &TaskId, dir: &Path) -> DownloadOutcome {
        match self.try_download(result, task_id, dir).await {
            Ok((path, bytes)) => {
                tracing::info!(task_id = %task_id, path = %path.display(), bytes, "Result saved");
                DownloadOutcome::Saved { path, bytes }
            }
            Err(e) => {
                tracing::warn!(
                    task_id = %task_id,
                    url = %result.url,
                    error = %e,
                    "Download failed, falling back to direct link",
                );
                DownloadOutcome::Fallback {
                    url: result.url.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_download(
        &self,
        result: &JobResult,
        task_id: &TaskId,
        dir: &Path,
    ) -> Result<(PathBuf, u64), DownloadError> {
        let response = self
            .client
            .get(&result.url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(file_name_for(result, task_id));
        tokio::fs::write(&path, &body).await?;
        Ok((path, body.len() as u64))
    }
}

/// Local file name for a result: the sanitized task id plus the URL's
/// extension, or the kind's default extension.
pub fn file_name_for(result: &JobResult, task_id: &TaskId) -> String {
    let stem: String = task_id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let stem = if stem.is_empty() { "result".to_string() } else { stem };

    let extension = url::Url::parse(&result.url)
        .ok()
        .and_then(|url| {
            let segment = url.path_segments()?.next_back()?.to_string();
            let (_, ext) = segment.rsplit_once('.')?;
            let valid = !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric());
            valid.then(|| ext.to_ascii_lowercase())
        })
        .unwrap_or_else(|| result.kind.default_extension().to_string());

    format!("{stem}.{extension}")
}

// ---------------------------------------------------------------------------
// Sharing
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("sharing is not available here")]
    Unavailable,

    #[error("share failed: {0}")]
    Failed(String),
}

/// Platform hooks used by [`share`].
pub trait ShareChannel {
    /// Open the platform share sheet.
    fn native_share(&self, title: &str, url: &str) -> Result<(), ShareError>;

    fn copy_to_clipboard(&self, text: &str) -> Result<(), ShareError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Copied,
    /// Nothing worked; show the URL for manual copying.
    Manual { url: String },
}

/// Share a result through the best available channel.
pub fn share(result: &JobResult, channel: &dyn ShareChannel) -> ShareOutcome {
    let title = match result.kind {
        ResultKind::Image => "Check out my AI-generated image",
        ResultKind::Video => "Check out my AI-generated video",
    };

    match channel.native_share(title, &result.url) {
        Ok(()) => return ShareOutcome::Shared,
        Err(ShareError::Unavailable) => {}
        Err(e) => tracing::debug!(error = %e, "Native share failed, trying clipboard"),
    }

    match channel.copy_to_clipboard(&result.url) {
        Ok(()) => ShareOutcome::Copied,
        Err(e) => {
            tracing::debug!(error = %e, "Clipboard unavailable");
            ShareOutcome::Manual {
                url: result.url.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn image(url: &str) -> JobResult {
        JobResult {
            url: url.into(),
            kind: ResultKind::Image,
        }
    }

    // -- file_name_for -------------------------------------------------------

    #[test]
    fn file_name_uses_url_extension() {
        let name = file_name_for(&image("https://cdn.x/out/abc.JPG?sig=1"), &TaskId::new("t1"));
        assert_eq!(name, "t1.jpg");
    }

    #[test]
    fn file_name_falls_back_to_kind_extension() {
        let video = JobResult {
            url: "https://cdn.x/render".into(),
            kind: ResultKind::Video,
        };
        assert_eq!(file_name_for(&video, &TaskId::new("t2")), "t2.mp4");
        assert_eq!(
            file_name_for(&image("not a url"), &TaskId::new("t3")),
            "t3.png"
        );
    }

    #[test]
    fn file_name_sanitizes_task_id() {
        let name = file_name_for(&image("https://x/y.webp"), &TaskId::new("../a b"));
        assert_eq!(name, "___a_b.webp");
    }

    // -- share ---------------------------------------------------------------

    struct FakeChannel {
        native: Option<Result<(), ShareError>>,
        clipboard: bool,
        copied: RefCell<Vec<String>>,
    }

    impl ShareChannel for FakeChannel {
        fn native_share(&self, _title: &str, _url: &str) -> Result<(), ShareError> {
            match &self.native {
                None => Err(ShareError::Unavailable),
                Some(Ok(())) => Ok(()),
                Some(Err(_)) => Err(ShareError::Failed("cancelled".into())),
            }
        }

        fn copy_to_clipboard(&self, text: &str) -> Result<(), ShareError> {
            if self.clipboard {
                self.copied.borrow_mut().push(text.to_string());
                Ok(())
            } else {
                Err(ShareError::Unavailable)
            }
        }
    }

    #[test]
    fn share_prefers_native_sheet() {
        let channel = FakeChannel {
            native: Some(Ok(())),
            clipboard: true,
            copied: RefCell::default(),
        };
        assert_eq!(share(&image("https://x/y.png"), &channel), ShareOutcome::Shared);
        assert!(channel.copied.borrow().is_empty());
    }

    #[test]
    fn share_falls_back_to_clipboard() {
        let channel = FakeChannel {
            native: Some(Err(ShareError::Unavailable)),
            clipboard: true,
            copied: RefCell::default(),
        };
        assert_eq!(share(&image("https://x/y.png"), &channel), ShareOutcome::Copied);
        assert_eq!(*channel.copied.borrow(), vec!["https://x/y.png".to_string()]);
    }

    #[test]
    fn share_falls_back_to_manual_link() {
        let channel = FakeChannel {
            native: None,
            clipboard: false,
            copied: RefCell::default(),
        };
        assert_eq!(
            share(&image("https://x/y.png"), &channel),
            ShareOutcome::Manual {
                url: "https://x/y.png".into()
            }
        );
    }

    #[test]
    fn preview_is_the_result_url() {
        let result = image("https://x/y.png");
        assert_eq!(ResultPresenter::preview_url(&result), "https://x/y.png");
    }
}
