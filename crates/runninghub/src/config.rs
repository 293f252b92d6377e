use std::time::Duration;

/// Connection settings for the RunningHub proxy endpoints.
///
/// All fields have defaults suitable for a local proxy. Override them
/// with environment variables.
#[derive(Debug, Clone)]
pub struct RunningHubConfig {
    /// Base URL of the proxy (default: `http://localhost:3000`).
    pub base_url: String,
    /// Multipart upload endpoint path.
    pub upload_path: String,
    /// Job submission endpoint path.
    pub submit_path: String,
    /// Status query endpoint path.
    pub status_path: String,
    /// Web-app identifier forwarded with every submission, if set.
    pub webapp_id: Option<String>,
    /// Timeout for uploads, submissions and result downloads.
    pub request_timeout: Duration,
    /// Abort a single status query after this long.
    pub status_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

impl Default for RunningHubConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            upload_path: "/api/runninghub/upload".into(),
            submit_path: "/api/runninghub".into(),
            status_path: "/api/runninghub/status".into(),
            webapp_id: None,
            request_timeout: Duration::from_secs(60),
            status_timeout: Duration::from_secs(30),
        }
    }
}

impl RunningHubConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                           | Default                   |
    /// |-----------------------------------|---------------------------|
    /// | `RUNNINGHUB_BASE_URL`             | `http://localhost:3000`   |
    /// | `RUNNINGHUB_UPLOAD_PATH`          | `/api/runninghub/upload`  |
    /// | `RUNNINGHUB_SUBMIT_PATH`          | `/api/runninghub`         |
    /// | `RUNNINGHUB_STATUS_PATH`          | `/api/runninghub/status`  |
    /// | `RUNNINGHUB_WEBAPP_ID`            | unset                     |
    /// | `RUNNINGHUB_REQUEST_TIMEOUT_SECS` | `60`                      |
    /// | `RUNNINGHUB_STATUS_TIMEOUT_SECS`  | `30`                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let string = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };
        let secs = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(n) if n > 0 => Ok(Duration::from_secs(n)),
                    _ => Err(ConfigError::Invalid {
                        var: key,
                        expected: "a positive number of seconds",
                        value: raw,
                    }),
                },
            }
        };

        let base_url = string("RUNNINGHUB_BASE_URL", defaults.base_url);
        if url::Url::parse(&base_url).is_err() {
            return Err(ConfigError::Invalid {
                var: "RUNNINGHUB_BASE_URL",
                expected: "an absolute URL",
                value: base_url,
            });
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            upload_path: string("RUNNINGHUB_UPLOAD_PATH", defaults.upload_path),
            submit_path: string("RUNNINGHUB_SUBMIT_PATH", defaults.submit_path),
            status_path: string("RUNNINGHUB_STATUS_PATH", defaults.status_path),
            webapp_id: lookup("RUNNINGHUB_WEBAPP_ID").filter(|v| !v.trim().is_empty()),
            request_timeout: secs("RUNNINGHUB_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            status_timeout: secs("RUNNINGHUB_STATUS_TIMEOUT_SECS", defaults.status_timeout)?,
        })
    }

    pub fn upload_url(&self) -> String {
        format!("{}{}", self.base_url, self.upload_path)
    }

    pub fn submit_url(&self) -> String {
        format!("{}{}", self.base_url, self.submit_path)
    }

    pub fn status_url(&self) -> String {
        format!("{}{}", self.base_url, self.status_path)
    }
}
