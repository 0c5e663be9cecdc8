use std::path::PathBuf;
use std::time::Duration;

/// Developer-side configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the data-owner executor.
    pub executor_url: String,
    /// Directory scanned for model artifact files.
    pub artifact_dir: PathBuf,
    /// Delay between status samples.
    pub poll_interval: Duration,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var             | Default                  |
    /// |---------------------|--------------------------|
    /// | `EXECUTOR_URL`      | `http://localhost:5001`  |
    /// | `ARTIFACT_DIR`      | `.`                      |
    /// | `POLL_INTERVAL_MS`  | `5000`                   |
    /// | `HTTP_TIMEOUT_SECS` | `30`                     |
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let executor_url =
            lookup("EXECUTOR_URL").unwrap_or_else(|| "http://localhost:5001".into());

        let artifact_dir = PathBuf::from(lookup("ARTIFACT_DIR").unwrap_or_else(|| ".".into()));

        let poll_interval_ms: u64 = lookup("POLL_INTERVAL_MS")
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(5000);

        let http_timeout_secs: u64 = lookup("HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Self {
            executor_url,
            artifact_dir,
            poll_interval: Duration::from_millis(poll_interval_ms),
            http_timeout: Duration::from_secs(http_timeout_secs),
        }
    }
}
