/// Executor-assigned job identifier. Opaque, never reused.
pub type JobId = String;

/// Executor-assigned identifier for an uploaded artifact bundle.
pub type BundleId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
