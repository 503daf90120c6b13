//! Job identifiers and status snapshots.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a job.
///
/// `Running` while clips are outstanding, `Draining` once the last clip has
/// reported but the source file has not been removed yet, `Complete` after
/// cleanup ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Running,
    Draining,
    Complete,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Draining => "draining",
            JobState::Complete => "complete",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A clip that was written successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SucceededClip {
    pub name: String,
    pub filename: String,
}

/// A clip the encoder could not produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FailedClip {
    pub name: String,
    pub reason: String,
}

/// Point-in-time view of a job, as returned by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobStatus {
    pub job_id: JobId,
    pub state: JobState,
    pub total_clips: usize,
    pub outstanding: usize,
    /// Successful clips in completion order
    pub succeeded: Vec<SucceededClip>,
    /// Failed clips in completion order
    pub failed: Vec<FailedClip>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_job_state_serialization() {
        assert_eq!(serde_json::to_string(&JobState::Draining).unwrap(), "\"draining\"");
        assert!(JobState::Complete.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }

    #[test]
    fn test_status_omits_missing_completion() {
        let status = JobStatus {
            job_id: JobId::from_string("abc"),
            state: JobState::Running,
            total_clips: 2,
            outstanding: 2,
            succeeded: Vec::new(),
            failed: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["job_id"], "abc");
        assert_eq!(json["state"], "running");
        assert!(json.get("completed_at").is_none());
    }
}
