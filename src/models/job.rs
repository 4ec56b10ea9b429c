//! Per-request job identity and state tracking.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Identifier generated once per request and threaded through staging,
/// conversion, and logging.
///
/// Deliberately never derived from the caller-supplied filename: two
/// concurrent uploads named `paper.pdf` must stage to distinct paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Lifecycle of one conversion job.
///
/// `Received -> Staged -> Converting -> {Completed, Failed}`, with the
/// terminal `Received -> Rejected` edge when format validation fails.
/// Rejected is the only edge on which no staged input exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Received,
    Staged,
    Converting,
    Completed,
    Failed,
    Rejected,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Received => "received",
            JobState::Staged => "staged",
            JobState::Converting => "converting",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Ephemeral record of one request's conversion job.
///
/// Owned exclusively by the request handler, never persisted, never shared
/// across requests. Exists so error logs can say which job reached which
/// stage before failing.
#[derive(Debug)]
pub struct JobRecord {
    pub id: JobId,
    pub filename: String,
    pub started_at: DateTime<Utc>,
    pub state: JobState,
}

impl JobRecord {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            filename: filename.into(),
            started_at: Utc::now(),
            state: JobState::Received,
        }
    }

    /// Move the job to its next state, leaving a trace of the transition.
    pub fn advance(&mut self, next: JobState) {
        tracing::debug!(job_id = %self.id, from = %self.state, to = %next, "job state change");
        self.state = next;
    }
}
