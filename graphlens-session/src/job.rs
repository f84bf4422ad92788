//! Query job lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};
use graphlens_types::{LibId, QueryResult};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`QueryJob`].
///
/// `Idle → Running → {Completed, Cancelled, Failed}`. The three terminal
/// states never change again; a new query always gets a new job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Allocated but not started.
    #[default]
    Idle,
    /// The server is working on it; results may still arrive.
    Running,
    /// The stream reached its end.
    Completed,
    /// The server confirmed cancellation.
    Cancelled,
    /// The transport failed or the server reported an error.
    Failed,
}

impl JobState {
    /// Whether the job can no longer change.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Session-local handle of one submitted query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(pub u64);

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// One in-flight or finished query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryJob {
    /// Session-local handle.
    pub handle: JobHandle,
    /// Library the server keys the job by; cancellation targets this id.
    pub lib_id: LibId,
    /// Current lifecycle state.
    pub state: JobState,
    /// Everything merged from the job's payloads so far.
    pub result: QueryResult,
    /// The first failure reported for the job.
    pub error: Option<String>,
    /// History entry the job's answer is written to, once one exists.
    pub entry_id: Option<u64>,
    /// When the job was submitted.
    pub started_at: DateTime<Utc>,
    /// When the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
}

impl QueryJob {
    pub(crate) fn new(handle: JobHandle, lib_id: LibId) -> Self {
        Self {
            handle,
            lib_id,
            state: JobState::Idle,
            result: QueryResult::default(),
            error: None,
            entry_id: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Whether the job is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }

    /// Move to `next` if the state machine allows it.
    ///
    /// Returns `false` and leaves the job unchanged otherwise.
    pub(crate) fn transition(&mut self, next: JobState) -> bool {
        let allowed = match (self.state, next) {
            (JobState::Idle, JobState::Running) => true,
            (JobState::Running, next) => next.is_terminal(),
            _ => false,
        };
        if allowed {
            tracing::debug!(job = %self.handle, from = %self.state, to = %next, "job transition");
            self.state = next;
            if next.is_terminal() {
                self.finished_at = Some(Utc::now());
            }
        }
        allowed
    }

    /// Record `error` as the job's failure and fail it if it is running.
    pub(crate) fn fail(&mut self, error: String) {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self.transition(JobState::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> QueryJob {
        let mut job = QueryJob::new(JobHandle(1), LibId::new(9));
        assert!(job.transition(JobState::Running));
        job
    }

    #[test]
    fn terminal_states() {
        assert!(!JobState::Idle.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }

    #[test]
    fn idle_only_starts() {
        let mut job = QueryJob::new(JobHandle(1), LibId::new(9));
        assert!(!job.transition(JobState::Completed));
        assert_eq!(job.state, JobState::Idle);
        assert!(job.finished_at.is_none());
    }

    #[test]
    fn terminal_states_are_stable() {
        let mut job = running();
        assert!(job.transition(JobState::Failed));
        assert!(!job.transition(JobState::Completed));
        assert!(!job.transition(JobState::Running));
        assert_eq!(job.state, JobState::Failed);
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn first_error_is_kept() {
        let mut job = running();
        job.fail("llm timeout".into());
        job.fail("connection reset".into());
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.as_deref(), Some("llm timeout"));
    }

    #[test]
    fn state_wire_names() {
        assert_eq!(
            serde_json::to_string(&JobState::Cancelled).unwrap(),
            r#""cancelled""#
        );
        assert_eq!(JobHandle(3).to_string(), "job-3");
    }
}
