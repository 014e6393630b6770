//! Job event domain model.
//!
//! # Responsibility
//! - Represent one observed state change of a monitored job.
//! - Bind the record to its `job_event` schema shape.
//!
//! # Invariants
//! - `event_id` is stable and never reused for another event.
//! - `timestamp_ms` is the observation time in epoch milliseconds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{FieldValue, Record};

/// Stable identifier for every job event.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type JobEventId = Uuid;

/// Lifecycle state reported for a monitored job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted by the scheduler, not yet running.
    Submitted,
    /// Currently executing.
    Running,
    /// Finished with a zero exit status.
    Succeeded,
    /// Finished with a failure.
    Failed,
}

/// One observed state change of a monitored job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Stable global ID used for linking and merge identity.
    pub event_id: JobEventId,
    /// Scheduler-facing job name.
    pub job_name: String,
    /// Reported lifecycle state.
    pub state: JobState,
    /// Observation time in epoch milliseconds.
    pub timestamp_ms: i64,
    /// Process exit status, meaningful for terminal states.
    pub exit_code: Option<i64>,
    /// Free-form diagnostic attached by the reporting side.
    pub message: Option<String>,
}

impl JobEvent {
    /// Creates a new event with a generated stable ID.
    pub fn new(job_name: impl Into<String>, state: JobState, timestamp_ms: i64) -> Self {
        Self::with_id(Uuid::new_v4(), job_name, state, timestamp_ms)
    }

    /// Creates an event with a caller-provided stable ID.
    ///
    /// Used by replay/import paths where identity already exists externally.
    pub fn with_id(
        event_id: JobEventId,
        job_name: impl Into<String>,
        state: JobState,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            event_id,
            job_name: job_name.into(),
            state,
            timestamp_ms,
            exit_code: None,
            message: None,
        }
    }

    /// Returns whether the reported state ends the job lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Succeeded | JobState::Failed)
    }
}

impl Record for JobEvent {
    fn table(&self) -> &'static str {
        "job_event"
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("event_id", FieldValue::Text(self.event_id.to_string())),
            ("job_name", FieldValue::Text(self.job_name.clone())),
            (
                "state",
                FieldValue::Text(job_state_to_db(self.state).to_string()),
            ),
            ("timestamp_ms", FieldValue::Integer(self.timestamp_ms)),
            (
                "exit_code",
                self.exit_code.map_or(FieldValue::Null, FieldValue::Integer),
            ),
            (
                "message",
                self.message
                    .clone()
                    .map_or(FieldValue::Null, FieldValue::Text),
            ),
        ]
    }

    fn key_columns(&self) -> &'static [&'static str] {
        &["event_id"]
    }
}

fn job_state_to_db(state: JobState) -> &'static str {
    match state {
        JobState::Submitted => "submitted",
        JobState::Running => "running",
        JobState::Succeeded => "succeeded",
        JobState::Failed => "failed",
    }
}
