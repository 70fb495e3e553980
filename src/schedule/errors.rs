//! Scheduling error types.

use thiserror::Error;

use crate::entities::{FixtureId, FixtureStatus};

/// Scheduling errors
///
/// Per-fixture conflicts are not errors: the batch scheduler captures them as
/// `conflicted` results, and the manual path returns the reason in its
/// outcome. Only structural problems and upstream failures surface here.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid schedule window: {0}")]
    InvalidWindow(String),

    #[error("fixture not found: {0}")]
    FixtureNotFound(FixtureId),

    #[error("fixture {fixture_id} cannot be scheduled in state {status}")]
    InvalidState {
        fixture_id: FixtureId,
        status: FixtureStatus,
    },

    #[error("duration must be positive, got {0} minutes")]
    InvalidDuration(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ScheduleError {
    /// Caller-safe message; database detail is not exposed.
    pub fn client_message(&self) -> String {
        match self {
            ScheduleError::Database(_) => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for scheduling operations
pub type ScheduleResult<T> = Result<T, ScheduleError>;
