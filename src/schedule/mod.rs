//! Scheduling conflict engine.
//!
//! Two entry points share one conflict predicate: a batch searcher that walks
//! a calendar window assigning slots first-fit, and a single-fixture manual
//! path (plus reschedule-with-reason) that checks the same predicate against
//! persisted state.

pub mod conflict;
pub mod engine;
pub mod errors;
pub mod models;

pub use conflict::{ConflictReason, Occupancy, SlotCandidate, find_conflict};
pub use engine::ScheduleEngine;
pub use errors::{ScheduleError, ScheduleResult};
pub use models::{AutoScheduleOutcome, ScheduleAttempt, ScheduleConfig, ScheduleWindow};
