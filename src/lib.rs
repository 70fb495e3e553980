//! # Competition Engine
//!
//! Competition structuring and scheduling for sports platforms: bracket
//! topology generation, result-driven advancement, and conflict-free fixture
//! scheduling.
//!
//! The engine is a library consumed by request handlers. It has no wire
//! protocol of its own; persistence and notification are collaborators
//! behind traits.
//!
//! ## Core Modules
//!
//! - [`bracket`]: turns a roster of participants into a single-elimination,
//!   round-robin, or group+knockout topology with forward links and byes
//! - [`advance`]: the per-fixture state machine that records results and
//!   propagates winners into the next round
//! - [`schedule`]: assigns calendar slots to fixtures while avoiding venue
//!   overlap and participant rest-period conflicts
//! - [`db`]: PostgreSQL-backed repository for fixtures and bracket entries
//! - [`notify`]: fire-and-forget event sink for downstream broadcast
//!
//! ## Example
//!
//! ```
//! use competition_engine::bracket::{build_bracket, BracketOptions, CompetitionFormat};
//! use competition_engine::entities::Participant;
//! use uuid::Uuid;
//!
//! let participants: Vec<Participant> = (0..4)
//!     .map(|i| Participant::new(format!("Club {i}")))
//!     .collect();
//!
//! let plan = build_bracket(
//!     Uuid::new_v4(),
//!     &participants,
//!     CompetitionFormat::SingleElimination,
//!     &BracketOptions::default(),
//! )
//! .unwrap();
//!
//! // 4 participants: two semi-finals and a final, no byes.
//! assert_eq!(plan.fixtures.len(), 3);
//! ```

/// Shared value types: participants, fixtures, bracket entries, groups.
pub mod entities;
pub use entities::{
    BracketEntry, CompetitionId, Fixture, FixtureId, FixtureStatus, Group, Participant,
    ParticipantId, SchedulingStatus, Slot,
};

/// Bracket topology generation.
pub mod bracket;
pub use bracket::{BracketError, BracketOptions, BracketPlan, CompetitionFormat, build_bracket};

/// Result entry and winner propagation.
pub mod advance;
pub use advance::{AdvanceError, Advancement, AdvancementPropagator};

/// Slot search and conflict-free scheduling.
pub mod schedule;
pub use schedule::{
    AutoScheduleOutcome, ScheduleAttempt, ScheduleConfig, ScheduleEngine, ScheduleError,
    ScheduleWindow,
};

/// Database pool, configuration, and repository.
pub mod db;
pub use db::{CompetitionRepository, Database, DatabaseConfig};

/// Outbound event sink.
pub mod notify;
pub use notify::{EngineEvent, EventKind, Notifier};
