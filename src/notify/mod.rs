//! Outbound notification sink.
//!
//! The engine emits one event per state transition (fixture scheduled,
//! fixture completed, bracket advanced) for downstream broadcast. Delivery is
//! fire-and-forget: a sink failure is logged and never surfaces to the
//! caller, and the engine never blocks on delivery beyond the sink's own
//! bounded call.

use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::entities::{CompetitionId, FixtureId};

/// Engine state-transition event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FixtureScheduled,
    FixtureRescheduled,
    FixtureCompleted,
    BracketAdvanced,
    CompetitionCompleted,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::FixtureScheduled => write!(f, "fixture_scheduled"),
            EventKind::FixtureRescheduled => write!(f, "fixture_rescheduled"),
            EventKind::FixtureCompleted => write!(f, "fixture_completed"),
            EventKind::BracketAdvanced => write!(f, "bracket_advanced"),
            EventKind::CompetitionCompleted => write!(f, "competition_completed"),
        }
    }
}

/// One engine state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEvent {
    pub kind: EventKind,
    pub competition_id: CompetitionId,
    pub fixture_id: Option<FixtureId>,
    /// Free-form detail for downstream consumers
    pub payload: serde_json::Value,
}

impl EngineEvent {
    pub fn new(kind: EventKind, competition_id: CompetitionId) -> Self {
        Self {
            kind,
            competition_id,
            fixture_id: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_fixture(mut self, fixture_id: FixtureId) -> Self {
        self.fixture_id = Some(fixture_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Downstream broadcast sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: EngineEvent) -> anyhow::Result<()>;
}

/// Deliver an event, swallowing and logging any sink failure.
pub(crate) async fn emit(notifier: &dyn Notifier, event: EngineEvent) {
    let kind = event.kind;
    let fixture_id = event.fixture_id;
    if let Err(err) = notifier.notify(event).await {
        warn!("notification sink rejected {kind} for fixture {fixture_id:?}: {err:#}");
    }
}

/// Default sink that writes events to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: EngineEvent) -> anyhow::Result<()> {
        info!(
            "event {} competition {} fixture {:?}",
            event.kind, event.competition_id, event.fixture_id
        );
        Ok(())
    }
}

/// Recording sink for tests.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<EngineEvent>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<EngineEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn kinds(&self) -> Vec<EventKind> {
            self.events().into_iter().map(|e| e.kind).collect()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, event: EngineEvent) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }
}
