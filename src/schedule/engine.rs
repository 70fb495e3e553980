//! Batch and manual slot assignment.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

use crate::db::{CompetitionRepository, FixtureFilter};
use crate::entities::{CompetitionId, Fixture, FixtureId, FixtureStatus, SchedulingStatus};
use crate::notify::{self, EngineEvent, EventKind, Notifier};

use super::conflict::{Occupancy, SlotCandidate, find_conflict};
use super::errors::{ScheduleError, ScheduleResult};
use super::models::{AutoScheduleOutcome, ScheduleAttempt, ScheduleConfig, ScheduleWindow};

/// Upper bound on a single booking's length, in minutes. Persisted-state
/// probes look this far back so a long booking that started before the probe
/// window is still seen by the venue check.
const MAX_BOOKING_MINS: i64 = 24 * 60;

/// Scheduling conflict engine.
///
/// Batch runs are serialized per competition: two concurrent `auto_schedule`
/// calls over overlapping windows and shared venues must not both observe a
/// free slot. On top of the lock, the predicate is re-checked against
/// persisted state immediately before every commit.
pub struct ScheduleEngine {
    repo: Arc<dyn CompetitionRepository>,
    notifier: Arc<dyn Notifier>,
    config: ScheduleConfig,
    locks: Mutex<HashMap<CompetitionId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ScheduleEngine {
    pub fn new(repo: Arc<dyn CompetitionRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_config(repo, notifier, ScheduleConfig::default())
    }

    pub fn with_config(
        repo: Arc<dyn CompetitionRepository>,
        notifier: Arc<dyn Notifier>,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            repo,
            notifier,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn competition_lock(&self, competition_id: CompetitionId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock map poisoned");
        locks.entry(competition_id).or_default().clone()
    }

    /// Widest interval whose booked fixtures can conflict with a candidate
    /// starting around `start`. A booking can still overlap the candidate
    /// when it started up to its own duration earlier, so the lookback is
    /// bounded by the longest booking the engine accepts rather than the
    /// candidate's duration.
    fn probe_span(
        &self,
        start: DateTime<Utc>,
        duration_mins: i64,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let longest = Duration::minutes(duration_mins.max(MAX_BOOKING_MINS));
        let margin = self.config.rest_period() + self.config.buffer() + longest;
        (start - margin, start + margin)
    }

    /// Search the window for a conflict-free slot for every unscheduled
    /// fixture of the competition, committing assignments first-fit.
    ///
    /// Per-fixture failures are captured as `conflicted` results and never
    /// abort the batch; already-committed assignments stay committed.
    pub async fn auto_schedule(
        &self,
        competition_id: CompetitionId,
        window: &ScheduleWindow,
    ) -> ScheduleResult<AutoScheduleOutcome> {
        window.validate()?;

        let lock = self.competition_lock(competition_id);
        let _guard = lock.lock().await;

        let pending = self
            .repo
            .load_fixtures(
                &FixtureFilter::competition(competition_id)
                    .scheduling(SchedulingStatus::Unscheduled),
            )
            .await?;

        // Pre-load every committed slot the window could collide with; the
        // rest period and a still-running earlier booking both reach beyond
        // the window bounds.
        let (span_start, span_end) = window.span();
        let reach =
            self.config.rest_period() + self.config.buffer() + Duration::minutes(MAX_BOOKING_MINS);
        let existing = self
            .repo
            .confirmed_in_window(span_start - reach, span_end + reach)
            .await?;
        let mut occupancy = Occupancy::from_fixtures(&existing, &self.config, None);

        let venues: Vec<Option<String>> = if window.venues.is_empty() {
            vec![None]
        } else {
            window.venues.iter().cloned().map(Some).collect()
        };

        let mut outcome = AutoScheduleOutcome::default();
        for mut fixture in pending {
            if fixture.status.is_terminal() {
                continue;
            }
            let duration = if fixture.duration_mins > 0 {
                fixture.duration_mins
            } else {
                self.config.default_duration_mins
            };

            let slot = self
                .find_slot(&fixture, window, &venues, duration, &occupancy)
                .await?;
            match slot {
                Some((start, venue)) => {
                    fixture.kickoff = Some(start);
                    fixture.venue = venue;
                    fixture.duration_mins = duration;
                    fixture.scheduling = SchedulingStatus::Confirmed;
                    fixture.auto_scheduled = true;
                    fixture.conflict_reason = None;
                    if fixture.status == FixtureStatus::Pending {
                        fixture.status = FixtureStatus::Scheduled;
                    }
                    self.repo.save_fixture(&fixture).await?;
                    occupancy.insert(&fixture, &self.config);
                    notify::emit(
                        self.notifier.as_ref(),
                        EngineEvent::new(EventKind::FixtureScheduled, competition_id)
                            .with_fixture(fixture.id)
                            .with_payload(serde_json::json!({
                                "start": start,
                                "venue": fixture.venue,
                            })),
                    )
                    .await;
                    outcome.assigned.push(fixture);
                }
                None => {
                    let reason = format!(
                        "no conflict-free slot between {} and {}",
                        window.start_date, window.end_date
                    );
                    debug!("fixture {} conflicted: {reason}", fixture.id);
                    fixture.scheduling = SchedulingStatus::Conflicted;
                    fixture.conflict_reason = Some(reason);
                    self.repo.save_fixture(&fixture).await?;
                    outcome.conflicted.push(fixture);
                }
            }
        }

        info!(
            "auto-schedule for competition {competition_id}: {} assigned, {} conflicted",
            outcome.assigned.len(),
            outcome.conflicted.len()
        );
        Ok(outcome)
    }

    /// First day/time/venue combination that passes the predicate against
    /// both the in-memory index and freshly persisted state.
    async fn find_slot(
        &self,
        fixture: &Fixture,
        window: &ScheduleWindow,
        venues: &[Option<String>],
        duration: i64,
        occupancy: &Occupancy,
    ) -> ScheduleResult<Option<(DateTime<Utc>, Option<String>)>> {
        for day in window.playable_days() {
            for start in window.slot_starts(day) {
                for venue in venues {
                    let candidate =
                        SlotCandidate::for_fixture(fixture, venue.clone(), start, duration);
                    if find_conflict(&candidate, occupancy, &self.config).is_some() {
                        continue;
                    }
                    // Re-check against persisted state so a slot committed by
                    // a concurrent writer since the pre-load is not double
                    // booked.
                    let (from, to) = self.probe_span(start, duration);
                    let persisted = self.repo.confirmed_in_window(from, to).await?;
                    let fresh = Occupancy::from_fixtures(&persisted, &self.config, Some(fixture.id));
                    if let Some(reason) = find_conflict(&candidate, &fresh, &self.config) {
                        debug!(
                            "slot {start} at {venue:?} lost to a concurrent commit: {reason}"
                        );
                        continue;
                    }
                    return Ok(Some((start, venue.clone())));
                }
            }
        }
        Ok(None)
    }

    /// Manually assign one fixture, checking the shared predicate against
    /// persisted state only.
    ///
    /// A conflict is not an error: the fixture is marked `conflicted` and the
    /// reason returned in the attempt.
    pub async fn schedule_fixture(
        &self,
        fixture_id: FixtureId,
        start: DateTime<Utc>,
        venue: Option<String>,
        duration_mins: i64,
    ) -> ScheduleResult<ScheduleAttempt> {
        let mut fixture = self.load(fixture_id).await?;
        if fixture.status.is_terminal() {
            return Err(ScheduleError::InvalidState {
                fixture_id,
                status: fixture.status,
            });
        }

        match self
            .check_persisted(&fixture, start, venue.clone(), duration_mins)
            .await?
        {
            None => {
                fixture.kickoff = Some(start);
                fixture.venue = venue;
                fixture.duration_mins = duration_mins;
                fixture.scheduling = SchedulingStatus::Confirmed;
                fixture.auto_scheduled = false;
                fixture.conflict_reason = None;
                if fixture.status == FixtureStatus::Pending {
                    fixture.status = FixtureStatus::Scheduled;
                }
                self.repo.save_fixture(&fixture).await?;
                notify::emit(
                    self.notifier.as_ref(),
                    EngineEvent::new(EventKind::FixtureScheduled, fixture.competition_id)
                        .with_fixture(fixture_id)
                        .with_payload(serde_json::json!({ "start": start })),
                )
                .await;
                Ok(ScheduleAttempt::committed())
            }
            Some(reason) => {
                let reason = reason.to_string();
                fixture.scheduling = SchedulingStatus::Conflicted;
                fixture.conflict_reason = Some(reason.clone());
                self.repo.save_fixture(&fixture).await?;
                Ok(ScheduleAttempt::conflicted(reason))
            }
        }
    }

    /// Move an already-assigned fixture, stamping the previous start and the
    /// caller's reason into the audit note.
    pub async fn reschedule(
        &self,
        fixture_id: FixtureId,
        new_start: DateTime<Utc>,
        new_venue: Option<String>,
        new_duration_mins: i64,
        reason: &str,
    ) -> ScheduleResult<ScheduleAttempt> {
        let mut fixture = self.load(fixture_id).await?;
        if fixture.status == FixtureStatus::Completed {
            return Err(ScheduleError::InvalidState {
                fixture_id,
                status: fixture.status,
            });
        }

        match self
            .check_persisted(&fixture, new_start, new_venue.clone(), new_duration_mins)
            .await?
        {
            None => {
                let previous = fixture
                    .kickoff
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| "unscheduled".to_string());
                fixture.audit_note = Some(format!("rescheduled from {previous}: {reason}"));
                fixture.kickoff = Some(new_start);
                fixture.venue = new_venue;
                fixture.duration_mins = new_duration_mins;
                fixture.scheduling = SchedulingStatus::Rescheduled;
                fixture.auto_scheduled = false;
                fixture.conflict_reason = None;
                self.repo.save_fixture(&fixture).await?;
                notify::emit(
                    self.notifier.as_ref(),
                    EngineEvent::new(EventKind::FixtureRescheduled, fixture.competition_id)
                        .with_fixture(fixture_id)
                        .with_payload(serde_json::json!({
                            "previous": previous,
                            "reason": reason,
                        })),
                )
                .await;
                Ok(ScheduleAttempt::committed())
            }
            Some(conflict) => {
                let conflict = conflict.to_string();
                fixture.scheduling = SchedulingStatus::Conflicted;
                fixture.conflict_reason = Some(conflict.clone());
                self.repo.save_fixture(&fixture).await?;
                Ok(ScheduleAttempt::conflicted(conflict))
            }
        }
    }

    async fn check_persisted(
        &self,
        fixture: &Fixture,
        start: DateTime<Utc>,
        venue: Option<String>,
        duration_mins: i64,
    ) -> ScheduleResult<Option<super::conflict::ConflictReason>> {
        if duration_mins <= 0 {
            return Err(ScheduleError::InvalidDuration(duration_mins));
        }
        let candidate = SlotCandidate::for_fixture(fixture, venue, start, duration_mins);
        let (from, to) = self.probe_span(start, duration_mins);
        let persisted = self.repo.confirmed_in_window(from, to).await?;
        let occupancy = Occupancy::from_fixtures(&persisted, &self.config, Some(fixture.id));
        Ok(find_conflict(&candidate, &occupancy, &self.config))
    }

    async fn load(&self, fixture_id: FixtureId) -> ScheduleResult<Fixture> {
        self.repo
            .get_fixture(fixture_id)
            .await?
            .ok_or(ScheduleError::FixtureNotFound(fixture_id))
    }
}
