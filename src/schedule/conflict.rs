//! The shared conflict predicate and its occupancy index.
//!
//! A candidate `(venue, start, duration)` is admissible when no booked
//! fixture at the same venue overlaps it and no booked fixture anywhere
//! starts within the rest period of either of its participants. Booked
//! intervals are expanded by the turnaround buffer ahead of their start, so
//! a candidate may begin right after a booked fixture ends but never close
//! ahead of one.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::entities::{Fixture, FixtureId, ParticipantId};

use super::models::ScheduleConfig;

/// A prospective assignment under test.
#[derive(Debug, Clone)]
pub struct SlotCandidate {
    pub fixture_id: FixtureId,
    pub home: Option<ParticipantId>,
    pub away: Option<ParticipantId>,
    pub venue: Option<String>,
    pub start: DateTime<Utc>,
    pub duration_mins: i64,
}

impl SlotCandidate {
    /// Build a candidate for a fixture at a specific slot.
    pub fn for_fixture(
        fixture: &Fixture,
        venue: Option<String>,
        start: DateTime<Utc>,
        duration_mins: i64,
    ) -> Self {
        Self {
            fixture_id: fixture.id,
            home: fixture.home,
            away: fixture.away,
            venue,
            start,
            duration_mins,
        }
    }

    fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.duration_mins)
    }

    fn participants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.home.iter().chain(self.away.iter()).copied()
    }
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// The venue is occupied across the candidate's interval
    VenueOccupied {
        venue: String,
        booked_start: DateTime<Utc>,
    },
    /// A participant plays too close to the candidate start
    RestPeriod {
        participant: ParticipantId,
        booked_start: DateTime<Utc>,
    },
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictReason::VenueOccupied { venue, booked_start } => write!(
                f,
                "venue {venue} is occupied around the fixture booked at {booked_start}"
            ),
            ConflictReason::RestPeriod {
                participant,
                booked_start,
            } => write!(
                f,
                "participant {participant} plays at {booked_start}, inside the rest period"
            ),
        }
    }
}

/// In-memory view of committed slots, keyed by venue and by participant.
///
/// The batch scheduler seeds this from persisted fixtures and extends it
/// after each commit so later fixtures in the same run see earlier ones.
#[derive(Debug, Default, Clone)]
pub struct Occupancy {
    /// Booked venue intervals, already expanded by the leading buffer
    venues: HashMap<String, Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    /// Booked kickoff times per participant, any venue
    participants: HashMap<ParticipantId, Vec<DateTime<Utc>>>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every fixture holding a committed slot, skipping `exclude`
    /// (so a reschedule never conflicts with the fixture's own old slot).
    pub fn from_fixtures(
        fixtures: &[Fixture],
        config: &ScheduleConfig,
        exclude: Option<FixtureId>,
    ) -> Self {
        let mut occupancy = Self::new();
        for fixture in fixtures {
            if Some(fixture.id) == exclude {
                continue;
            }
            occupancy.insert(fixture, config);
        }
        occupancy
    }

    /// Add one committed fixture to the index.
    pub fn insert(&mut self, fixture: &Fixture, config: &ScheduleConfig) {
        if !fixture.scheduling.holds_slot() {
            return;
        }
        let Some(start) = fixture.kickoff else {
            return;
        };
        let end = start + Duration::minutes(fixture.duration_mins);
        if let Some(venue) = &fixture.venue {
            self.venues
                .entry(venue.clone())
                .or_default()
                .push((start - config.buffer(), end));
        }
        for participant in fixture.participants() {
            self.participants.entry(participant).or_default().push(start);
        }
    }

    fn venue_conflict(
        &self,
        candidate: &SlotCandidate,
    ) -> Option<ConflictReason> {
        let venue = candidate.venue.as_ref()?;
        let intervals = self.venues.get(venue)?;
        intervals
            .iter()
            .find(|(booked_start, booked_end)| {
                candidate.start < *booked_end && *booked_start < candidate.end()
            })
            .map(|(booked_start, _)| ConflictReason::VenueOccupied {
                venue: venue.clone(),
                booked_start: *booked_start,
            })
    }

    fn rest_conflict(
        &self,
        candidate: &SlotCandidate,
        config: &ScheduleConfig,
    ) -> Option<ConflictReason> {
        let rest = config.rest_period();
        for participant in candidate.participants() {
            if let Some(starts) = self.participants.get(&participant) {
                if let Some(booked_start) = starts
                    .iter()
                    .find(|start| (**start - candidate.start).abs() <= rest)
                {
                    return Some(ConflictReason::RestPeriod {
                        participant,
                        booked_start: *booked_start,
                    });
                }
            }
        }
        None
    }
}

/// The conflict predicate shared by every scheduling path.
pub fn find_conflict(
    candidate: &SlotCandidate,
    occupancy: &Occupancy,
    config: &ScheduleConfig,
) -> Option<ConflictReason> {
    occupancy
        .venue_conflict(candidate)
        .or_else(|| occupancy.rest_conflict(candidate, config))
}
