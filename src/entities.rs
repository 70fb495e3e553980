//! Shared data model for the structuring and scheduling engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Competition ID type
pub type CompetitionId = Uuid;

/// Participant ID type
pub type ParticipantId = Uuid;

/// Fixture ID type
pub type FixtureId = Uuid;

/// A registered participant, owned by the external registry.
///
/// Immutable once a bracket has been generated for its competition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant ID
    pub id: ParticipantId,
    /// Display name
    pub name: String,
    /// Optional seed rank (1 = strongest)
    pub seed: Option<u32>,
}

impl Participant {
    /// Create an unseeded participant with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            seed: None,
        }
    }

    /// Attach a seed rank
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Fixture lifecycle status, driven by result entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureStatus {
    Pending,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl FixtureStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, FixtureStatus::Completed | FixtureStatus::Cancelled)
    }
}

impl std::fmt::Display for FixtureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixtureStatus::Pending => write!(f, "pending"),
            FixtureStatus::Scheduled => write!(f, "scheduled"),
            FixtureStatus::InProgress => write!(f, "in_progress"),
            FixtureStatus::Completed => write!(f, "completed"),
            FixtureStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Fixture scheduling status, driven by the scheduling engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingStatus {
    Unscheduled,
    Confirmed,
    Rescheduled,
    Conflicted,
}

impl SchedulingStatus {
    /// Whether the fixture currently holds a committed time/venue slot.
    pub fn holds_slot(self) -> bool {
        matches!(self, SchedulingStatus::Confirmed | SchedulingStatus::Rescheduled)
    }
}

impl std::fmt::Display for SchedulingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulingStatus::Unscheduled => write!(f, "unscheduled"),
            SchedulingStatus::Confirmed => write!(f, "confirmed"),
            SchedulingStatus::Rescheduled => write!(f, "rescheduled"),
            SchedulingStatus::Conflicted => write!(f, "conflicted"),
        }
    }
}

/// Which slot of the next fixture a winner occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Home,
    Away,
}

/// A single match within a competition.
///
/// `round` is depth-based for elimination brackets (1 = final, increasing
/// away from the final) and a flat ascending counter for round-robin play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// Fixture ID
    pub id: FixtureId,
    /// Owning competition
    pub competition_id: CompetitionId,
    /// Round number
    pub round: u32,
    /// Bracket position index within the round
    pub position: u32,
    /// Group name, for group-stage fixtures only
    pub group: Option<String>,
    /// Home participant (None = to be decided)
    pub home: Option<ParticipantId>,
    /// Away participant (None = to be decided)
    pub away: Option<ParticipantId>,
    /// Lifecycle status
    pub status: FixtureStatus,
    /// Scheduling status
    pub scheduling: SchedulingStatus,
    /// Assigned start time
    pub kickoff: Option<DateTime<Utc>>,
    /// Assigned venue
    pub venue: Option<String>,
    /// Duration estimate in minutes
    pub duration_mins: i64,
    /// Home score, once completed
    pub home_score: Option<i64>,
    /// Away score, once completed
    pub away_score: Option<i64>,
    /// The fixture the winner advances into (None for finals and round-robin)
    pub next_fixture_id: Option<FixtureId>,
    /// The slot of the next fixture the winner occupies
    pub next_slot: Option<Slot>,
    /// Third-place consolation fixture
    pub consolation: bool,
    /// Whether the current assignment came from the batch scheduler
    pub auto_scheduled: bool,
    /// Scheduling priority; fixtures that must play earlier rank higher
    pub priority: i32,
    /// Human-readable reason when scheduling is conflicted
    pub conflict_reason: Option<String>,
    /// Audit note stamped by reschedules
    pub audit_note: Option<String>,
    /// Creation timestamp; stable tie-break for scheduling order
    pub created_at: DateTime<Utc>,
}

impl Fixture {
    /// Create an empty pending fixture.
    pub fn new(competition_id: CompetitionId, round: u32, position: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            competition_id,
            round,
            position,
            group: None,
            home: None,
            away: None,
            status: FixtureStatus::Pending,
            scheduling: SchedulingStatus::Unscheduled,
            kickoff: None,
            venue: None,
            duration_mins: 90,
            home_score: None,
            away_score: None,
            next_fixture_id: None,
            next_slot: None,
            consolation: false,
            auto_scheduled: false,
            priority: 0,
            conflict_reason: None,
            audit_note: None,
            created_at: Utc::now(),
        }
    }

    /// Participants currently assigned to this fixture.
    pub fn participants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.home.iter().chain(self.away.iter()).copied()
    }

    /// Whether the given participant is on either side.
    pub fn involves(&self, participant: ParticipantId) -> bool {
        self.home == Some(participant) || self.away == Some(participant)
    }

    /// Winner by higher score, if completed and decisive.
    pub fn winner(&self) -> Option<ParticipantId> {
        match (self.home_score, self.away_score) {
            (Some(h), Some(a)) if h > a => self.home,
            (Some(h), Some(a)) if a > h => self.away,
            _ => None,
        }
    }

    /// Set one side of the fixture.
    pub fn set_slot(&mut self, slot: Slot, participant: ParticipantId) {
        match slot {
            Slot::Home => self.home = Some(participant),
            Slot::Away => self.away = Some(participant),
        }
    }

    /// Read one side of the fixture.
    pub fn slot(&self, slot: Slot) -> Option<ParticipantId> {
        match slot {
            Slot::Home => self.home,
            Slot::Away => self.away,
        }
    }
}

/// Auxiliary record binding an elimination fixture to its bracket context.
///
/// Created once per fixture at generation time; `next_fixture_id` is wired
/// during generation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketEntry {
    /// The fixture this entry describes
    pub fixture_id: FixtureId,
    /// Round number (1 = final)
    pub round: u32,
    /// Position within the round
    pub position: u32,
    /// Best seed rank among the fixture's initial participants
    pub seed: Option<u32>,
    /// Forward link, mirrored from the fixture
    pub next_fixture_id: Option<FixtureId>,
}

/// Human-readable name for an elimination round.
///
/// 1 = final, 2 = semi-final, 3 = quarter-final, deeper rounds are named by
/// the number of remaining participants.
pub fn round_name(round: u32) -> String {
    match round {
        1 => "final".to_string(),
        2 => "semi-final".to_string(),
        3 => "quarter-final".to_string(),
        4 => "round-of-16".to_string(),
        5 => "round-of-32".to_string(),
        k => format!("round_of_{}", 1u64 << k),
    }
}

/// A standings row for one group member, computed from completed fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStanding {
    pub participant_id: ParticipantId,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub scored: i64,
    pub conceded: i64,
    pub points: i64,
}

impl GroupStanding {
    fn new(participant_id: ParticipantId) -> Self {
        Self {
            participant_id,
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            scored: 0,
            conceded: 0,
            points: 0,
        }
    }

    /// Score difference, the first standings tie-break.
    pub fn difference(&self) -> i64 {
        self.scored - self.conceded
    }
}

/// A named subset of participants with its own round-robin fixtures.
///
/// Standings are never stored; they are derived from completed fixtures on
/// every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group name ("Group A", "Group B", ...)
    pub name: String,
    /// Member participants, in assignment order
    pub members: Vec<ParticipantId>,
    /// Number of round-robin rounds in this group
    pub rounds: u32,
}

impl Group {
    /// Compute the standings table from the group's completed fixtures.
    ///
    /// Ordering: points, then score difference, then scored, ties broken by
    /// stable member order. Win = 3, draw = 1.
    pub fn standings(&self, fixtures: &[Fixture]) -> Vec<GroupStanding> {
        let mut rows: Vec<GroupStanding> =
            self.members.iter().map(|&m| GroupStanding::new(m)).collect();

        for fixture in fixtures {
            if fixture.group.as_deref() != Some(self.name.as_str())
                || fixture.status != FixtureStatus::Completed
            {
                continue;
            }
            let (Some(home), Some(away)) = (fixture.home, fixture.away) else {
                continue;
            };
            let (Some(hs), Some(a_s)) = (fixture.home_score, fixture.away_score) else {
                continue;
            };
            for row in rows.iter_mut() {
                let (for_, against) = if row.participant_id == home {
                    (hs, a_s)
                } else if row.participant_id == away {
                    (a_s, hs)
                } else {
                    continue;
                };
                row.played += 1;
                row.scored += for_;
                row.conceded += against;
                if for_ > against {
                    row.won += 1;
                    row.points += 3;
                } else if for_ == against {
                    row.drawn += 1;
                    row.points += 1;
                } else {
                    row.lost += 1;
                }
            }
        }

        rows.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(b.difference().cmp(&a.difference()))
                .then(b.scored.cmp(&a.scored))
        });
        rows
    }

    /// Top `per_group` finishers, for seeding a knockout stage.
    pub fn qualifiers(&self, fixtures: &[Fixture], per_group: usize) -> Vec<ParticipantId> {
        self.standings(fixtures)
            .into_iter()
            .take(per_group)
            .map(|row| row.participant_id)
            .collect()
    }

    /// Whether every fixture of this group has reached a terminal status.
    pub fn stage_complete(&self, fixtures: &[Fixture]) -> bool {
        fixtures
            .iter()
            .filter(|f| f.group.as_deref() == Some(self.name.as_str()))
            .all(|f| f.status.is_terminal())
    }
}
