//! Bracket configuration and generation output models.

use serde::{Deserialize, Serialize};

use crate::entities::{BracketEntry, Fixture, FixtureId, Group};

/// Competition format variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionFormat {
    /// Knockout bracket sized to the smallest power of two
    SingleElimination,
    /// Every participant plays every other (circle method)
    RoundRobin,
    /// Balanced groups of round-robin play feeding a later knockout stage
    GroupKnockout,
}

impl std::fmt::Display for CompetitionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompetitionFormat::SingleElimination => write!(f, "single_elimination"),
            CompetitionFormat::RoundRobin => write!(f, "round_robin"),
            CompetitionFormat::GroupKnockout => write!(f, "group_knockout"),
        }
    }
}

/// How participants are placed into opening-round slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedingPolicy {
    /// Input order preserved
    Registration,
    /// Uniform shuffle
    Random,
    /// Descending seed value, ties broken by stable input order
    Rating,
}

/// Bracket generation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketOptions {
    /// Seeding policy for opening-round placement
    pub seeding: SeedingPolicy,
    /// Create a third-place consolation fixture (elimination, N >= 4)
    pub third_place: bool,
    /// Each pair meets twice with venues swapped (round-robin formats)
    pub double_round_robin: bool,
    /// Target participants per group (mixed format)
    pub group_size: usize,
    /// Group finishers advancing to the knockout stage (mixed format)
    pub qualifiers_per_group: usize,
    /// Duration estimate stamped on every generated fixture, in minutes
    pub default_duration_mins: i64,
}

impl Default for BracketOptions {
    fn default() -> Self {
        Self {
            seeding: SeedingPolicy::Registration,
            third_place: false,
            double_round_robin: false,
            group_size: 4,
            qualifiers_per_group: 2,
            default_duration_mins: 90,
        }
    }
}

/// The generated match skeleton for one competition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketPlan {
    /// Every fixture of the generated stage
    pub fixtures: Vec<Fixture>,
    /// One entry per elimination fixture; empty for round-robin
    pub entries: Vec<BracketEntry>,
    /// Group partitions; empty unless the format is group+knockout
    pub groups: Vec<Group>,
    /// Total rounds in the generated stage
    pub rounds: u32,
    /// Participants advancing directly past the opening round
    pub byes: usize,
}

impl BracketPlan {
    /// The fixture with no forward link, if the plan has a knockout final.
    pub fn final_fixture(&self) -> Option<&Fixture> {
        self.fixtures
            .iter()
            .find(|f| f.round == 1 && !f.consolation && f.next_fixture_id.is_none())
    }

    /// Fixtures of one round, ordered by position.
    pub fn round_fixtures(&self, round: u32) -> Vec<&Fixture> {
        let mut fixtures: Vec<&Fixture> = self
            .fixtures
            .iter()
            .filter(|f| f.round == round && !f.consolation)
            .collect();
        fixtures.sort_by_key(|f| f.position);
        fixtures
    }

    /// Look up a fixture by id.
    pub fn fixture(&self, id: FixtureId) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.id == id)
    }
}
