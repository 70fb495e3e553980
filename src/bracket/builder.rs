//! Topology generation for all supported competition formats.

use std::collections::HashMap;

use log::debug;
use rand::seq::SliceRandom;
use thiserror::Error;

use super::models::{BracketOptions, BracketPlan, CompetitionFormat, SeedingPolicy};
use crate::entities::{
    BracketEntry, CompetitionId, Fixture, Group, Participant, ParticipantId, Slot,
};

/// Bracket generation errors
#[derive(Debug, Error)]
pub enum BracketError {
    #[error("at least 2 participants are required, have {0}")]
    TooFewParticipants(usize),

    #[error("group size must be at least 2, got {0}")]
    InvalidGroupSize(usize),

    #[error("qualifiers per group must be between 1 and the group size ({group_size}), got {qualifiers}")]
    InvalidQualifiers { qualifiers: usize, group_size: usize },

    /// A pairing with both sides empty; unreachable for N > slots/2,
    /// which power-of-two sizing guarantees.
    #[error("empty pairing at round {round} position {position}")]
    EmptyPairing { round: u32, position: u32 },
}

pub type BracketResult<T> = Result<T, BracketError>;

/// Build the full match skeleton for a competition.
///
/// Generation is pure: fixtures and entries carry fresh ids and fully wired
/// forward links, ready to be persisted atomically. For the mixed format the
/// knockout stage is not generated here; once the group stage completes, call
/// this again with each group's qualifiers and `SingleElimination`.
pub fn build_bracket(
    competition_id: CompetitionId,
    participants: &[Participant],
    format: CompetitionFormat,
    options: &BracketOptions,
) -> BracketResult<BracketPlan> {
    if participants.len() < 2 {
        return Err(BracketError::TooFewParticipants(participants.len()));
    }

    let plan = match format {
        CompetitionFormat::SingleElimination => {
            single_elimination(competition_id, participants, options)?
        }
        CompetitionFormat::RoundRobin => round_robin(competition_id, participants, options),
        CompetitionFormat::GroupKnockout => group_stage(competition_id, participants, options)?,
    };

    debug!(
        "built {} bracket for competition {}: {} fixtures, {} rounds, {} byes",
        format,
        competition_id,
        plan.fixtures.len(),
        plan.rounds,
        plan.byes
    );
    Ok(plan)
}

/// Order participants into opening-round slots per the seeding policy.
fn seed_order(participants: &[Participant], policy: SeedingPolicy) -> Vec<ParticipantId> {
    let mut ordered: Vec<&Participant> = participants.iter().collect();
    match policy {
        SeedingPolicy::Registration => {}
        SeedingPolicy::Random => ordered.shuffle(&mut rand::rng()),
        // Stable sort keeps input order on equal seeds.
        SeedingPolicy::Rating => {
            ordered.sort_by(|a, b| b.seed.unwrap_or(0).cmp(&a.seed.unwrap_or(0)));
        }
    }
    ordered.into_iter().map(|p| p.id).collect()
}

fn single_elimination(
    competition_id: CompetitionId,
    participants: &[Participant],
    options: &BracketOptions,
) -> BracketResult<BracketPlan> {
    let n = participants.len();
    let rounds = (usize::BITS - (n - 1).leading_zeros()) as u32;
    let slots = 1usize << rounds;

    let seeds: HashMap<ParticipantId, Option<u32>> =
        participants.iter().map(|p| (p.id, p.seed)).collect();

    let mut slot_assign: Vec<Option<ParticipantId>> = vec![None; slots];
    for (slot, id) in seed_order(participants, options.seeding).into_iter().enumerate() {
        slot_assign[slot] = Some(id);
    }

    // Empty fixtures for every round after the opening one, keyed by
    // (round, position); round r holds 2^(r-1) fixtures.
    let mut later: HashMap<(u32, u32), Fixture> = HashMap::new();
    for round in 1..rounds {
        for position in 0..(1u32 << (round - 1)) {
            let mut fixture = Fixture::new(competition_id, round, position);
            fixture.duration_mins = options.default_duration_mins;
            fixture.priority = round as i32;
            later.insert((round, position), fixture);
        }
    }

    // Opening round: fold slot p against slots-1-p. A half-empty pairing is
    // a bye; its participant is injected one round later without a fixture.
    let mut opening: Vec<Fixture> = Vec::new();
    let mut byes = 0usize;
    for p in 0..(slots / 2) as u32 {
        let side_a = slot_assign[p as usize];
        let side_b = slot_assign[slots - 1 - p as usize];
        let next_slot = if p % 2 == 0 { Slot::Home } else { Slot::Away };

        match (side_a, side_b) {
            (Some(home), Some(away)) => {
                let mut fixture = Fixture::new(competition_id, rounds, p);
                fixture.home = Some(home);
                fixture.away = Some(away);
                fixture.duration_mins = options.default_duration_mins;
                fixture.priority = rounds as i32;
                if rounds > 1 {
                    fixture.next_slot = Some(next_slot);
                }
                opening.push(fixture);
            }
            (Some(advancer), None) | (None, Some(advancer)) => {
                // rounds == 1 implies n == 2 and no byes, so the target
                // fixture always exists here.
                if rounds > 1 {
                    if let Some(next) = later.get_mut(&(rounds - 1, p / 2)) {
                        next.set_slot(next_slot, advancer);
                    }
                }
                byes += 1;
            }
            (None, None) => {
                return Err(BracketError::EmptyPairing {
                    round: rounds,
                    position: p,
                });
            }
        }
    }

    // Wire forward links now that every fixture has its id.
    let next_ids: HashMap<(u32, u32), crate::entities::FixtureId> =
        later.iter().map(|(&key, f)| (key, f.id)).collect();
    for ((round, position), fixture) in later.iter_mut() {
        if *round > 1 {
            fixture.next_fixture_id = next_ids.get(&(round - 1, position / 2)).copied();
            fixture.next_slot = Some(if position % 2 == 0 { Slot::Home } else { Slot::Away });
        }
    }
    for fixture in opening.iter_mut() {
        if rounds > 1 {
            fixture.next_fixture_id = next_ids.get(&(rounds - 1, fixture.position / 2)).copied();
        }
    }

    let mut fixtures = opening;
    let mut remaining: Vec<Fixture> = later.into_values().collect();
    remaining.sort_by(|a, b| b.round.cmp(&a.round).then(a.position.cmp(&b.position)));
    fixtures.append(&mut remaining);

    if options.third_place && n >= 4 {
        let mut consolation = Fixture::new(competition_id, 1, 1);
        consolation.consolation = true;
        consolation.duration_mins = options.default_duration_mins;
        consolation.priority = 1;
        fixtures.push(consolation);
    }

    let entries = fixtures
        .iter()
        .map(|fixture| BracketEntry {
            fixture_id: fixture.id,
            round: fixture.round,
            position: fixture.position,
            seed: fixture
                .participants()
                .filter_map(|id| seeds.get(&id).copied().flatten())
                .min(),
            next_fixture_id: fixture.next_fixture_id,
        })
        .collect();

    Ok(BracketPlan {
        fixtures,
        entries,
        groups: Vec::new(),
        rounds,
        byes,
    })
}

/// Circle-method round robin over one set of participants.
///
/// Participant 0 stays fixed while the rest rotate clockwise each round. An
/// odd roster gets a placeholder whose pairing is a skipped bye.
fn circle_rounds(
    competition_id: CompetitionId,
    ids: &[ParticipantId],
    options: &BracketOptions,
    group_name: Option<&str>,
) -> (Vec<Fixture>, u32) {
    let n = ids.len();
    let mut ring: Vec<Option<ParticipantId>> = ids.iter().copied().map(Some).collect();
    if n % 2 == 1 {
        ring.push(None);
    }
    let m = ring.len();
    let legs = if options.double_round_robin { 2 } else { 1 };
    let rounds_per_leg = (m - 1) as u32;
    let total_rounds = rounds_per_leg * legs;

    let mut fixtures = Vec::with_capacity(legs as usize * (m - 1) * (m / 2));
    for leg in 0..legs {
        let mut arr = ring.clone();
        for r in 0..rounds_per_leg {
            let round = leg * rounds_per_leg + r + 1;
            for i in 0..(m / 2) {
                let (Some(a), Some(b)) = (arr[i], arr[m - 1 - i]) else {
                    continue; // placeholder pairing: a rest round for the other side
                };
                let mut fixture = Fixture::new(competition_id, round, i as u32);
                // Second leg swaps home advantage.
                let (home, away) = if leg == 0 { (a, b) } else { (b, a) };
                fixture.home = Some(home);
                fixture.away = Some(away);
                fixture.group = group_name.map(str::to_string);
                fixture.duration_mins = options.default_duration_mins;
                fixture.priority = (total_rounds - round + 1) as i32;
                fixtures.push(fixture);
            }
            arr[1..].rotate_right(1);
        }
    }
    (fixtures, total_rounds)
}

fn round_robin(
    competition_id: CompetitionId,
    participants: &[Participant],
    options: &BracketOptions,
) -> BracketPlan {
    let ids: Vec<ParticipantId> = participants.iter().map(|p| p.id).collect();
    let (fixtures, rounds) = circle_rounds(competition_id, &ids, options, None);
    BracketPlan {
        fixtures,
        entries: Vec::new(),
        groups: Vec::new(),
        rounds,
        byes: 0,
    }
}

fn group_label(index: usize) -> String {
    if index < 26 {
        format!("Group {}", (b'A' + index as u8) as char)
    } else {
        format!("Group {}", index + 1)
    }
}

/// Partition into `ceil(N / group_size)` groups by round-robin distribution
/// (participant i into group i mod groups) so seeding stays balanced, then
/// generate each group's round robin.
fn group_stage(
    competition_id: CompetitionId,
    participants: &[Participant],
    options: &BracketOptions,
) -> BracketResult<BracketPlan> {
    if options.group_size < 2 {
        return Err(BracketError::InvalidGroupSize(options.group_size));
    }
    if options.qualifiers_per_group == 0 || options.qualifiers_per_group > options.group_size {
        return Err(BracketError::InvalidQualifiers {
            qualifiers: options.qualifiers_per_group,
            group_size: options.group_size,
        });
    }

    let n = participants.len();
    let num_groups = n.div_ceil(options.group_size);

    let ordered = seed_order(participants, options.seeding);
    let mut members: Vec<Vec<ParticipantId>> = vec![Vec::new(); num_groups];
    for (i, id) in ordered.into_iter().enumerate() {
        members[i % num_groups].push(id);
    }

    let mut fixtures = Vec::new();
    let mut groups = Vec::with_capacity(num_groups);
    let mut rounds = 0;
    for (index, group_members) in members.into_iter().enumerate() {
        let name = group_label(index);
        let (mut group_fixtures, group_rounds) =
            circle_rounds(competition_id, &group_members, options, Some(&name));
        rounds = rounds.max(group_rounds);
        fixtures.append(&mut group_fixtures);
        groups.push(Group {
            name,
            members: group_members,
            rounds: group_rounds,
        });
    }

    Ok(BracketPlan {
        fixtures,
        entries: Vec::new(),
        groups,
        rounds,
        byes: 0,
    })
}
