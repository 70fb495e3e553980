//! Result entry and winner propagation.

use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;

use crate::db::CompetitionRepository;
use crate::entities::{Fixture, FixtureId, FixtureStatus, ParticipantId, Slot};
use crate::notify::{self, EngineEvent, EventKind, Notifier};

/// Advancement errors
#[derive(Debug, Error)]
pub enum AdvanceError {
    #[error("fixture not found: {0}")]
    FixtureNotFound(FixtureId),

    #[error("fixture {fixture_id} cannot accept a result in state {status}")]
    InvalidState {
        fixture_id: FixtureId,
        status: FixtureStatus,
    },

    #[error("fixture {0} has an unassigned side; results need both participants")]
    MissingParticipants(FixtureId),

    /// Elimination fixtures need a decisive winner; the engine never guesses.
    #[error("fixture {0} is drawn; a tiebreak result is required")]
    TiebreakRequired(FixtureId),

    #[error("destination slot {slot:?} of fixture {fixture_id} is already taken")]
    SlotOccupied { fixture_id: FixtureId, slot: Slot },

    #[error("scores must be non-negative, got {0}")]
    InvalidScore(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AdvanceError {
    /// Caller-safe message; database detail is not exposed.
    pub fn client_message(&self) -> String {
        match self {
            AdvanceError::Database(_) => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type AdvanceResult<T> = Result<T, AdvanceError>;

/// Outcome of one result entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advancement {
    pub fixture_id: FixtureId,
    /// Winner, None for a drawn round-robin fixture
    pub winner: Option<ParticipantId>,
    /// The fixture the winner was written into, if any
    pub next_fixture_id: Option<FixtureId>,
    /// Whether this result left zero unfinished fixtures
    pub competition_complete: bool,
}

/// Per-fixture state machine that records results and advances winners.
#[derive(Clone)]
pub struct AdvancementPropagator {
    repo: Arc<dyn CompetitionRepository>,
    notifier: Arc<dyn Notifier>,
}

impl AdvancementPropagator {
    pub fn new(repo: Arc<dyn CompetitionRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self { repo, notifier }
    }

    /// Move a scheduled fixture into play.
    pub async fn begin_fixture(&self, fixture_id: FixtureId) -> AdvanceResult<()> {
        let mut fixture = self.load(fixture_id).await?;
        if fixture.status != FixtureStatus::Scheduled {
            return Err(AdvanceError::InvalidState {
                fixture_id,
                status: fixture.status,
            });
        }
        fixture.status = FixtureStatus::InProgress;
        self.repo.save_fixture(&fixture).await?;
        Ok(())
    }

    /// Cancel a fixture from any non-terminal state.
    pub async fn cancel_fixture(&self, fixture_id: FixtureId) -> AdvanceResult<()> {
        let mut fixture = self.load(fixture_id).await?;
        if fixture.status.is_terminal() {
            return Err(AdvanceError::InvalidState {
                fixture_id,
                status: fixture.status,
            });
        }
        fixture.status = FixtureStatus::Cancelled;
        self.repo.save_fixture(&fixture).await?;
        info!("fixture {fixture_id} cancelled");
        Ok(())
    }

    /// Record a final score, complete the fixture, and propagate the winner
    /// into its linked next-round slot.
    ///
    /// A completed fixture rejects further results, and the destination slot
    /// is guarded before the write, so a winner propagates exactly once.
    pub async fn record_result(
        &self,
        fixture_id: FixtureId,
        home_score: i64,
        away_score: i64,
    ) -> AdvanceResult<Advancement> {
        if home_score < 0 {
            return Err(AdvanceError::InvalidScore(home_score));
        }
        if away_score < 0 {
            return Err(AdvanceError::InvalidScore(away_score));
        }

        let mut fixture = self.load(fixture_id).await?;
        if !matches!(
            fixture.status,
            FixtureStatus::Scheduled | FixtureStatus::InProgress
        ) {
            return Err(AdvanceError::InvalidState {
                fixture_id,
                status: fixture.status,
            });
        }
        let (Some(home), Some(away)) = (fixture.home, fixture.away) else {
            return Err(AdvanceError::MissingParticipants(fixture_id));
        };

        // Round-robin fixtures tolerate draws; elimination fixtures (those
        // with a bracket entry) do not.
        let elimination = self.repo.get_bracket_entry(fixture_id).await?.is_some();
        if home_score == away_score && elimination {
            return Err(AdvanceError::TiebreakRequired(fixture_id));
        }

        let winner = if home_score > away_score {
            Some(home)
        } else if away_score > home_score {
            Some(away)
        } else {
            None
        };

        // Check the destination before committing anything, so a stale or
        // duplicate propagation never overwrites a filled slot.
        let advancement_target = match (winner, fixture.next_fixture_id) {
            (Some(winner_id), Some(next_id)) => {
                let slot = fixture.next_slot.unwrap_or(if fixture.position % 2 == 0 {
                    Slot::Home
                } else {
                    Slot::Away
                });
                let next = self
                    .repo
                    .get_fixture(next_id)
                    .await?
                    .ok_or(AdvanceError::FixtureNotFound(next_id))?;
                match next.slot(slot) {
                    Some(existing) if existing != winner_id => {
                        return Err(AdvanceError::SlotOccupied {
                            fixture_id: next_id,
                            slot,
                        });
                    }
                    Some(_) => None, // already propagated
                    None => Some((next, slot, winner_id)),
                }
            }
            _ => None,
        };

        fixture.home_score = Some(home_score);
        fixture.away_score = Some(away_score);
        fixture.status = FixtureStatus::Completed;
        self.repo.save_fixture(&fixture).await?;

        let mut next_fixture_id = None;
        if let Some((mut next, slot, winner_id)) = advancement_target {
            next.set_slot(slot, winner_id);
            self.repo.save_fixture(&next).await?;
            next_fixture_id = Some(next.id);
            debug!(
                "advanced {winner_id} from fixture {fixture_id} into {:?} of {}",
                slot, next.id
            );
            notify::emit(
                self.notifier.as_ref(),
                EngineEvent::new(EventKind::BracketAdvanced, fixture.competition_id)
                    .with_fixture(next.id)
                    .with_payload(serde_json::json!({
                        "winner": winner_id,
                        "from_fixture": fixture_id,
                    })),
            )
            .await;
        }

        let remaining = self.repo.remaining_fixtures(fixture.competition_id).await?;
        let competition_complete = remaining == 0;
        if competition_complete {
            self.repo
                .mark_competition_complete(fixture.competition_id)
                .await?;
            info!("competition {} complete", fixture.competition_id);
            notify::emit(
                self.notifier.as_ref(),
                EngineEvent::new(EventKind::CompetitionCompleted, fixture.competition_id),
            )
            .await;
        }

        notify::emit(
            self.notifier.as_ref(),
            EngineEvent::new(EventKind::FixtureCompleted, fixture.competition_id)
                .with_fixture(fixture_id)
                .with_payload(serde_json::json!({
                    "home_score": home_score,
                    "away_score": away_score,
                })),
        )
        .await;

        Ok(Advancement {
            fixture_id,
            winner,
            next_fixture_id,
            competition_complete,
        })
    }

    async fn load(&self, fixture_id: FixtureId) -> AdvanceResult<Fixture> {
        self.repo
            .get_fixture(fixture_id)
            .await?
            .ok_or(AdvanceError::FixtureNotFound(fixture_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::bracket::{BracketOptions, CompetitionFormat, build_bracket};
    use crate::db::repository::mock::MemoryRepository;
    use crate::entities::Participant;
    use crate::notify::mock::RecordingNotifier;

    fn roster(n: usize) -> Vec<Participant> {
        (0..n).map(|i| Participant::new(format!("P{i}"))).collect()
    }

    async fn propagator_for(
        n: usize,
        format: CompetitionFormat,
    ) -> (AdvancementPropagator, Arc<MemoryRepository>, Arc<RecordingNotifier>, crate::bracket::BracketPlan)
    {
        let plan = build_bracket(Uuid::new_v4(), &roster(n), format, &BracketOptions::default())
            .unwrap();
        let repo = Arc::new(MemoryRepository::new().with_plan(&plan).await);
        let notifier = Arc::new(RecordingNotifier::new());
        let propagator = AdvancementPropagator::new(repo.clone(), notifier.clone());
        (propagator, repo, notifier, plan)
    }

    async fn make_playable(repo: &MemoryRepository, fixture_id: FixtureId) {
        let mut fixture = repo.fixture(fixture_id).unwrap();
        fixture.status = FixtureStatus::Scheduled;
        repo.save_fixture(&fixture).await.unwrap();
    }

    #[tokio::test]
    async fn test_result_on_pending_fixture_is_a_state_error() {
        let (propagator, _, _, plan) =
            propagator_for(4, CompetitionFormat::SingleElimination).await;
        let fixture = &plan.fixtures[0];

        let err = propagator.record_result(fixture.id, 1, 0).await.unwrap_err();
        assert!(matches!(
            err,
            AdvanceError::InvalidState {
                status: FixtureStatus::Pending,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_negative_score_rejected() {
        let (propagator, _, _, plan) =
            propagator_for(4, CompetitionFormat::SingleElimination).await;
        let err = propagator
            .record_result(plan.fixtures[0].id, -1, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, AdvanceError::InvalidScore(-1)));
    }

    #[tokio::test]
    async fn test_elimination_draw_requires_tiebreak() {
        let (propagator, repo, _, plan) =
            propagator_for(4, CompetitionFormat::SingleElimination).await;
        let fixture = plan.round_fixtures(2)[0];
        make_playable(&repo, fixture.id).await;

        let err = propagator.record_result(fixture.id, 2, 2).await.unwrap_err();
        assert!(matches!(err, AdvanceError::TiebreakRequired(_)));

        // The fixture is untouched and can still take a decisive result.
        let outcome = propagator.record_result(fixture.id, 3, 2).await.unwrap();
        assert_eq!(outcome.winner, fixture.home);
    }

    #[tokio::test]
    async fn test_round_robin_draw_is_allowed_without_advancement() {
        let (propagator, repo, _, plan) = propagator_for(4, CompetitionFormat::RoundRobin).await;
        let fixture = &plan.fixtures[0];
        make_playable(&repo, fixture.id).await;

        let outcome = propagator.record_result(fixture.id, 1, 1).await.unwrap();
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.next_fixture_id, None);
        assert!(!outcome.competition_complete);

        let stored = repo.fixture(fixture.id).unwrap();
        assert_eq!(stored.status, FixtureStatus::Completed);
        assert_eq!(stored.home_score, Some(1));
    }

    #[tokio::test]
    async fn test_winner_lands_in_the_parity_slot() {
        let (propagator, repo, notifier, plan) =
            propagator_for(4, CompetitionFormat::SingleElimination).await;
        let semis = plan.round_fixtures(2);
        let (first, second) = (semis[0], semis[1]);
        make_playable(&repo, first.id).await;
        make_playable(&repo, second.id).await;

        let outcome = propagator.record_result(first.id, 2, 0).await.unwrap();
        assert_eq!(outcome.winner, first.home);
        assert_eq!(outcome.next_fixture_id, first.next_fixture_id);

        let final_fixture = repo.fixture(first.next_fixture_id.unwrap()).unwrap();
        // Position 0 is even: winner occupies the home slot.
        assert_eq!(final_fixture.home, first.home);
        assert_eq!(final_fixture.away, None);

        propagator.record_result(second.id, 0, 1).await.unwrap();
        let final_fixture = repo.fixture(first.next_fixture_id.unwrap()).unwrap();
        assert_eq!(final_fixture.away, second.away);

        assert!(notifier
            .kinds()
            .iter()
            .any(|k| *k == EventKind::BracketAdvanced));
    }

    #[tokio::test]
    async fn test_record_result_is_idempotent_via_state_error() {
        let (propagator, repo, _, plan) =
            propagator_for(4, CompetitionFormat::SingleElimination).await;
        let fixture = plan.round_fixtures(2)[0];
        make_playable(&repo, fixture.id).await;

        propagator.record_result(fixture.id, 1, 0).await.unwrap();
        let err = propagator.record_result(fixture.id, 1, 0).await.unwrap_err();
        assert!(matches!(
            err,
            AdvanceError::InvalidState {
                status: FixtureStatus::Completed,
                ..
            }
        ));

        // The destination slot was written exactly once.
        let next = repo.fixture(fixture.next_fixture_id.unwrap()).unwrap();
        assert_eq!(next.home, fixture.home);
    }

    #[tokio::test]
    async fn test_full_bracket_resolution_round_trip() {
        // An 8-participant bracket fully resolved via record_result yields
        // exactly one fixture with a winner and no forward link.
        let (propagator, repo, notifier, plan) =
            propagator_for(8, CompetitionFormat::SingleElimination).await;

        let mut complete = false;
        for round in (1..=plan.rounds).rev() {
            for fixture in plan.round_fixtures(round) {
                make_playable(&repo, fixture.id).await;
                let outcome = propagator.record_result(fixture.id, 3, 1).await.unwrap();
                complete = outcome.competition_complete;
            }
        }
        assert!(complete);
        assert!(repo.competition_completed(plan.fixtures[0].competition_id));

        let mut resolved_finals = 0;
        for fixture in &plan.fixtures {
            let stored = repo.fixture(fixture.id).unwrap();
            assert_eq!(stored.status, FixtureStatus::Completed);
            if stored.next_fixture_id.is_none() && stored.winner().is_some() {
                resolved_finals += 1;
            }
        }
        assert_eq!(resolved_finals, 1);

        assert!(notifier
            .kinds()
            .iter()
            .any(|k| *k == EventKind::CompetitionCompleted));
    }

    #[tokio::test]
    async fn test_byes_prefill_five_participant_bracket() {
        let (propagator, repo, _, plan) =
            propagator_for(5, CompetitionFormat::SingleElimination).await;

        // The single opening fixture resolves into the half-filled semi.
        let opening = plan.round_fixtures(3)[0];
        make_playable(&repo, opening.id).await;
        let outcome = propagator.record_result(opening.id, 1, 0).await.unwrap();

        let semi = repo.fixture(outcome.next_fixture_id.unwrap()).unwrap();
        assert!(semi.home.is_some() && semi.away.is_some());
        assert!(semi.involves(outcome.winner.unwrap()));
    }

    #[tokio::test]
    async fn test_cancel_and_begin_transitions() {
        let (propagator, repo, _, plan) =
            propagator_for(4, CompetitionFormat::SingleElimination).await;
        let fixture = plan.round_fixtures(2)[0];

        // begin requires scheduled.
        let err = propagator.begin_fixture(fixture.id).await.unwrap_err();
        assert!(matches!(err, AdvanceError::InvalidState { .. }));

        make_playable(&repo, fixture.id).await;
        propagator.begin_fixture(fixture.id).await.unwrap();
        assert_eq!(
            repo.fixture(fixture.id).unwrap().status,
            FixtureStatus::InProgress
        );

        propagator.cancel_fixture(fixture.id).await.unwrap();
        let err = propagator.cancel_fixture(fixture.id).await.unwrap_err();
        assert!(matches!(err, AdvanceError::InvalidState { .. }));
    }
}
