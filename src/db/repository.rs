//! Repository trait for the engine's persistence collaborator.
//!
//! The engine never talks to the database directly; everything goes through
//! [`CompetitionRepository`], with a PostgreSQL implementation for production
//! and an in-memory mock for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use std::sync::Arc;

use crate::entities::{
    BracketEntry, CompetitionId, Fixture, FixtureId, FixtureStatus, Participant, SchedulingStatus,
    Slot,
};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, sqlx::Error>;

/// Filter for fixture loads
#[derive(Debug, Clone, Default)]
pub struct FixtureFilter {
    pub competition_id: Option<CompetitionId>,
    pub status: Option<FixtureStatus>,
    pub scheduling: Option<SchedulingStatus>,
}

impl FixtureFilter {
    /// All fixtures of one competition.
    pub fn competition(competition_id: CompetitionId) -> Self {
        Self {
            competition_id: Some(competition_id),
            ..Self::default()
        }
    }

    /// Restrict to one scheduling status.
    pub fn scheduling(mut self, scheduling: SchedulingStatus) -> Self {
        self.scheduling = Some(scheduling);
        self
    }
}

/// Persistence operations the engine relies on.
///
/// Each call is expected to be transactional on its own; `save_bracket` in
/// particular persists a whole generated plan or nothing.
#[async_trait]
pub trait CompetitionRepository: Send + Sync {
    /// Ordered roster of registered participants.
    async fn load_participants(
        &self,
        competition_id: CompetitionId,
    ) -> RepoResult<Vec<Participant>>;

    /// Fixtures matching the filter.
    async fn load_fixtures(&self, filter: &FixtureFilter) -> RepoResult<Vec<Fixture>>;

    /// Single fixture by id.
    async fn get_fixture(&self, fixture_id: FixtureId) -> RepoResult<Option<Fixture>>;

    /// Insert or update one fixture.
    async fn save_fixture(&self, fixture: &Fixture) -> RepoResult<()>;

    /// Persist a generated plan atomically.
    async fn save_bracket(
        &self,
        fixtures: &[Fixture],
        entries: &[BracketEntry],
    ) -> RepoResult<()>;

    /// Bracket entry for a fixture; present only for elimination fixtures.
    async fn get_bracket_entry(&self, fixture_id: FixtureId) -> RepoResult<Option<BracketEntry>>;

    /// Fixtures holding a committed slot with a kickoff inside `[from, to]`.
    async fn confirmed_in_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepoResult<Vec<Fixture>>;

    /// Count of fixtures not yet in a terminal status.
    async fn remaining_fixtures(&self, competition_id: CompetitionId) -> RepoResult<i64>;

    /// Record competition completion; a single collaborator call.
    async fn mark_competition_complete(&self, competition_id: CompetitionId) -> RepoResult<()>;
}

/// PostgreSQL implementation of [`CompetitionRepository`]
#[derive(Clone)]
pub struct PgCompetitionRepository {
    pool: Arc<PgPool>,
}

impl PgCompetitionRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

const FIXTURE_COLUMNS: &str = "id, competition_id, round, position, group_name, home_id, away_id, \
     status, scheduling, kickoff, venue, duration_mins, home_score, away_score, \
     next_fixture_id, next_slot, consolation, auto_scheduled, priority, \
     conflict_reason, audit_note, created_at";

fn parse_status(value: &str) -> FixtureStatus {
    match value {
        "scheduled" => FixtureStatus::Scheduled,
        "in_progress" => FixtureStatus::InProgress,
        "completed" => FixtureStatus::Completed,
        "cancelled" => FixtureStatus::Cancelled,
        _ => FixtureStatus::Pending,
    }
}

fn parse_scheduling(value: &str) -> SchedulingStatus {
    match value {
        "confirmed" => SchedulingStatus::Confirmed,
        "rescheduled" => SchedulingStatus::Rescheduled,
        "conflicted" => SchedulingStatus::Conflicted,
        _ => SchedulingStatus::Unscheduled,
    }
}

fn map_fixture(row: &PgRow) -> Fixture {
    let status: String = row.get("status");
    let scheduling: String = row.get("scheduling");
    let next_slot: Option<String> = row.get("next_slot");

    Fixture {
        id: row.get("id"),
        competition_id: row.get("competition_id"),
        round: row.get::<i32, _>("round") as u32,
        position: row.get::<i32, _>("position") as u32,
        group: row.get("group_name"),
        home: row.get("home_id"),
        away: row.get("away_id"),
        status: parse_status(&status),
        scheduling: parse_scheduling(&scheduling),
        kickoff: row
            .get::<Option<chrono::NaiveDateTime>, _>("kickoff")
            .map(|dt| dt.and_utc()),
        venue: row.get("venue"),
        duration_mins: row.get("duration_mins"),
        home_score: row.get("home_score"),
        away_score: row.get("away_score"),
        next_fixture_id: row.get("next_fixture_id"),
        next_slot: next_slot.map(|s| if s == "away" { Slot::Away } else { Slot::Home }),
        consolation: row.get("consolation"),
        auto_scheduled: row.get("auto_scheduled"),
        priority: row.get("priority"),
        conflict_reason: row.get("conflict_reason"),
        audit_note: row.get("audit_note"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

fn slot_str(slot: Option<Slot>) -> Option<&'static str> {
    slot.map(|s| match s {
        Slot::Home => "home",
        Slot::Away => "away",
    })
}

async fn insert_fixture<'e, E>(fixture: &Fixture, executor: E) -> RepoResult<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO fixtures (id, competition_id, round, position, group_name, home_id, away_id,
                              status, scheduling, kickoff, venue, duration_mins,
                              home_score, away_score, next_fixture_id, next_slot,
                              consolation, auto_scheduled, priority, conflict_reason,
                              audit_note, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
        ON CONFLICT (id) DO UPDATE SET
            home_id = EXCLUDED.home_id,
            away_id = EXCLUDED.away_id,
            status = EXCLUDED.status,
            scheduling = EXCLUDED.scheduling,
            kickoff = EXCLUDED.kickoff,
            venue = EXCLUDED.venue,
            duration_mins = EXCLUDED.duration_mins,
            home_score = EXCLUDED.home_score,
            away_score = EXCLUDED.away_score,
            auto_scheduled = EXCLUDED.auto_scheduled,
            conflict_reason = EXCLUDED.conflict_reason,
            audit_note = EXCLUDED.audit_note
        "#,
    )
    .bind(fixture.id)
    .bind(fixture.competition_id)
    .bind(fixture.round as i32)
    .bind(fixture.position as i32)
    .bind(&fixture.group)
    .bind(fixture.home)
    .bind(fixture.away)
    .bind(fixture.status.to_string())
    .bind(fixture.scheduling.to_string())
    .bind(fixture.kickoff.map(|dt| dt.naive_utc()))
    .bind(&fixture.venue)
    .bind(fixture.duration_mins)
    .bind(fixture.home_score)
    .bind(fixture.away_score)
    .bind(fixture.next_fixture_id)
    .bind(slot_str(fixture.next_slot))
    .bind(fixture.consolation)
    .bind(fixture.auto_scheduled)
    .bind(fixture.priority)
    .bind(&fixture.conflict_reason)
    .bind(&fixture.audit_note)
    .bind(fixture.created_at.naive_utc())
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl CompetitionRepository for PgCompetitionRepository {
    async fn load_participants(
        &self,
        competition_id: CompetitionId,
    ) -> RepoResult<Vec<Participant>> {
        let rows = sqlx::query(
            "SELECT id, name, seed FROM participants
             WHERE competition_id = $1
             ORDER BY created_at",
        )
        .bind(competition_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Participant {
                id: row.get("id"),
                name: row.get("name"),
                seed: row.get::<Option<i32>, _>("seed").map(|s| s as u32),
            })
            .collect())
    }

    async fn load_fixtures(&self, filter: &FixtureFilter) -> RepoResult<Vec<Fixture>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {FIXTURE_COLUMNS} FROM fixtures WHERE 1 = 1"));
        if let Some(competition_id) = filter.competition_id {
            qb.push(" AND competition_id = ");
            qb.push_bind(competition_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status.to_string());
        }
        if let Some(scheduling) = filter.scheduling {
            qb.push(" AND scheduling = ");
            qb.push_bind(scheduling.to_string());
        }
        qb.push(" ORDER BY priority DESC, created_at ASC");

        let rows = qb.build().fetch_all(self.pool.as_ref()).await?;
        Ok(rows.iter().map(map_fixture).collect())
    }

    async fn get_fixture(&self, fixture_id: FixtureId) -> RepoResult<Option<Fixture>> {
        let row = sqlx::query(&format!(
            "SELECT {FIXTURE_COLUMNS} FROM fixtures WHERE id = $1"
        ))
        .bind(fixture_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(map_fixture))
    }

    async fn save_fixture(&self, fixture: &Fixture) -> RepoResult<()> {
        insert_fixture(fixture, self.pool.as_ref()).await
    }

    async fn save_bracket(
        &self,
        fixtures: &[Fixture],
        entries: &[BracketEntry],
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        for fixture in fixtures {
            insert_fixture(fixture, &mut *tx).await?;
        }
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO bracket_entries (fixture_id, round, position, seed, next_fixture_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(entry.fixture_id)
            .bind(entry.round as i32)
            .bind(entry.position as i32)
            .bind(entry.seed.map(|s| s as i32))
            .bind(entry.next_fixture_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    async fn get_bracket_entry(&self, fixture_id: FixtureId) -> RepoResult<Option<BracketEntry>> {
        let row = sqlx::query(
            "SELECT fixture_id, round, position, seed, next_fixture_id
             FROM bracket_entries WHERE fixture_id = $1",
        )
        .bind(fixture_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|row| BracketEntry {
            fixture_id: row.get("fixture_id"),
            round: row.get::<i32, _>("round") as u32,
            position: row.get::<i32, _>("position") as u32,
            seed: row.get::<Option<i32>, _>("seed").map(|s| s as u32),
            next_fixture_id: row.get("next_fixture_id"),
        }))
    }

    async fn confirmed_in_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepoResult<Vec<Fixture>> {
        let rows = sqlx::query(&format!(
            "SELECT {FIXTURE_COLUMNS} FROM fixtures
             WHERE scheduling IN ('confirmed', 'rescheduled')
               AND kickoff BETWEEN $1 AND $2"
        ))
        .bind(from.naive_utc())
        .bind(to.naive_utc())
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(map_fixture).collect())
    }

    async fn remaining_fixtures(&self, competition_id: CompetitionId) -> RepoResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS remaining FROM fixtures
             WHERE competition_id = $1
               AND status NOT IN ('completed', 'cancelled')",
        )
        .bind(competition_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.get("remaining"))
    }

    async fn mark_competition_complete(&self, competition_id: CompetitionId) -> RepoResult<()> {
        sqlx::query(
            "UPDATE competitions SET state = 'completed', completed_at = NOW() WHERE id = $1",
        )
        .bind(competition_id)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }
}
