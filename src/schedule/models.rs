//! Scheduling value objects and configuration.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};

use crate::entities::Fixture;

use super::errors::ScheduleError;

/// Caller-supplied search space for automatic scheduling. Not persisted.
#[derive(Debug, Clone)]
pub struct ScheduleWindow {
    /// First calendar day to consider
    pub start_date: NaiveDate,
    /// Last calendar day to consider (inclusive)
    pub end_date: NaiveDate,
    /// Candidate daily kickoff times, tried in the order supplied
    pub daily_slots: Vec<NaiveTime>,
    /// Weekdays never played on
    pub excluded_weekdays: Vec<Weekday>,
    /// Candidate venues, tried in the order supplied; empty means venue-less
    pub venues: Vec<String>,
    /// Local offset the daily slots are expressed in
    pub utc_offset: FixedOffset,
}

impl ScheduleWindow {
    /// Structural validation; per-fixture feasibility is not checked here.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.end_date < self.start_date {
            return Err(ScheduleError::InvalidWindow(format!(
                "end date {} precedes start date {}",
                self.end_date, self.start_date
            )));
        }
        if self.daily_slots.is_empty() {
            return Err(ScheduleError::InvalidWindow(
                "no candidate daily time offsets supplied".to_string(),
            ));
        }
        Ok(())
    }

    /// Calendar days of the window with excluded weekdays skipped.
    pub fn playable_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(move |day| *day <= self.end_date)
            .filter(move |day| !self.excluded_weekdays.contains(&day.weekday()))
    }

    /// Candidate kickoffs for one day, converted to UTC.
    pub fn slot_starts(&self, day: NaiveDate) -> Vec<DateTime<Utc>> {
        self.daily_slots
            .iter()
            .filter_map(|slot| {
                day.and_time(*slot)
                    .and_local_timezone(self.utc_offset)
                    .single()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .collect()
    }

    /// The UTC span covered by the window.
    pub fn span(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self
            .start_date
            .and_time(NaiveTime::MIN)
            .and_local_timezone(self.utc_offset)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let end = start + Duration::days((self.end_date - self.start_date).num_days() + 1);
        (start, end)
    }
}

/// Tunables for the conflict predicate and slot search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Turnaround buffer ahead of each booked fixture, in minutes
    pub buffer_mins: i64,
    /// Minimum gap between two fixtures sharing a participant, in hours
    pub rest_hours: i64,
    /// Duration assumed when a fixture carries no estimate, in minutes
    pub default_duration_mins: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            buffer_mins: 30,
            rest_hours: 12,
            default_duration_mins: 90,
        }
    }
}

impl ScheduleConfig {
    /// Load tunables from environment variables, defaulting anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            buffer_mins: parse_env_or("SCHEDULE_BUFFER_MINS", defaults.buffer_mins),
            rest_hours: parse_env_or("SCHEDULE_REST_HOURS", defaults.rest_hours),
            default_duration_mins: parse_env_or(
                "SCHEDULE_DEFAULT_DURATION_MINS",
                defaults.default_duration_mins,
            ),
        }
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(self.buffer_mins)
    }

    pub fn rest_period(&self) -> Duration {
        Duration::hours(self.rest_hours)
    }
}

fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Outcome of a manual scheduling or reschedule attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleAttempt {
    /// Whether the assignment was committed
    pub scheduled: bool,
    /// The conflict reason when it was not
    pub conflict: Option<String>,
}

impl ScheduleAttempt {
    pub fn committed() -> Self {
        Self {
            scheduled: true,
            conflict: None,
        }
    }

    pub fn conflicted(reason: String) -> Self {
        Self {
            scheduled: false,
            conflict: Some(reason),
        }
    }
}

/// Full partition of one batch-scheduling run.
#[derive(Debug, Clone, Default)]
pub struct AutoScheduleOutcome {
    /// Fixtures committed to a slot during this run
    pub assigned: Vec<Fixture>,
    /// Fixtures no window slot could accommodate
    pub conflicted: Vec<Fixture>,
}
