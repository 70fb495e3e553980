//! Conflict predicate and window behavior through the public API.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use uuid::Uuid;

use competition_engine::entities::{Fixture, SchedulingStatus};
use competition_engine::schedule::{
    ConflictReason, Occupancy, ScheduleConfig, ScheduleWindow, SlotCandidate, find_conflict,
};

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 10, h, m, 0).unwrap()
}

fn booked(venue: &str, start: DateTime<Utc>, duration_mins: i64) -> Fixture {
    let mut fixture = Fixture::new(Uuid::new_v4(), 1, 0);
    fixture.home = Some(Uuid::new_v4());
    fixture.away = Some(Uuid::new_v4());
    fixture.venue = Some(venue.to_string());
    fixture.kickoff = Some(start);
    fixture.duration_mins = duration_mins;
    fixture.scheduling = SchedulingStatus::Confirmed;
    fixture
}

fn candidate(venue: &str, start: DateTime<Utc>) -> SlotCandidate {
    SlotCandidate {
        fixture_id: Uuid::new_v4(),
        home: Some(Uuid::new_v4()),
        away: Some(Uuid::new_v4()),
        venue: Some(venue.to_string()),
        start,
        duration_mins: 90,
    }
}

#[test]
fn test_buffered_venue_occupancy() {
    // Field-1 is booked 14:00 for 90 minutes. With the default 30-minute
    // turnaround buffer the venue is taken from 13:30 to 15:30: a 15:20
    // kickoff clashes, a 15:35 kickoff fits.
    let config = ScheduleConfig::default();
    let occupancy = Occupancy::from_fixtures(&[booked("Field-1", at(14, 0), 90)], &config, None);

    let clash = find_conflict(&candidate("Field-1", at(15, 20)), &occupancy, &config);
    assert!(matches!(clash, Some(ConflictReason::VenueOccupied { .. })));

    let fits = find_conflict(&candidate("Field-1", at(15, 35)), &occupancy, &config);
    assert_eq!(fits, None);

    // A different venue at the same time is free.
    let elsewhere = find_conflict(&candidate("Field-2", at(14, 0)), &occupancy, &config);
    assert_eq!(elsewhere, None);
}

#[test]
fn test_rest_period_spans_venues() {
    let config = ScheduleConfig::default();
    let shared = Uuid::new_v4();

    let mut morning = booked("Field-1", at(8, 0), 90);
    morning.home = Some(shared);
    let occupancy = Occupancy::from_fixtures(&[morning], &config, None);

    // The same participant eleven hours later, elsewhere: rejected.
    let mut evening = candidate("Field-2", at(19, 0));
    evening.away = Some(shared);
    assert!(matches!(
        find_conflict(&evening, &occupancy, &config),
        Some(ConflictReason::RestPeriod { participant, .. }) if participant == shared
    ));

    // A minute past the twelve-hour rest window: accepted.
    evening.start = at(20, 1);
    assert_eq!(find_conflict(&evening, &occupancy, &config), None);
}

#[test]
fn test_conflicted_bookings_do_not_occupy() {
    let config = ScheduleConfig::default();
    let mut stale = booked("Field-1", at(14, 0), 90);
    stale.scheduling = SchedulingStatus::Conflicted;
    let occupancy = Occupancy::from_fixtures(&[stale], &config, None);
    assert_eq!(
        find_conflict(&candidate("Field-1", at(14, 0)), &occupancy, &config),
        None
    );
}

#[test]
fn test_rescheduled_bookings_still_occupy() {
    let config = ScheduleConfig::default();
    let mut moved = booked("Field-1", at(14, 0), 90);
    moved.scheduling = SchedulingStatus::Rescheduled;
    let occupancy = Occupancy::from_fixtures(&[moved], &config, None);
    assert!(find_conflict(&candidate("Field-1", at(14, 0)), &occupancy, &config).is_some());
}

#[test]
fn test_window_enumerates_slots_in_local_time() {
    // A Monday-to-Sunday window at UTC+2, playing at 18:00 and 20:30, with
    // weekends excluded.
    let window = ScheduleWindow {
        start_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(),
        daily_slots: vec![
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(20, 30, 0).unwrap(),
        ],
        excluded_weekdays: vec![Weekday::Sat, Weekday::Sun],
        venues: vec!["Field-1".to_string()],
        utc_offset: FixedOffset::east_opt(2 * 3600).unwrap(),
    };
    window.validate().unwrap();

    let days: Vec<NaiveDate> = window.playable_days().collect();
    assert_eq!(days.len(), 5);

    let starts = window.slot_starts(days[0]);
    assert_eq!(starts.len(), 2);
    // 18:00 local at UTC+2 is 16:00 UTC.
    assert_eq!(starts[0].time(), NaiveTime::from_hms_opt(16, 0, 0).unwrap());
    assert_eq!(starts[1].time(), NaiveTime::from_hms_opt(18, 30, 0).unwrap());

    let (span_start, span_end) = window.span();
    assert!(span_start < starts[0]);
    assert_eq!(span_end - span_start, Duration::days(7));
}

#[test]
fn test_occupancy_grows_as_slots_commit() {
    // Committing a fixture into the index makes the same slot unavailable to
    // the next candidate, the way the batch scheduler extends its view.
    let config = ScheduleConfig::default();
    let mut occupancy = Occupancy::new();

    let slot = at(18, 0);
    let first = candidate("Field-1", slot);
    assert_eq!(find_conflict(&first, &occupancy, &config), None);

    let mut committed = booked("Field-1", slot, 90);
    committed.home = first.home;
    committed.away = first.away;
    occupancy.insert(&committed, &config);

    let second = candidate("Field-1", slot);
    assert!(matches!(
        find_conflict(&second, &occupancy, &config),
        Some(ConflictReason::VenueOccupied { .. })
    ));
}
