use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use uuid::Uuid;

use competition_engine::{
    bracket::{BracketOptions, CompetitionFormat, build_bracket},
    entities::{Fixture, Participant, SchedulingStatus},
    schedule::{Occupancy, ScheduleConfig, SlotCandidate, find_conflict},
};

fn roster(n: usize) -> Vec<Participant> {
    (0..n).map(|i| Participant::new(format!("P{}", i))).collect()
}

/// Helper to create a day of confirmed bookings across several venues
fn setup_bookings(n_fixtures: usize) -> Vec<Fixture> {
    let base = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap();
    (0..n_fixtures)
        .map(|i| {
            let mut fixture = Fixture::new(Uuid::new_v4(), 1, i as u32);
            fixture.home = Some(Uuid::new_v4());
            fixture.away = Some(Uuid::new_v4());
            fixture.venue = Some(format!("Venue-{}", i % 8));
            fixture.kickoff = Some(base + Duration::hours((i / 8) as i64 * 3));
            fixture.duration_mins = 90;
            fixture.scheduling = SchedulingStatus::Confirmed;
            fixture
        })
        .collect()
}

/// Benchmark elimination bracket generation across roster sizes
fn bench_single_elimination(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_elimination");

    for n in [8, 32, 128, 512].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_participants", n)),
            n,
            |b, &n| {
                let participants = roster(n);
                b.iter(|| {
                    build_bracket(
                        Uuid::new_v4(),
                        &participants,
                        CompetitionFormat::SingleElimination,
                        &BracketOptions::default(),
                    )
                });
            },
        );
    }

    group.finish();
}

/// Benchmark round-robin generation, single and double legs
fn bench_round_robin(c: &mut Criterion) {
    let participants = roster(20);

    c.bench_function("round_robin_20", |b| {
        b.iter(|| {
            build_bracket(
                Uuid::new_v4(),
                &participants,
                CompetitionFormat::RoundRobin,
                &BracketOptions::default(),
            )
        });
    });

    let double = BracketOptions {
        double_round_robin: true,
        ..BracketOptions::default()
    };
    c.bench_function("double_round_robin_20", |b| {
        b.iter(|| {
            build_bracket(
                Uuid::new_v4(),
                &participants,
                CompetitionFormat::RoundRobin,
                &double,
            )
        });
    });
}

/// Benchmark group-stage generation for a large field
fn bench_group_stage(c: &mut Criterion) {
    let participants = roster(64);

    c.bench_function("group_stage_64", |b| {
        b.iter(|| {
            build_bracket(
                Uuid::new_v4(),
                &participants,
                CompetitionFormat::GroupKnockout,
                &BracketOptions::default(),
            )
        });
    });
}

/// Benchmark the conflict predicate against a loaded occupancy index
fn bench_conflict_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("conflict_check");
    let config = ScheduleConfig::default();

    for n_bookings in [50, 500].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_bookings", n_bookings)),
            n_bookings,
            |b, &n| {
                let bookings = setup_bookings(n);
                let occupancy = Occupancy::from_fixtures(&bookings, &config, None);
                let candidate = SlotCandidate {
                    fixture_id: Uuid::new_v4(),
                    home: Some(Uuid::new_v4()),
                    away: Some(Uuid::new_v4()),
                    venue: Some("Venue-3".to_string()),
                    start: Utc.with_ymd_and_hms(2026, 6, 1, 20, 0, 0).unwrap(),
                    duration_mins: 90,
                };
                b.iter(|| find_conflict(&candidate, &occupancy, &config));
            },
        );
    }

    group.finish();
}

/// Benchmark building the occupancy index itself
fn bench_occupancy_build(c: &mut Criterion) {
    let config = ScheduleConfig::default();
    let bookings = setup_bookings(500);

    c.bench_function("occupancy_from_500_fixtures", |b| {
        b.iter(|| Occupancy::from_fixtures(&bookings, &config, None));
    });
}

criterion_group!(
    bracket_generation,
    bench_single_elimination,
    bench_round_robin,
    bench_group_stage,
);

criterion_group!(
    scheduling,
    bench_conflict_check,
    bench_occupancy_build,
);

criterion_main!(bracket_generation, scheduling);
