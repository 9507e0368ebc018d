use chrono::NaiveTime;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use showtime_booking::scheduling::{find_conflict, suggest, Candidate, ScheduledShow, SlotWindow};

fn day_of_shows() -> Vec<ScheduledShow> {
    (0..6)
        .map(|i| ScheduledShow {
            screening_id: i,
            movie_title: format!("Movie {i}"),
            start: NaiveTime::from_hms_opt(9 + 2 * i as u32, 30, 0).unwrap(),
            duration_minutes: 100,
        })
        .collect()
}

fn bench_conflicts(c: &mut Criterion) {
    let shows = day_of_shows();
    let candidate = Candidate::new(NaiveTime::from_hms_opt(14, 0, 0).unwrap(), 110);
    c.bench_function("find_conflict_6_shows", |b| {
        b.iter(|| find_conflict(black_box(&candidate), black_box(&shows), 15, None))
    });

    let window = SlotWindow {
        first_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        last_start: NaiveTime::from_hms_opt(22, 30, 0).unwrap(),
        step_minutes: 15,
    };
    c.bench_function("suggest_full_day", |b| {
        b.iter(|| suggest(black_box(&window), 110, black_box(&shows), 15))
    });
}

criterion_group!(benches, bench_conflicts);
criterion_main!(benches);
