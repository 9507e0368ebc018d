mod common;

use common::*;
use showtime_booking::error::{ServiceError, StateError};
use showtime_booking::models::ScreeningStatus;
use showtime_booking::scheduling::{CopyRequest, ScreeningChanges};
use showtime_booking::store::ScreeningStore;

#[tokio::test]
async fn overlapping_screening_is_rejected_with_details() {
    let h = Harness::new();
    let day = date("2024-05-10");
    let existing = h.schedule(1, day, "10:00").await;

    let err = h
        .scheduler
        .create(screening_request(2, ROOM, day, "11:00"))
        .await
        .unwrap_err();
    match err {
        ServiceError::SchedulingConflict(conflict) => {
            assert_eq!(conflict.screening_id, existing.id);
            assert_eq!(conflict.movie_title, "Long Feature");
            assert_eq!(conflict.start_time, time("10:00"));
            assert_eq!(conflict.duration_minutes, 120);
        }
        other => panic!("expected scheduling conflict, got {other:?}"),
    }

    let accepted = h
        .scheduler
        .create(screening_request(2, ROOM, day, "12:15"))
        .await
        .unwrap();
    assert_eq!(accepted.available_seats, accepted.total_seats);
    assert_eq!(accepted.status, ScreeningStatus::Active);
}

#[tokio::test]
async fn other_rooms_and_dates_do_not_conflict() {
    let h = Harness::new();
    let day = date("2024-05-10");
    h.schedule(1, day, "10:00").await;

    h.scheduler
        .create(screening_request(2, ROOM + 1, day, "10:30"))
        .await
        .unwrap();
    h.scheduler
        .create(screening_request(2, ROOM, date("2024-05-11"), "10:30"))
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_movie_or_room_is_not_found() {
    let h = Harness::new();
    let day = date("2024-05-10");

    let err = h.scheduler.create(screening_request(99, ROOM, day, "10:00")).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "movie", .. }));

    let err = h.scheduler.create(screening_request(1, 404, day, "10:00")).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "room", .. }));
}

#[tokio::test]
async fn capacity_and_room_status_are_enforced() {
    let h = Harness::new();
    let day = date("2024-05-10");

    let mut too_big = screening_request(1, ROOM, day, "10:00");
    too_big.total_seats = Some(ROOM_CAPACITY + 1);
    assert!(matches!(h.scheduler.create(too_big).await, Err(ServiceError::Validation(_))));

    let mut defaulted = screening_request(1, ROOM, day, "10:00");
    defaulted.total_seats = None;
    assert_eq!(h.scheduler.create(defaulted).await.unwrap().total_seats, ROOM_CAPACITY);

    h.catalog.set_room_status(THEATER, ROOM + 1, "maintenance");
    let err = h
        .scheduler
        .create(screening_request(1, ROOM + 1, day, "10:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn update_ignores_the_screening_itself() {
    let h = Harness::new();
    let day = date("2024-05-10");
    let screening = h.schedule(1, day, "10:00").await;

    let moved = h
        .scheduler
        .update(
            screening.id,
            ScreeningChanges { time: Some(time("10:30")), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(moved.show_time, time("10:30"));
}

#[tokio::test]
async fn update_into_occupied_slot_is_rejected() {
    let h = Harness::new();
    let day = date("2024-05-10");
    let first = h.schedule(1, day, "10:00").await;
    let second = h.schedule(2, day, "14:00").await;

    let err = h
        .scheduler
        .update(
            second.id,
            ScreeningChanges { time: Some(time("11:00")), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::SchedulingConflict(ref c) if c.screening_id == first.id));

    // цена не требует повторной проверки
    let repriced = h
        .scheduler
        .update(second.id, ScreeningChanges { price: Some(12.0), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(repriced.price, 12.0);
    assert_eq!(repriced.show_time, time("14:00"));
}

#[tokio::test]
async fn reactivation_rechecks_conflicts() {
    let h = Harness::new();
    let day = date("2024-05-10");
    let first = h.schedule(1, day, "10:00").await;
    h.scheduler
        .update(
            first.id,
            ScreeningChanges { status: Some(ScreeningStatus::Inactive), ..Default::default() },
        )
        .await
        .unwrap();

    // неактивный сеанс не занимает зал
    h.schedule(2, day, "10:30").await;

    let err = h
        .scheduler
        .update(
            first.id,
            ScreeningChanges { status: Some(ScreeningStatus::Active), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::SchedulingConflict(_)));
}

#[tokio::test]
async fn resizing_keeps_held_seats_counted() {
    let h = Harness::new();
    let screening = h.schedule(1, date("2024-05-10"), "10:00").await;
    h.bookings
        .create_booking(7, booking_request(screening.id, &["A1", "A2"]))
        .await
        .unwrap();

    let resized = h
        .scheduler
        .update(screening.id, ScreeningChanges { total_seats: Some(50), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(resized.total_seats, 50);
    assert_eq!(resized.available_seats, 48);

    let err = h
        .scheduler
        .update(screening.id, ScreeningChanges { total_seats: Some(1), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::State(StateError::CapacityBelowHeld { requested: 1, held: 2 })
    ));
}

#[tokio::test]
async fn failed_move_leaves_capacity_untouched() {
    let h = Harness::new();
    let day = date("2024-05-10");
    let screening = h.schedule(1, day, "10:00").await;
    let parked = h.schedule(2, day, "18:00").await;
    h.scheduler
        .update(parked.id, ScreeningChanges { status: Some(ScreeningStatus::Cancelled), ..Default::default() })
        .await
        .unwrap();

    // слот 18:00 держит неактивный сеанс: конфликта нет, но ключ слота занят
    let err = h
        .scheduler
        .update(
            screening.id,
            ScreeningChanges { time: Some(time("18:00")), total_seats: Some(40), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let stored = h.scheduler.get(screening.id).await.unwrap();
    assert_eq!(stored.show_time, time("10:00"));
    assert_eq!(stored.total_seats, ROOM_CAPACITY);
    assert_eq!(stored.available_seats, ROOM_CAPACITY);
}

#[tokio::test]
async fn move_and_resize_are_saved_together() {
    let h = Harness::new();
    let day = date("2024-05-10");
    let screening = h.schedule(1, day, "10:00").await;
    h.bookings
        .create_booking(7, booking_request(screening.id, &["A1"]))
        .await
        .unwrap();

    let moved = h
        .scheduler
        .update(
            screening.id,
            ScreeningChanges { time: Some(time("15:00")), total_seats: Some(40), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(moved.show_time, time("15:00"));
    assert_eq!(moved.total_seats, 40);
    assert_eq!(moved.available_seats, 39);

    // правка цены счетчики не трогает
    let repriced = h
        .scheduler
        .update(screening.id, ScreeningChanges { price: Some(12.5), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(repriced.price, 12.5);
    assert_eq!(repriced.available_seats, 39);
}

#[tokio::test]
async fn delete_removes_screening() {
    let h = Harness::new();
    let screening = h.schedule(1, date("2024-05-10"), "10:00").await;

    h.scheduler.delete(screening.id).await.unwrap();
    assert!(ScreeningStore::find(h.store.as_ref(), screening.id).await.unwrap().is_none());
    assert!(matches!(
        h.scheduler.delete(screening.id).await,
        Err(ServiceError::NotFound { entity: "screening", .. })
    ));
    assert!(matches!(
        h.scheduler.update(screening.id, ScreeningChanges::default()).await,
        Err(ServiceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn copy_skips_conflicts_and_starts_with_fresh_inventory() {
    let h = Harness::new();
    let d1 = date("2024-05-10");
    let d2 = date("2024-05-11");

    let morning = h.schedule(1, d1, "10:00").await;
    h.schedule(2, d1, "13:00").await;
    h.schedule(3, d1, "16:00").await;
    h.bookings
        .create_booking(3, booking_request(morning.id, &["C1", "C2", "C3"]))
        .await
        .unwrap();

    // на целевой дате уже стоит показ поверх 13:00
    let blocker = h.schedule(2, d2, "13:30").await;

    let outcome = h
        .scheduler
        .copy(CopyRequest { from_date: d1, to_date: d2, theater_id: THEATER, room_id: Some(ROOM) })
        .await
        .unwrap();

    assert_eq!(outcome.copied_count, 2);
    assert_eq!(outcome.conflict_count, 1);
    assert_eq!(outcome.conflicts[0].time, time("13:00"));
    assert_eq!(outcome.conflicts[0].conflict.as_ref().unwrap().screening_id, blocker.id);
    for created in &outcome.new_screenings {
        assert_eq!(created.show_date, d2);
        assert_eq!(created.available_seats, created.total_seats);
    }
}

#[tokio::test]
async fn copy_to_same_date_is_invalid() {
    let h = Harness::new();
    let d = date("2024-05-10");
    let err = h
        .scheduler
        .copy(CopyRequest { from_date: d, to_date: d, theater_id: THEATER, room_id: None })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn slot_report_reflects_existing_shows() {
    let h = Harness::new();
    let day = date("2024-05-10");
    let existing = h.schedule(1, day, "10:00").await;

    let report = h.scheduler.available_slots(ROOM, day, 2).await.unwrap();
    assert_eq!(report.all_slots.len(), 55);
    assert_eq!(
        report.available_slots.len() + report.unavailable_slots.len(),
        report.all_slots.len()
    );

    let ten_thirty = report.all_slots.iter().find(|s| s.time == time("10:30")).unwrap();
    assert!(!ten_thirty.available);
    assert_eq!(ten_thirty.end_time, time("12:00"));
    assert_eq!(ten_thirty.conflict.as_ref().unwrap().screening_id, existing.id);

    let quarter_past = report.all_slots.iter().find(|s| s.time == time("12:15")).unwrap();
    assert!(quarter_past.available);

    assert!(matches!(
        h.scheduler.available_slots(ROOM, day, 99).await,
        Err(ServiceError::NotFound { entity: "movie", .. })
    ));
}

#[tokio::test]
async fn concurrent_creates_in_same_room_admit_one() {
    let h = std::sync::Arc::new(Harness::new());
    let day = date("2024-05-10");

    let tasks: Vec<_> = ["10:00", "10:30", "11:00", "11:15"]
        .into_iter()
        .map(|t| {
            let h = h.clone();
            tokio::spawn(async move { h.scheduler.create(screening_request(1, ROOM, day, t)).await })
        })
        .collect();
    let results = futures::future::join_all(tasks).await;
    let created = results.into_iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    assert_eq!(created, 1);
}
