#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use std::collections::HashMap;
use std::sync::Arc;

use showtime_booking::booking::{BookingService, CreateBooking, CustomerDraft, SeatRequest};
use showtime_booking::catalog::StaticCatalog;
use showtime_booking::config::{BookingConfig, SchedulingConfig};
use showtime_booking::inventory::SeatLedger;
use showtime_booking::models::Screening;
use showtime_booking::scheduling::{CreateScreening, Scheduler};
use showtime_booking::store::MemoryStore;

pub const THEATER: i64 = 1;
pub const ROOM: i64 = 10;
pub const ROOM_CAPACITY: i32 = 100;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub catalog: Arc<StaticCatalog>,
    pub ledger: Arc<SeatLedger>,
    pub scheduler: Scheduler,
    pub bookings: BookingService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_booking_config(BookingConfig::default())
    }

    pub fn with_booking_config(booking: BookingConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let catalog = Arc::new(StaticCatalog::new());
        catalog.add_room(THEATER, ROOM, ROOM_CAPACITY);
        catalog.add_room(THEATER, ROOM + 1, ROOM_CAPACITY);
        catalog.add_movie(1, "Long Feature", 120);
        catalog.add_movie(2, "Short Feature", 90);
        catalog.add_movie(3, "Epic", 150);

        let ledger = Arc::new(SeatLedger::new(store.clone(), store.clone()));
        let scheduler = Scheduler::new(
            catalog.clone(),
            store.clone(),
            ledger.clone(),
            SchedulingConfig::default(),
        );
        let bookings = BookingService::new(catalog.clone(), store.clone(), store.clone(), ledger.clone(), booking);
        Self { store, catalog, ledger, scheduler, bookings }
    }

    pub async fn schedule(&self, movie_id: i64, date: NaiveDate, time: &str) -> Screening {
        self.scheduler
            .create(screening_request(movie_id, ROOM, date, time))
            .await
            .expect("screening should be scheduled")
    }
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

pub fn time(raw: &str) -> NaiveTime {
    NaiveTime::parse_from_str(raw, "%H:%M").unwrap()
}

pub fn at(day: &str, hhmm: &str) -> NaiveDateTime {
    date(day).and_time(time(hhmm))
}

pub fn screening_request(movie_id: i64, room_id: i64, date: NaiveDate, hhmm: &str) -> CreateScreening {
    CreateScreening {
        movie_id,
        theater_id: THEATER,
        room_id,
        date,
        time: time(hhmm),
        price: 10.0,
        seat_prices: HashMap::from([("vip".to_string(), 15.0)]),
        total_seats: Some(ROOM_CAPACITY),
    }
}

pub fn customer() -> CustomerDraft {
    CustomerDraft {
        name: Some(Name().fake()),
        email: Some(SafeEmail().fake()),
        phone: None,
    }
}

pub fn booking_request(screening_id: i64, seats: &[&str]) -> CreateBooking {
    CreateBooking {
        screening_id,
        seats: seats
            .iter()
            .map(|label| SeatRequest {
                seat_label: label.to_string(),
                seat_class: None,
                price: None,
            })
            .collect(),
        payment_method: "card".to_string(),
        customer_info: customer(),
    }
}
