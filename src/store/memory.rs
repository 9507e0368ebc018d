//! Хранилище в памяти. Повторяет ограничения схемы Postgres
//! (уникальный слот зала, уникальный код брони, уникальное активное место),
//! используется в тестах и для локального запуска без базы.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{BookingStore, ScreeningStore, StoreError, StoreResult};
use crate::models::{
    Booking, BookingStatus, NewBooking, NewScreening, PaymentStatus, Screening, ScreeningStatus,
};

#[derive(Default)]
struct Tables {
    screenings: BTreeMap<i64, Screening>,
    bookings: BTreeMap<i64, Booking>,
    next_screening_id: i64,
    next_booking_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Снимок всех неотмененных броней сеанса (для проверок инвариантов).
    pub fn live_bookings(&self, screening_id: i64) -> Vec<Booking> {
        self.tables()
            .bookings
            .values()
            .filter(|b| b.screening_id == screening_id && b.holds_seats())
            .cloned()
            .collect()
    }

    /// Сдвигает время создания брони (для проверки истечения неоплаченных).
    pub fn backdate_booking(&self, id: i64, created_at: NaiveDateTime) {
        if let Some(booking) = self.tables().bookings.get_mut(&id) {
            booking.created_at = created_at;
        }
    }
}

#[async_trait]
impl ScreeningStore for MemoryStore {
    async fn find(&self, id: i64) -> StoreResult<Option<Screening>> {
        Ok(self.tables().screenings.get(&id).cloned())
    }

    async fn active_in_room(&self, room_id: i64, date: NaiveDate) -> StoreResult<Vec<Screening>> {
        let mut found: Vec<Screening> = self
            .tables()
            .screenings
            .values()
            .filter(|s| s.room_id == room_id && s.show_date == date && s.is_active())
            .cloned()
            .collect();
        found.sort_by_key(|s| s.show_time);
        Ok(found)
    }

    async fn active_on(
        &self,
        theater_id: i64,
        date: NaiveDate,
        room_id: Option<i64>,
    ) -> StoreResult<Vec<Screening>> {
        let mut found: Vec<Screening> = self
            .tables()
            .screenings
            .values()
            .filter(|s| {
                s.theater_id == theater_id
                    && s.show_date == date
                    && s.is_active()
                    && room_id.map_or(true, |r| s.room_id == r)
            })
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.room_id, s.show_time));
        Ok(found)
    }

    async fn insert(&self, new: &NewScreening) -> StoreResult<Screening> {
        let mut tables = self.tables();
        let taken = tables.screenings.values().any(|s| {
            s.room_id == new.room_id && s.show_date == new.show_date && s.show_time == new.show_time
        });
        if taken {
            return Err(StoreError::DuplicateSlot);
        }
        tables.next_screening_id += 1;
        let screening = Screening {
            id: tables.next_screening_id,
            movie_id: new.movie_id,
            theater_id: new.theater_id,
            room_id: new.room_id,
            show_date: new.show_date,
            show_time: new.show_time,
            price: new.price,
            seat_prices: new.seat_prices.clone(),
            total_seats: new.total_seats,
            available_seats: new.total_seats,
            status: ScreeningStatus::Active,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        tables.screenings.insert(screening.id, screening.clone());
        Ok(screening)
    }

    async fn save(&self, screening: &Screening) -> StoreResult<()> {
        let mut tables = self.tables();
        let clash = tables.screenings.values().any(|s| {
            s.id != screening.id
                && s.room_id == screening.room_id
                && s.show_date == screening.show_date
                && s.show_time == screening.show_time
        });
        if clash {
            return Err(StoreError::DuplicateSlot);
        }
        if let Some(stored) = tables.screenings.get_mut(&screening.id) {
            stored.movie_id = screening.movie_id;
            stored.room_id = screening.room_id;
            stored.show_date = screening.show_date;
            stored.show_time = screening.show_time;
            stored.price = screening.price;
            stored.seat_prices = screening.seat_prices.clone();
            stored.status = screening.status;
            stored.total_seats = screening.total_seats;
            stored.available_seats = screening.available_seats;
            stored.updated_at = screening.updated_at;
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables().screenings.remove(&id).is_some())
    }

    async fn take_seats(&self, id: i64, count: i32, at: NaiveDateTime) -> StoreResult<Option<i32>> {
        let mut tables = self.tables();
        Ok(tables.screenings.get_mut(&id).and_then(|s| {
            if s.available_seats < count {
                return None;
            }
            s.available_seats -= count;
            s.updated_at = at;
            Some(s.available_seats)
        }))
    }

    async fn return_seats(&self, id: i64, count: i32, at: NaiveDateTime) -> StoreResult<Option<i32>> {
        let mut tables = self.tables();
        Ok(tables.screenings.get_mut(&id).map(|s| {
            s.available_seats = (s.available_seats + count).min(s.total_seats);
            s.updated_at = at;
            s.available_seats
        }))
    }

    async fn set_capacity(&self, id: i64, total: i32, available: i32, at: NaiveDateTime) -> StoreResult<()> {
        if let Some(s) = self.tables().screenings.get_mut(&id) {
            s.total_seats = total;
            s.available_seats = available;
            s.updated_at = at;
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn find(&self, id: i64) -> StoreResult<Option<Booking>> {
        Ok(self.tables().bookings.get(&id).cloned())
    }

    async fn for_user(&self, user_id: i64) -> StoreResult<Vec<Booking>> {
        let mut found: Vec<Booking> = self
            .tables()
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn held_seats(&self, screening_id: i64) -> StoreResult<Vec<String>> {
        let mut labels: Vec<String> = self
            .live_bookings(screening_id)
            .iter()
            .flat_map(Booking::seat_labels)
            .collect();
        labels.sort();
        Ok(labels)
    }

    async fn insert(&self, new: &NewBooking) -> StoreResult<Booking> {
        let mut tables = self.tables();
        if tables.bookings.values().any(|b| b.booking_code == new.booking_code) {
            return Err(StoreError::DuplicateBookingCode(new.booking_code.clone()));
        }

        let held: HashSet<&str> = tables
            .bookings
            .values()
            .filter(|b| b.screening_id == new.screening_id && b.holds_seats())
            .flat_map(|b| b.seats.iter().map(|s| s.seat_label.as_str()))
            .collect();
        let mut taken: Vec<String> = new
            .seats
            .iter()
            .filter(|s| held.contains(s.seat_label.as_str()))
            .map(|s| s.seat_label.clone())
            .collect();
        if !taken.is_empty() {
            taken.sort();
            return Err(StoreError::SeatTaken(taken));
        }

        tables.next_booking_id += 1;
        let booking = Booking {
            id: tables.next_booking_id,
            booking_code: new.booking_code.clone(),
            user_id: new.user_id,
            screening_id: new.screening_id,
            seats: new.seats.clone(),
            total_amount: new.total_amount,
            payment_method: new.payment_method.clone(),
            payment_status: PaymentStatus::Pending,
            booking_status: BookingStatus::Confirmed,
            customer: new.customer.clone(),
            show_date: new.show_date,
            show_time: new.show_time,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn mark_cancelled(
        &self,
        id: i64,
        expected: PaymentStatus,
        payment: PaymentStatus,
        at: NaiveDateTime,
    ) -> StoreResult<bool> {
        let mut tables = self.tables();
        match tables.bookings.get_mut(&id) {
            Some(b) if b.booking_status == BookingStatus::Confirmed && b.payment_status == expected => {
                b.booking_status = BookingStatus::Cancelled;
                b.payment_status = payment;
                b.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_payment_status(
        &self,
        id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
        at: NaiveDateTime,
    ) -> StoreResult<bool> {
        let mut tables = self.tables();
        match tables.bookings.get_mut(&id) {
            Some(b) if b.booking_status == BookingStatus::Confirmed && b.payment_status == from => {
                b.payment_status = to;
                b.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn unpaid_before(&self, before: NaiveDateTime) -> StoreResult<Vec<Booking>> {
        Ok(self
            .tables()
            .bookings
            .values()
            .filter(|b| {
                b.booking_status == BookingStatus::Confirmed
                    && matches!(b.payment_status, PaymentStatus::Pending | PaymentStatus::Failed)
                    && b.created_at < before
            })
            .cloned()
            .collect())
    }

    async fn complete_started(&self, now: NaiveDateTime) -> StoreResult<u64> {
        let mut tables = self.tables();
        let Tables { screenings, bookings, .. } = &mut *tables;
        let mut completed = 0;
        for b in bookings.values_mut() {
            // живое время сеанса, копия в брони только для удаленного сеанса
            let starts_at = screenings
                .get(&b.screening_id)
                .map_or_else(|| b.show_date.and_time(b.show_time), Screening::starts_at);
            if b.booking_status == BookingStatus::Confirmed
                && b.payment_status == PaymentStatus::Paid
                && starts_at <= now
            {
                b.booking_status = BookingStatus::Completed;
                b.updated_at = now;
                completed += 1;
            }
        }
        Ok(completed)
    }
}
