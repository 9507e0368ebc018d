use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{FromRow, PgPool};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use super::{BookingStore, ScreeningStore, StoreError, StoreResult};
use crate::models::{
    Booking, BookingStatus, CustomerInfo, NewBooking, NewScreening, PaymentStatus, SeatClaim,
    Screening,
};

// Имена ограничений из миграции 0001_init.sql
const SCREENING_SLOT_KEY: &str = "screenings_slot_key";
const BOOKING_CODE_KEY: &str = "bookings_code_key";
const ACTIVE_SEAT_KEY: &str = "booking_seats_active_key";

const SCREENING_COLUMNS: &str = "id, movie_id, theater_id, room_id, show_date, show_time, price, \
     seat_prices, total_seats, available_seats, status, created_at, updated_at";

const BOOKING_COLUMNS: &str = "id, booking_code, user_id, screening_id, total_amount, payment_method, \
     payment_status, booking_status, customer_name, customer_email, customer_phone, \
     show_date, show_time, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db| db.constraint())
        .map(str::to_string)
}

#[derive(FromRow)]
struct BookingRow {
    id: i64,
    booking_code: String,
    user_id: i64,
    screening_id: i64,
    total_amount: f64,
    payment_method: String,
    payment_status: PaymentStatus,
    booking_status: BookingStatus,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    show_date: NaiveDate,
    show_time: NaiveTime,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl BookingRow {
    fn into_booking(self, seats: Vec<SeatClaim>) -> Booking {
        Booking {
            id: self.id,
            booking_code: self.booking_code,
            user_id: self.user_id,
            screening_id: self.screening_id,
            seats,
            total_amount: self.total_amount,
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            booking_status: self.booking_status,
            customer: CustomerInfo {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
            },
            show_date: self.show_date,
            show_time: self.show_time,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SeatRow {
    booking_id: i64,
    seat_label: String,
    seat_class: String,
    price: f64,
}

impl PgStore {
    /// Подтягивает места к строкам броней одним запросом.
    async fn attach_seats(&self, rows: Vec<BookingRow>) -> StoreResult<Vec<Booking>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let seat_rows = sqlx::query_as::<_, SeatRow>(
            "SELECT booking_id, seat_label, seat_class, price
             FROM booking_seats
             WHERE booking_id = ANY($1)
             ORDER BY booking_id, position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_booking: BTreeMap<i64, Vec<SeatClaim>> = BTreeMap::new();
        for s in seat_rows {
            by_booking.entry(s.booking_id).or_default().push(SeatClaim {
                seat_label: s.seat_label,
                seat_class: s.seat_class,
                price: s.price,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let seats = by_booking.remove(&row.id).unwrap_or_default();
                row.into_booking(seats)
            })
            .collect())
    }
}

#[async_trait]
impl ScreeningStore for PgStore {
    async fn find(&self, id: i64) -> StoreResult<Option<Screening>> {
        let sql = format!("SELECT {SCREENING_COLUMNS} FROM screenings WHERE id = $1");
        Ok(sqlx::query_as::<_, Screening>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn active_in_room(&self, room_id: i64, date: NaiveDate) -> StoreResult<Vec<Screening>> {
        let sql = format!(
            "SELECT {SCREENING_COLUMNS} FROM screenings
             WHERE room_id = $1 AND show_date = $2 AND status = 'active'
             ORDER BY show_time"
        );
        Ok(sqlx::query_as::<_, Screening>(&sql)
            .bind(room_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn active_on(
        &self,
        theater_id: i64,
        date: NaiveDate,
        room_id: Option<i64>,
    ) -> StoreResult<Vec<Screening>> {
        let sql = format!(
            "SELECT {SCREENING_COLUMNS} FROM screenings
             WHERE theater_id = $1 AND show_date = $2 AND status = 'active'
               AND ($3::BIGINT IS NULL OR room_id = $3)
             ORDER BY room_id, show_time"
        );
        Ok(sqlx::query_as::<_, Screening>(&sql)
            .bind(theater_id)
            .bind(date)
            .bind(room_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert(&self, new: &NewScreening) -> StoreResult<Screening> {
        let sql = format!(
            "INSERT INTO screenings
                 (movie_id, theater_id, room_id, show_date, show_time, price, seat_prices,
                  total_seats, available_seats, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, 'active', $9, $9)
             RETURNING {SCREENING_COLUMNS}"
        );
        sqlx::query_as::<_, Screening>(&sql)
            .bind(new.movie_id)
            .bind(new.theater_id)
            .bind(new.room_id)
            .bind(new.show_date)
            .bind(new.show_time)
            .bind(new.price)
            .bind(sqlx::types::Json(&new.seat_prices))
            .bind(new.total_seats)
            .bind(new.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match violated_constraint(&e).as_deref() {
                Some(SCREENING_SLOT_KEY) => StoreError::DuplicateSlot,
                _ => StoreError::Database(e),
            })
    }

    async fn save(&self, screening: &Screening) -> StoreResult<()> {
        sqlx::query(
            "UPDATE screenings
             SET movie_id = $2, room_id = $3, show_date = $4, show_time = $5,
                 price = $6, seat_prices = $7, status = $8, updated_at = $9,
                 total_seats = $10, available_seats = $11
             WHERE id = $1",
        )
        .bind(screening.id)
        .bind(screening.movie_id)
        .bind(screening.room_id)
        .bind(screening.show_date)
        .bind(screening.show_time)
        .bind(screening.price)
        .bind(sqlx::types::Json(&screening.seat_prices))
        .bind(screening.status)
        .bind(screening.updated_at)
        .bind(screening.total_seats)
        .bind(screening.available_seats)
        .execute(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e).as_deref() {
            Some(SCREENING_SLOT_KEY) => StoreError::DuplicateSlot,
            _ => StoreError::Database(e),
        })?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM screenings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn take_seats(&self, id: i64, count: i32, at: NaiveDateTime) -> StoreResult<Option<i32>> {
        Ok(sqlx::query_scalar::<_, i32>(
            "UPDATE screenings
             SET available_seats = available_seats - $2, updated_at = $3
             WHERE id = $1 AND available_seats >= $2
             RETURNING available_seats",
        )
        .bind(id)
        .bind(count)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn return_seats(&self, id: i64, count: i32, at: NaiveDateTime) -> StoreResult<Option<i32>> {
        Ok(sqlx::query_scalar::<_, i32>(
            "UPDATE screenings
             SET available_seats = LEAST(total_seats, available_seats + $2), updated_at = $3
             WHERE id = $1
             RETURNING available_seats",
        )
        .bind(id)
        .bind(count)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_capacity(&self, id: i64, total: i32, available: i32, at: NaiveDateTime) -> StoreResult<()> {
        sqlx::query(
            "UPDATE screenings SET total_seats = $2, available_seats = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(total)
        .bind(available)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn find(&self, id: i64) -> StoreResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.attach_seats(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn for_user(&self, user_id: i64) -> StoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        self.attach_seats(rows).await
    }

    async fn held_seats(&self, screening_id: i64) -> StoreResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT seat_label FROM booking_seats
             WHERE screening_id = $1 AND active
             ORDER BY seat_label",
        )
        .bind(screening_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert(&self, new: &NewBooking) -> StoreResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO bookings
                 (booking_code, user_id, screening_id, total_amount, payment_method,
                  payment_status, booking_status, customer_name, customer_email, customer_phone,
                  show_date, show_time, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, 'pending', 'confirmed', $6, $7, $8, $9, $10, $11, $11)
             RETURNING {BOOKING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(&new.booking_code)
            .bind(new.user_id)
            .bind(new.screening_id)
            .bind(new.total_amount)
            .bind(&new.payment_method)
            .bind(&new.customer.name)
            .bind(&new.customer.email)
            .bind(&new.customer.phone)
            .bind(new.show_date)
            .bind(new.show_time)
            .bind(new.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match violated_constraint(&e).as_deref() {
                Some(BOOKING_CODE_KEY) => StoreError::DuplicateBookingCode(new.booking_code.clone()),
                _ => StoreError::Database(e),
            })?;

        for (position, seat) in new.seats.iter().enumerate() {
            let inserted = sqlx::query(
                "INSERT INTO booking_seats
                     (booking_id, screening_id, position, seat_label, seat_class, price, active)
                 VALUES ($1, $2, $3, $4, $5, $6, TRUE)",
            )
            .bind(row.id)
            .bind(new.screening_id)
            .bind(position as i32)
            .bind(&seat.seat_label)
            .bind(&seat.seat_class)
            .bind(seat.price)
            .execute(&mut *tx)
            .await;

            if let Err(e) = inserted {
                let _ = tx.rollback().await;
                if violated_constraint(&e).as_deref() == Some(ACTIVE_SEAT_KEY) {
                    // Место заняла бронь из другого процесса
                    let held: HashSet<String> =
                        self.held_seats(new.screening_id).await?.into_iter().collect();
                    let mut taken: Vec<String> = new
                        .seats
                        .iter()
                        .filter(|s| held.contains(&s.seat_label))
                        .map(|s| s.seat_label.clone())
                        .collect();
                    if taken.is_empty() {
                        taken.push(seat.seat_label.clone());
                    }
                    warn!("Seat uniqueness backstop hit for screening {}: {:?}", new.screening_id, taken);
                    return Err(StoreError::SeatTaken(taken));
                }
                return Err(StoreError::Database(e));
            }
        }

        tx.commit().await?;
        Ok(row.into_booking(new.seats.clone()))
    }

    async fn mark_cancelled(
        &self,
        id: i64,
        expected: PaymentStatus,
        payment: PaymentStatus,
        at: NaiveDateTime,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE bookings
             SET booking_status = 'cancelled', payment_status = $3, updated_at = $4
             WHERE id = $1 AND booking_status = 'confirmed' AND payment_status = $2",
        )
        .bind(id)
        .bind(expected)
        .bind(payment)
        .bind(at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE booking_seats SET active = FALSE WHERE booking_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn set_payment_status(
        &self,
        id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
        at: NaiveDateTime,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE bookings SET payment_status = $3, updated_at = $4
             WHERE id = $1 AND payment_status = $2 AND booking_status = 'confirmed'",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unpaid_before(&self, before: NaiveDateTime) -> StoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE booking_status = 'confirmed'
               AND payment_status IN ('pending', 'failed')
               AND created_at < $1
             ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(before)
            .fetch_all(&self.pool)
            .await?;
        self.attach_seats(rows).await
    }

    async fn complete_started(&self, now: NaiveDateTime) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE bookings b SET booking_status = 'completed', updated_at = $1
             WHERE b.booking_status = 'confirmed'
               AND b.payment_status = 'paid'
               AND COALESCE(
                     (SELECT s.show_date + s.show_time FROM screenings s WHERE s.id = b.screening_id),
                     b.show_date + b.show_time
                   ) <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
