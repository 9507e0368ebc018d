//! Хранилище сеансов и броней.
//!
//! Трейты описывают ровно те операции, которые нужны ядру. Запись счетчика
//! мест всегда условная: `take_seats` не уводит остаток в минус, `return_seats`
//! не поднимает его выше `total_seats`. Уникальность места среди активных
//! броней держит само хранилище (`SeatTaken`), это страховка поверх
//! блокировок в процессе.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::models::{Booking, NewBooking, NewScreening, PaymentStatus, Screening};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("booking code {0} is already taken")]
    DuplicateBookingCode(String),
    #[error("seats already held: {}", .0.join(", "))]
    SeatTaken(Vec<String>),
    #[error("room already has a screening at that date and time")]
    DuplicateSlot,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ScreeningStore: Send + Sync {
    async fn find(&self, id: i64) -> StoreResult<Option<Screening>>;

    /// Активные сеансы зала на дату.
    async fn active_in_room(&self, room_id: i64, date: NaiveDate) -> StoreResult<Vec<Screening>>;

    /// Активные сеансы кинотеатра на дату, опционально одного зала.
    async fn active_on(
        &self,
        theater_id: i64,
        date: NaiveDate,
        room_id: Option<i64>,
    ) -> StoreResult<Vec<Screening>>;

    /// Новый сеанс: `available_seats = total_seats`, статус active.
    async fn insert(&self, new: &NewScreening) -> StoreResult<Screening>;

    /// Сохраняет расписание, цену, статус и счетчики мест одной записью.
    /// Счетчики менять только под блокировкой сеанса.
    async fn save(&self, screening: &Screening) -> StoreResult<()>;

    async fn delete(&self, id: i64) -> StoreResult<bool>;

    /// Списывает `count` мест, если их хватает. `None`: мест не хватило
    /// или сеанса нет.
    async fn take_seats(&self, id: i64, count: i32, at: NaiveDateTime) -> StoreResult<Option<i32>>;

    /// Возвращает `count` мест с потолком `total_seats`.
    async fn return_seats(&self, id: i64, count: i32, at: NaiveDateTime) -> StoreResult<Option<i32>>;

    async fn set_capacity(&self, id: i64, total: i32, available: i32, at: NaiveDateTime) -> StoreResult<()>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find(&self, id: i64) -> StoreResult<Option<Booking>>;

    async fn for_user(&self, user_id: i64) -> StoreResult<Vec<Booking>>;

    /// Метки мест, занятых неотмененными бронями сеанса.
    async fn held_seats(&self, screening_id: i64) -> StoreResult<Vec<String>>;

    async fn insert(&self, new: &NewBooking) -> StoreResult<Booking>;

    /// confirmed -> cancelled, оплата `expected` -> `payment`. `false`, если
    /// бронь уже не в confirmed или оплата успела смениться.
    async fn mark_cancelled(
        &self,
        id: i64,
        expected: PaymentStatus,
        payment: PaymentStatus,
        at: NaiveDateTime,
    ) -> StoreResult<bool>;

    /// Условная смена статуса оплаты у подтвержденной брони.
    async fn set_payment_status(
        &self,
        id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
        at: NaiveDateTime,
    ) -> StoreResult<bool>;

    /// Подтвержденные брони без оплаты (pending/failed), созданные раньше `before`.
    async fn unpaid_before(&self, before: NaiveDateTime) -> StoreResult<Vec<Booking>>;

    /// Оплаченные подтвержденные брони, сеанс которых начался до `now`, -> completed.
    async fn complete_started(&self, now: NaiveDateTime) -> StoreResult<u64>;
}
