use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

use super::time::hhmm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "screening_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScreeningStatus {
    Active,
    Inactive,
    Cancelled,
}

/// Сеанс: показ фильма в зале в конкретную дату и время.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screening {
    pub id: i64,
    pub movie_id: i64,
    pub theater_id: i64,
    pub room_id: i64,
    #[serde(rename = "date")]
    pub show_date: NaiveDate,
    #[serde(rename = "time", with = "hhmm")]
    pub show_time: NaiveTime,
    pub price: f64,
    /// Цены по классам мест; класс без записи идет по базовой `price`.
    #[sqlx(json)]
    pub seat_prices: HashMap<String, f64>,
    pub total_seats: i32,
    pub available_seats: i32,
    pub status: ScreeningStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Screening {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.show_date.and_time(self.show_time)
    }

    pub fn is_active(&self) -> bool {
        self.status == ScreeningStatus::Active
    }

    pub fn held_seats(&self) -> i32 {
        self.total_seats - self.available_seats
    }
}

/// Данные для вставки нового сеанса.
#[derive(Debug, Clone)]
pub struct NewScreening {
    pub movie_id: i64,
    pub theater_id: i64,
    pub room_id: i64,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub price: f64,
    pub seat_prices: HashMap<String, f64>,
    pub total_seats: i32,
    pub created_at: NaiveDateTime,
}

impl NewScreening {
    /// Копия сеанса на другую дату: инвентарь всегда свежий.
    pub fn copy_of(source: &Screening, date: NaiveDate, created_at: NaiveDateTime) -> Self {
        Self {
            movie_id: source.movie_id,
            theater_id: source.theater_id,
            room_id: source.room_id,
            show_date: date,
            show_time: source.show_time,
            price: source.price,
            seat_prices: source.seat_prices.clone(),
            total_seats: source.total_seats,
            created_at,
        }
    }
}
