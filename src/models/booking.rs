use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::time::hhmm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// pending -> paid | failed, paid -> refunded. Остальное запрещено.
    pub fn can_become(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
        )
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatClaim {
    pub seat_label: String,
    pub seat_class: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub booking_code: String,
    pub user_id: i64,
    pub screening_id: i64,
    pub seats: Vec<SeatClaim>,
    pub total_amount: f64,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub booking_status: BookingStatus,
    #[serde(rename = "customerInfo")]
    pub customer: CustomerInfo,
    /// Копия даты/времени сеанса на момент бронирования.
    pub show_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub show_time: NaiveTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn seat_labels(&self) -> Vec<String> {
        self.seats.iter().map(|s| s.seat_label.clone()).collect()
    }

    pub fn holds_seats(&self) -> bool {
        self.booking_status != BookingStatus::Cancelled
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub booking_code: String,
    pub user_id: i64,
    pub screening_id: i64,
    pub seats: Vec<SeatClaim>,
    pub total_amount: f64,
    pub payment_method: String,
    pub customer: CustomerInfo,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub created_at: NaiveDateTime,
}
