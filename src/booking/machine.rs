//! Жизненный цикл брони.
//!
//! Статус брони: confirmed -> cancelled | completed. Статус оплаты:
//! pending -> paid | failed, paid -> refunded. Новая бронь всегда
//! confirmed + pending. Места списываются и возвращаются только через
//! `SeatLedger` под блокировкой сеанса.

use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use validator::Validate;

use super::code::next_code;
use super::pricing::{seat_price, total, DEFAULT_SEAT_CLASS};
use crate::catalog::Catalog;
use crate::config::BookingConfig;
use crate::error::{ServiceError, ServiceResult, StateError};
use crate::inventory::SeatLedger;
use crate::models::{
    Booking, BookingStatus, CustomerInfo, NewBooking, PaymentStatus, Screening, SeatClaim,
};
use crate::store::{BookingStore, ScreeningStore, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatRequest {
    pub seat_label: String,
    pub seat_class: Option<String>,
    /// Цена от клиента только для сверки, в сумму идет тариф сеанса.
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    #[validate(range(min = 1))]
    pub screening_id: i64,
    #[validate(length(min = 1, message = "at least one seat is required"))]
    pub seats: Vec<SeatRequest>,
    #[validate(length(min = 1, message = "paymentMethod is required"))]
    pub payment_method: String,
    #[serde(default)]
    pub customer_info: CustomerDraft,
}

pub struct BookingService {
    catalog: Arc<dyn Catalog>,
    screenings: Arc<dyn ScreeningStore>,
    bookings: Arc<dyn BookingStore>,
    ledger: Arc<SeatLedger>,
    config: BookingConfig,
}

fn seat_labels(seats: &[SeatRequest]) -> ServiceResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut labels = Vec::with_capacity(seats.len());
    for seat in seats {
        let label = seat.seat_label.trim();
        if label.is_empty() {
            return Err(ServiceError::validation("seatLabel must not be empty"));
        }
        if !seen.insert(label.to_string()) {
            return Err(ServiceError::validation(format!("seat {label} is listed twice")));
        }
        labels.push(label.to_string());
    }
    Ok(labels)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl BookingService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        screenings: Arc<dyn ScreeningStore>,
        bookings: Arc<dyn BookingStore>,
        ledger: Arc<SeatLedger>,
        config: BookingConfig,
    ) -> Self {
        Self { catalog, screenings, bookings, ledger, config }
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Booking> {
        self.bookings
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("booking", id))
    }

    pub async fn for_user(&self, user_id: i64) -> ServiceResult<Vec<Booking>> {
        Ok(self.bookings.for_user(user_id).await?)
    }

    /// Поля `customerInfo`, которых нет в запросе, берутся из контактов пользователя.
    async fn resolve_customer(&self, user_id: i64, draft: CustomerDraft) -> ServiceResult<CustomerInfo> {
        let mut name = non_blank(draft.name);
        let mut email = non_blank(draft.email);
        let mut phone = non_blank(draft.phone);
        if name.is_none() || email.is_none() || phone.is_none() {
            if let Some(contact) = self.catalog.contact(user_id).await? {
                name = name.or(non_blank(Some(contact.name)));
                email = email.or(non_blank(Some(contact.email)));
                phone = phone.or(non_blank(contact.phone));
            }
        }
        match (name, email) {
            (Some(name), Some(email)) => Ok(CustomerInfo { name, email, phone }),
            _ => Err(ServiceError::validation("customerInfo.name and customerInfo.email are required")),
        }
    }

    fn price_seats(screening: &Screening, seats: &[SeatRequest], labels: &[String]) -> Vec<SeatClaim> {
        seats
            .iter()
            .zip(labels)
            .map(|(seat, label)| {
                let seat_class = seat
                    .seat_class
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .unwrap_or(DEFAULT_SEAT_CLASS)
                    .to_string();
                let price = seat_price(screening, &seat_class);
                if let Some(asked) = seat.price {
                    if (asked - price).abs() > 0.005 {
                        warn!(
                            "Client price {} for seat {} differs from tariff {} on screening {}",
                            asked, label, price, screening.id
                        );
                    }
                }
                SeatClaim { seat_label: label.clone(), seat_class, price }
            })
            .collect()
    }

    pub async fn create_booking(&self, user_id: i64, req: CreateBooking) -> ServiceResult<Booking> {
        req.validate()?;
        if req.payment_method.trim().is_empty() {
            return Err(ServiceError::validation("paymentMethod is required"));
        }
        let labels = seat_labels(&req.seats)?;

        let screening = self
            .screenings
            .find(req.screening_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("screening", req.screening_id))?;
        if !screening.is_active() {
            return Err(StateError::ScreeningNotBookable { screening_id: screening.id }.into());
        }

        let customer = self.resolve_customer(user_id, req.customer_info).await?;
        let seats = Self::price_seats(&screening, &req.seats, &labels);
        let total_amount = total(seats.iter().map(|s| s.price));

        let hold = self.ledger.reserve(screening.id, &labels).await?;
        let mut new = NewBooking {
            booking_code: String::new(),
            user_id,
            screening_id: screening.id,
            seats,
            total_amount,
            payment_method: req.payment_method.trim().to_string(),
            customer,
            show_date: screening.show_date,
            show_time: screening.show_time,
            created_at: Local::now().naive_local(),
        };

        for attempt in 1..=self.config.code_attempts.max(1) {
            new.booking_code = next_code();
            match self.bookings.insert(&new).await {
                Ok(booking) => {
                    hold.commit();
                    info!(
                        "Booking {} ({}) created for user {}: {} seats on screening {}",
                        booking.id,
                        booking.booking_code,
                        user_id,
                        booking.seats.len(),
                        booking.screening_id
                    );
                    return Ok(booking);
                }
                Err(StoreError::DuplicateBookingCode(code)) => {
                    debug!("Booking code {} collided (attempt {})", code, attempt);
                }
                Err(e) => {
                    if let Err(rollback) = self.ledger.abort(hold).await {
                        error!("Failed to roll back seat hold: {}", rollback);
                    }
                    return Err(e.into());
                }
            }
        }

        if let Err(rollback) = self.ledger.abort(hold).await {
            error!("Failed to roll back seat hold: {}", rollback);
        }
        Err(ServiceError::Internal(format!(
            "could not generate a unique booking code in {} attempts",
            self.config.code_attempts
        )))
    }

    pub async fn cancel_booking(&self, id: i64, as_of: NaiveDateTime) -> ServiceResult<Booking> {
        let mut booking = self.get(id).await?;
        // оплата может смениться между чтением и записью: один повтор со свежей бронью
        for attempt in 1..=2 {
            match booking.booking_status {
                BookingStatus::Confirmed => {}
                BookingStatus::Cancelled => return Err(StateError::AlreadyCancelled.into()),
                status => return Err(StateError::NotCancellable { status }.into()),
            }
            self.check_cutoff(&booking, as_of).await?;

            let expected = booking.payment_status;
            let payment = match expected {
                PaymentStatus::Paid => PaymentStatus::Refunded,
                other => other,
            };

            let lock = self.ledger.lock(booking.screening_id).await;
            let now = Local::now().naive_local();
            if self.bookings.mark_cancelled(id, expected, payment, now).await? {
                let available = self.ledger.release_locked(&lock, &booking.seat_labels()).await?;
                drop(lock);
                info!(
                    "Booking {} cancelled (payment {}), screening {} has {} seats available",
                    id, payment, booking.screening_id, available
                );
                return self.get(id).await;
            }
            drop(lock);
            debug!("Booking {} changed during cancellation (attempt {})", id, attempt);
            booking = self.get(id).await?;
        }

        match booking.booking_status {
            BookingStatus::Cancelled => Err(StateError::AlreadyCancelled.into()),
            BookingStatus::Confirmed => Err(StateError::InvalidPaymentTransition {
                from: booking.payment_status,
                to: PaymentStatus::Refunded,
            }
            .into()),
            status => Err(StateError::NotCancellable { status }.into()),
        }
    }

    /// Отмена разрешена не позже чем за `cancellation_cutoff_hours` до начала.
    async fn check_cutoff(&self, booking: &Booking, as_of: NaiveDateTime) -> ServiceResult<()> {
        // время берем из живого сеанса, копия в брони нужна, если сеанс удален
        let starts_at = match self.screenings.find(booking.screening_id).await? {
            Some(screening) => screening.starts_at(),
            None => booking.show_date.and_time(booking.show_time),
        };
        let remaining = starts_at - as_of;
        if remaining < Duration::hours(self.config.cancellation_cutoff_hours) {
            let hours_remaining = remaining.num_seconds() as f64 / 3600.0;
            info!(
                "Cancellation of booking {} refused: {:.1}h before start",
                booking.id, hours_remaining
            );
            return Err(StateError::CutoffExceeded {
                hours_remaining,
                cutoff_hours: self.config.cancellation_cutoff_hours,
            }
            .into());
        }
        Ok(())
    }

    async fn move_payment(&self, id: i64, to: PaymentStatus) -> ServiceResult<Booking> {
        let booking = self.get(id).await?;
        let from = booking.payment_status;
        if booking.booking_status != BookingStatus::Confirmed || !from.can_become(to) {
            return Err(StateError::InvalidPaymentTransition { from, to }.into());
        }
        let now = Local::now().naive_local();
        if !self.bookings.set_payment_status(id, from, to, now).await? {
            let latest = self.get(id).await?;
            return Err(StateError::InvalidPaymentTransition { from: latest.payment_status, to }.into());
        }
        info!("Booking {} payment {} -> {}", id, from, to);
        self.get(id).await
    }

    pub async fn simulate_payment_success(&self, id: i64) -> ServiceResult<Booking> {
        self.move_payment(id, PaymentStatus::Paid).await
    }

    /// Неудачная оплата мест не освобождает: бронь снимется по таймауту
    /// неоплаченных броней.
    pub async fn simulate_payment_failure(&self, id: i64) -> ServiceResult<Booking> {
        self.move_payment(id, PaymentStatus::Failed).await
    }

    /// Снимает подтвержденные брони без оплаты старше `unpaid_hold_minutes`.
    /// Возвращает отмененные брони.
    pub async fn expire_unpaid(&self, now: NaiveDateTime) -> ServiceResult<Vec<Booking>> {
        if self.config.unpaid_hold_minutes <= 0 {
            return Ok(Vec::new());
        }
        let before = now - Duration::minutes(self.config.unpaid_hold_minutes);
        let stale = self.bookings.unpaid_before(before).await?;

        let mut expired = Vec::with_capacity(stale.len());
        for booking in stale {
            let lock = self.ledger.lock(booking.screening_id).await;
            let unpaid = booking.payment_status;
            // оплата, пришедшая после выборки, бронь спасает
            if !self.bookings.mark_cancelled(booking.id, unpaid, unpaid, now).await? {
                debug!("Booking {} changed since it was listed, not expiring", booking.id);
                continue;
            }
            self.ledger.release_locked(&lock, &booking.seat_labels()).await?;
            debug!("Expired unpaid booking {} ({})", booking.id, booking.booking_code);
            expired.push(booking);
        }
        if !expired.is_empty() {
            info!("Expired {} unpaid bookings", expired.len());
        }
        Ok(expired)
    }

    /// Оплаченные брони прошедших сеансов -> completed.
    pub async fn complete_started(&self, now: NaiveDateTime) -> ServiceResult<u64> {
        let completed = self.bookings.complete_started(now).await?;
        if completed > 0 {
            info!("Marked {} bookings as completed", completed);
        }
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(label: &str) -> SeatRequest {
        SeatRequest { seat_label: label.to_string(), seat_class: None, price: None }
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        assert!(seat_labels(&[seat("A1"), seat(" A1 ")]).is_err());
        assert!(seat_labels(&[seat("")]).is_err());
        assert_eq!(seat_labels(&[seat(" B2"), seat("A1")]).unwrap(), vec!["B2", "A1"]);
    }
}
