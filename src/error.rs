//! error.rs
//!
//! Единая таксономия ошибок сервиса и её отображение в HTTP-ответы.
//! Бизнес-отказы (конфликт расписания, занятые места, недопустимое состояние)
//! возвращаются клиенту с диагностикой; всё неожиданное превращается в
//! `Internal`, детали которого пишутся в лог, а клиент видит обезличенное сообщение.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::{BookingStatus, PaymentStatus};
use crate::scheduling::ConflictInfo;
use crate::store::StoreError;

/// Нарушения жизненного цикла брони, сеанса или вместимости.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("booking is already cancelled")]
    AlreadyCancelled,
    #[error("booking can no longer be cancelled: {hours_remaining:.1}h left, cutoff is {cutoff_hours}h")]
    CutoffExceeded { hours_remaining: f64, cutoff_hours: i64 },
    #[error("not enough seats: requested {requested}, available {available}")]
    InsufficientCapacity { requested: i32, available: i32 },
    #[error("screening {screening_id} is not open for booking")]
    ScreeningNotBookable { screening_id: i64 },
    #[error("booking in status {status} cannot be cancelled")]
    NotCancellable { status: BookingStatus },
    #[error("payment status cannot change from {from} to {to}")]
    InvalidPaymentTransition { from: PaymentStatus, to: PaymentStatus },
    #[error("total seats {requested} is below the {held} seats already held")]
    CapacityBelowHeld { requested: i32, held: i32 },
}

impl StateError {
    fn code(&self) -> &'static str {
        match self {
            StateError::AlreadyCancelled => "ALREADY_CANCELLED",
            StateError::CutoffExceeded { .. } => "CUTOFF_EXCEEDED",
            StateError::InsufficientCapacity { .. } => "INSUFFICIENT_CAPACITY",
            StateError::ScreeningNotBookable { .. } => "SCREENING_NOT_BOOKABLE",
            StateError::NotCancellable { .. } => "NOT_CANCELLABLE",
            StateError::InvalidPaymentTransition { .. } => "INVALID_PAYMENT_TRANSITION",
            StateError::CapacityBelowHeld { .. } => "CAPACITY_BELOW_HELD",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("scheduling conflict with screening {} ({} at {})", .0.screening_id, .0.movie_title, .0.start_time)]
    SchedulingConflict(ConflictInfo),
    #[error("seats already booked: {}", .0.join(", "))]
    SeatConflict(Vec<String>),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound { entity, id: id.to_string() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_)
            | ServiceError::SchedulingConflict(_)
            | ServiceError::SeatConflict(_)
            | ServiceError::State(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SeatTaken(labels) => ServiceError::SeatConflict(labels),
            StoreError::DuplicateSlot => ServiceError::validation(
                "a screening already exists in this room at that date and time",
            ),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        ServiceError::Validation(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::Validation(errors.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ServiceError::Validation(message) => json!({
                "success": false,
                "code": "VALIDATION_ERROR",
                "message": message,
            }),
            ServiceError::NotFound { .. } => json!({
                "success": false,
                "code": "NOT_FOUND",
                "message": self.to_string(),
            }),
            ServiceError::SchedulingConflict(conflict) => json!({
                "success": false,
                "code": "SCHEDULING_CONFLICT",
                "message": self.to_string(),
                "conflict": conflict,
            }),
            ServiceError::SeatConflict(labels) => json!({
                "success": false,
                "code": "SEAT_CONFLICT",
                "message": self.to_string(),
                "bookedSeats": labels,
            }),
            ServiceError::State(state) => json!({
                "success": false,
                "code": state.code(),
                "message": state.to_string(),
            }),
            ServiceError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                json!({
                    "success": false,
                    "code": "INTERNAL_ERROR",
                    "message": "Internal server error",
                })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_failures_map_to_bad_request() {
        assert_eq!(
            ServiceError::SeatConflict(vec!["A1".into()]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::from(StateError::AlreadyCancelled).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServiceError::not_found("booking", 7).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_seat_violation_surfaces_as_seat_conflict() {
        let err = ServiceError::from(StoreError::SeatTaken(vec!["B4".into()]));
        assert!(matches!(err, ServiceError::SeatConflict(ref l) if l == &vec!["B4".to_string()]));
    }

    #[test]
    fn internal_detail_is_masked() {
        let response = ServiceError::Internal("connection reset".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
