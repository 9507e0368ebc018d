use axum::{
    extract::State,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use super::bookings::owned_booking;
use crate::error::ServiceError;
use crate::middleware::{AppPath, AuthUser};
use crate::models::Booking;
use crate::AppState;

// Колбэк платежного шлюза сведен к двум исходам: успех и отказ
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings/{id}/payment/succeed", post(payment_succeed))
        .route("/bookings/{id}/payment/fail", post(payment_fail))
}

fn payment_response(booking: &Booking) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "bookingId": booking.id,
        "bookingCode": booking.booking_code,
        "paymentStatus": booking.payment_status,
        "bookingStatus": booking.booking_status,
    }))
}

// POST /api/bookings/{id}/payment/succeed
async fn payment_succeed(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    owned_booking(&state, user, id).await?;
    let booking = state.bookings.simulate_payment_success(id).await?;
    Ok(payment_response(&booking))
}

// POST /api/bookings/{id}/payment/fail
async fn payment_fail(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    owned_booking(&state, user, id).await?;
    let booking = state.bookings.simulate_payment_failure(id).await?;
    Ok(payment_response(&booking))
}
