use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use chrono::Local;
use std::sync::Arc;

use crate::booking::CreateBooking;
use crate::error::ServiceError;
use crate::middleware::{AppJson, AppPath, AuthUser};
use crate::models::Booking;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(get_user_bookings).post(create_booking))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/cancel", patch(cancel_booking))
}

/// Бронь по id, но только своя: чужая выглядит как отсутствующая.
pub(crate) async fn owned_booking(state: &AppState, user: AuthUser, id: i64) -> Result<Booking, ServiceError> {
    let booking = state.bookings.get(id).await?;
    if booking.user_id != user.user_id {
        return Err(ServiceError::not_found("booking", id));
    }
    Ok(booking)
}

// POST /api/bookings
async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppJson(req): AppJson<CreateBooking>,
) -> Result<impl IntoResponse, ServiceError> {
    let booking = state.bookings.create_booking(user.user_id, req).await?;
    state.cache.invalidate_occupied(booking.screening_id).await;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings
async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.bookings.for_user(user.user_id).await?))
}

// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(owned_booking(&state, user, id).await?))
}

// PATCH /api/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    owned_booking(&state, user, id).await?;
    let booking = state
        .bookings
        .cancel_booking(id, Local::now().naive_local())
        .await?;
    state.cache.invalidate_occupied(booking.screening_id).await;
    Ok(Json(booking))
}
