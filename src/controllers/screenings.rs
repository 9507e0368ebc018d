use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::middleware::{AppJson, AppPath, AppQuery};
use crate::scheduling::{CopyRequest, CreateScreening, ScreeningChanges};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/screenings", post(create_screening))
        .route("/screenings/available-slots", get(available_slots))
        .route("/screenings/copy", post(copy_screenings))
        .route(
            "/screenings/{id}",
            get(get_screening).put(update_screening).delete(delete_screening),
        )
        .route("/screenings/{id}/occupied-seats", get(occupied_seats))
}

// POST /api/screenings
async fn create_screening(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateScreening>,
) -> Result<impl IntoResponse, ServiceError> {
    let screening = state.scheduler.create(req).await?;
    Ok((StatusCode::CREATED, Json(screening)))
}

// GET /api/screenings/{id}
async fn get_screening(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.scheduler.get(id).await?))
}

// PUT /api/screenings/{id}
async fn update_screening(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
    AppJson(changes): AppJson<ScreeningChanges>,
) -> Result<impl IntoResponse, ServiceError> {
    let screening = state.scheduler.update(id, changes).await?;
    state.cache.invalidate_occupied(id).await;
    Ok(Json(screening))
}

// DELETE /api/screenings/{id}
async fn delete_screening(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state.scheduler.delete(id).await?;
    state.cache.invalidate_occupied(id).await;
    Ok(Json(json!({ "success": true, "message": "Screening deleted" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotsQuery {
    room_id: i64,
    date: NaiveDate,
    movie_id: i64,
}

// GET /api/screenings/available-slots?roomId&date&movieId
async fn available_slots(
    State(state): State<Arc<AppState>>,
    AppQuery(q): AppQuery<SlotsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state
        .scheduler
        .available_slots(q.room_id, q.date, q.movie_id)
        .await?;
    Ok(Json(report))
}

// POST /api/screenings/copy
async fn copy_screenings(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CopyRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.scheduler.copy(req).await?))
}

// GET /api/screenings/{id}/occupied-seats
async fn occupied_seats(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(labels) = state.cache.get_occupied(id).await {
        return Ok(Json(labels));
    }
    // версия до чтения из БД: бронь между чтением и записью сделает запись промахом
    let version = state.cache.occupied_version(id).await;
    // несуществующий сеанс отдает 404, а не пустую схему
    state.scheduler.get(id).await?;
    let labels = state.ledger.occupied(id).await?;
    state.cache.save_occupied(id, version, &labels).await;
    Ok(Json(labels))
}
