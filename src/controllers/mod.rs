pub mod bookings;
pub mod payment;
pub mod screenings;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(screenings::routes())
        .merge(bookings::routes())
        .merge(payment::routes())
}
