use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use showtime_booking::{config::Config, controllers, services::CleanupService, AppState};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(&config.app.rust_log);
    if config.app.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let database = state.db.ping().await;
    let redis = state.redis.ping().await;
    Json(json!({
        "status": if database { "ok" } else { "degraded" },
        "database": database,
        "redis": redis,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    init_tracing(&config);

    info!("Starting showtime booking service ({})", config.app.environment);

    let app_state = AppState::new(config.clone()).await?;

    // Снятие неоплаченных и закрытие прошедших броней
    let cleanup = CleanupService::new(
        app_state.bookings.clone(),
        Some(app_state.cache.clone()),
        config.cleanup.interval_seconds,
    );
    tokio::spawn(cleanup.run());

    let app = Router::new()
        .route("/", get(|| async { "Showtime Booking API v1.0" }))
        .route("/health", get(health))
        .nest("/api", controllers::routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
