pub mod booking;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod inventory;
pub mod locks;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod scheduling;
pub mod services;
pub mod store;

use std::sync::Arc;

use booking::BookingService;
use catalog::{CachedCatalog, Catalog, PgCatalog};
use inventory::SeatLedger;
use scheduling::Scheduler;
use store::PgStore;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub scheduler: Arc<Scheduler>,
    pub ledger: Arc<SeatLedger>,
    pub bookings: Arc<BookingService>,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;
        db.run_migrations().await?;

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        let cache = cache::CacheService::new(redis.clone());

        let store = Arc::new(PgStore::new(db.pool.clone()));
        let catalog: Arc<dyn Catalog> = Arc::new(CachedCatalog::new(
            Arc::new(PgCatalog::new(db.pool.clone())),
            cache.clone(),
        ));
        let ledger = Arc::new(SeatLedger::new(store.clone(), store.clone()));
        let scheduler = Arc::new(Scheduler::new(
            catalog.clone(),
            store.clone(),
            ledger.clone(),
            config.scheduling.clone(),
        ));
        let bookings = Arc::new(BookingService::new(
            catalog,
            store.clone(),
            store,
            ledger.clone(),
            config.booking.clone(),
        ));

        Ok(Arc::new(Self {
            db,
            redis,
            cache,
            config,
            scheduler,
            ledger,
            bookings,
        }))
    }
}
