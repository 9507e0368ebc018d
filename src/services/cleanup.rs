use chrono::{Local, NaiveDateTime};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::booking::BookingService;
use crate::cache::CacheService;

/// Фоновое обслуживание броней: снятие неоплаченных и закрытие прошедших.
pub struct CleanupService {
    bookings: Arc<BookingService>,
    cache: Option<CacheService>,
    interval: Duration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub expired: usize,
    pub completed: u64,
}

impl CleanupService {
    pub fn new(bookings: Arc<BookingService>, cache: Option<CacheService>, interval_seconds: u64) -> Self {
        Self {
            bookings,
            cache,
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }

    /// Один проход: неоплаченные брони, затем завершенные сеансы.
    pub async fn run_full_cleanup(&self, now: NaiveDateTime) -> CleanupReport {
        let mut report = CleanupReport::default();

        match self.bookings.expire_unpaid(now).await {
            Ok(expired) => {
                report.expired = expired.len();
                let screenings: BTreeSet<i64> = expired.iter().map(|b| b.screening_id).collect();
                if let Some(cache) = &self.cache {
                    for screening_id in screenings {
                        cache.invalidate_occupied(screening_id).await;
                    }
                }
            }
            Err(e) => error!("Unpaid booking expiry failed: {}", e),
        }

        match self.bookings.complete_started(now).await {
            Ok(completed) => report.completed = completed,
            Err(e) => error!("Booking completion sweep failed: {}", e),
        }

        report
    }

    pub async fn run(self) {
        info!("Cleanup loop started, every {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            let report = self.run_full_cleanup(Local::now().naive_local()).await;
            if report.expired > 0 || report.completed > 0 {
                info!(
                    "Cleanup pass: {} unpaid bookings expired, {} completed",
                    report.expired, report.completed
                );
            }
        }
    }
}
