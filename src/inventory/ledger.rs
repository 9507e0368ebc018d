//! Учет мест по сеансу.
//!
//! Каждый сеанс защищен своим мьютексом из арены. Чтение занятых мест,
//! проверка пересечения и списание счетчика идут под ним одним блоком;
//! `SeatHold` держит блокировку, пока вызывающий не сохранит бронь
//! (или не откатит резерв через `abort`).

use chrono::Local;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult, StateError};
use crate::locks::KeyedLocks;
use crate::store::{BookingStore, ScreeningStore};

/// Эксклюзивный доступ к инвентарю одного сеанса.
pub struct ScreeningLock {
    screening_id: i64,
    _guard: OwnedMutexGuard<()>,
}

impl ScreeningLock {
    pub fn screening_id(&self) -> i64 {
        self.screening_id
    }
}

/// Успешный резерв: места списаны, блокировка сеанса еще удерживается.
pub struct SeatHold {
    lock: ScreeningLock,
    labels: Vec<String>,
    remaining: i32,
}

impl SeatHold {
    pub fn screening_id(&self) -> i64 {
        self.lock.screening_id
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Остаток свободных мест после списания.
    pub fn remaining(&self) -> i32 {
        self.remaining
    }

    /// Бронь сохранена, отпускаем сеанс.
    pub fn commit(self) {}
}

pub struct SeatLedger {
    screenings: Arc<dyn ScreeningStore>,
    bookings: Arc<dyn BookingStore>,
    locks: KeyedLocks<i64>,
}

fn seat_count(labels: &[String]) -> ServiceResult<i32> {
    i32::try_from(labels.len()).map_err(|_| ServiceError::validation("too many seats requested"))
}

impl SeatLedger {
    pub fn new(screenings: Arc<dyn ScreeningStore>, bookings: Arc<dyn BookingStore>) -> Self {
        Self { screenings, bookings, locks: KeyedLocks::new() }
    }

    pub async fn lock(&self, screening_id: i64) -> ScreeningLock {
        ScreeningLock {
            screening_id,
            _guard: self.locks.acquire(screening_id).await,
        }
    }

    pub async fn reserve(&self, screening_id: i64, labels: &[String]) -> ServiceResult<SeatHold> {
        let lock = self.lock(screening_id).await;
        self.reserve_locked(lock, labels).await
    }

    /// Резерв под уже взятой блокировкой сеанса.
    pub async fn reserve_locked(&self, lock: ScreeningLock, labels: &[String]) -> ServiceResult<SeatHold> {
        let screening_id = lock.screening_id;
        let requested = seat_count(labels)?;

        let held: HashSet<String> = self.bookings.held_seats(screening_id).await?.into_iter().collect();
        let mut taken: Vec<String> = labels.iter().filter(|l| held.contains(*l)).cloned().collect();
        if !taken.is_empty() {
            taken.sort();
            taken.dedup();
            info!("Seats {:?} already held for screening {}", taken, screening_id);
            return Err(ServiceError::SeatConflict(taken));
        }

        let now = Local::now().naive_local();
        match self.screenings.take_seats(screening_id, requested, now).await? {
            Some(remaining) => {
                debug!("Reserved {} seats on screening {}, {} left", requested, screening_id, remaining);
                Ok(SeatHold { lock, labels: labels.to_vec(), remaining })
            }
            None => {
                let screening = self
                    .screenings
                    .find(screening_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("screening", screening_id))?;
                warn!(
                    "Screening {} has {} seats left, {} requested",
                    screening_id, screening.available_seats, requested
                );
                Err(StateError::InsufficientCapacity {
                    requested,
                    available: screening.available_seats,
                }
                .into())
            }
        }
    }

    /// Откат резерва, если бронь так и не записалась.
    pub async fn abort(&self, hold: SeatHold) -> ServiceResult<i32> {
        let available = self.release_locked(&hold.lock, &hold.labels).await?;
        info!("Rolled back hold of {} seats on screening {}", hold.labels.len(), hold.screening_id());
        Ok(available)
    }

    pub async fn release(&self, screening_id: i64, labels: &[String]) -> ServiceResult<i32> {
        let lock = self.lock(screening_id).await;
        self.release_locked(&lock, labels).await
    }

    /// Возвращает места в продажу. Счетчик не поднимается выше `total_seats`;
    /// удаленный сеанс дает 0 без ошибки.
    pub async fn release_locked(&self, lock: &ScreeningLock, labels: &[String]) -> ServiceResult<i32> {
        let count = seat_count(labels)?;
        let now = Local::now().naive_local();
        match self.screenings.return_seats(lock.screening_id, count, now).await? {
            Some(available) => Ok(available),
            None => {
                warn!("Released seats for missing screening {}", lock.screening_id);
                Ok(0)
            }
        }
    }

    /// Текущие занятые места (для схемы зала).
    pub async fn occupied(&self, screening_id: i64) -> ServiceResult<Vec<String>> {
        let mut labels = self.bookings.held_seats(screening_id).await?;
        labels.sort();
        Ok(labels)
    }

    /// Остаток мест при новой вместимости, `total - held`. Ничего не пишет:
    /// вызывающий сохраняет счетчики сам, пока держит `lock`.
    pub async fn available_after_resize(&self, lock: &ScreeningLock, new_total: i32) -> ServiceResult<i32> {
        let held = seat_count(&self.bookings.held_seats(lock.screening_id).await?)?;
        if new_total < held {
            return Err(StateError::CapacityBelowHeld { requested: new_total, held }.into());
        }
        Ok(new_total - held)
    }

    /// Меняет вместимость сеанса, сохраняя `available = total - held`.
    pub async fn resize(&self, screening_id: i64, new_total: i32) -> ServiceResult<(i32, i32)> {
        let lock = self.lock(screening_id).await;
        let available = self.available_after_resize(&lock, new_total).await?;
        let now = Local::now().naive_local();
        self.screenings.set_capacity(screening_id, new_total, available, now).await?;
        info!("Screening {} resized to {} seats ({} available)", screening_id, new_total, available);
        Ok((new_total, available))
    }
}
