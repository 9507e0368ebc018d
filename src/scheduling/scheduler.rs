use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use super::conflict::{find_conflict, Candidate, ConflictInfo, ScheduledShow};
use super::slots::{suggest, SlotReport, SlotWindow};
use crate::catalog::Catalog;
use crate::config::SchedulingConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::inventory::SeatLedger;
use crate::locks::KeyedLocks;
use crate::models::time::hhmm;
use crate::models::{Movie, NewScreening, Room, Screening, ScreeningStatus};
use crate::store::{ScreeningStore, StoreError};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateScreening {
    pub movie_id: i64,
    pub theater_id: i64,
    pub room_id: i64,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[serde(default)]
    pub seat_prices: HashMap<String, f64>,
    /// По умолчанию вся вместимость зала.
    #[validate(range(min = 1))]
    pub total_seats: Option<i32>,
}

/// Частичное изменение сеанса: отсутствующее поле не трогаем.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningChanges {
    pub movie_id: Option<i64>,
    pub room_id: Option<i64>,
    pub date: Option<NaiveDate>,
    #[serde(default, with = "hhmm::option")]
    pub time: Option<NaiveTime>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    pub seat_prices: Option<HashMap<String, f64>>,
    #[validate(range(min = 1))]
    pub total_seats: Option<i32>,
    pub status: Option<ScreeningStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRequest {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub theater_id: i64,
    pub room_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyConflict {
    pub source_screening_id: i64,
    pub movie_title: String,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub reason: String,
    pub conflict: Option<ConflictInfo>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyOutcome {
    pub copied_count: usize,
    pub conflict_count: usize,
    pub conflicts: Vec<CopyConflict>,
    pub new_screenings: Vec<Screening>,
}

/// Расписание залов. Проверка конфликтов и запись идут под блокировкой
/// пары (зал, дата), поэтому два параллельных создания не проходят проверку оба.
pub struct Scheduler {
    catalog: Arc<dyn Catalog>,
    screenings: Arc<dyn ScreeningStore>,
    ledger: Arc<SeatLedger>,
    locks: KeyedLocks<(i64, NaiveDate)>,
    config: SchedulingConfig,
}

impl Scheduler {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        screenings: Arc<dyn ScreeningStore>,
        ledger: Arc<SeatLedger>,
        config: SchedulingConfig,
    ) -> Self {
        Self {
            catalog,
            screenings,
            ledger,
            locks: KeyedLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Screening> {
        self.screenings
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("screening", id))
    }

    async fn movie(&self, id: i64) -> ServiceResult<Movie> {
        self.catalog
            .movie(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("movie", id))
    }

    async fn room(&self, theater_id: i64, room_id: i64) -> ServiceResult<Room> {
        let room = self
            .catalog
            .room(theater_id, room_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("room", room_id))?;
        if !room.is_active() {
            return Err(ServiceError::validation(format!(
                "room {} is {} and cannot host screenings",
                room.id, room.status
            )));
        }
        Ok(room)
    }

    /// Активные сеансы зала на дату с длительностями из каталога.
    async fn scheduled_shows(&self, room_id: i64, date: NaiveDate) -> ServiceResult<Vec<ScheduledShow>> {
        let existing = self.screenings.active_in_room(room_id, date).await?;
        let mut movies: HashMap<i64, Option<Movie>> = HashMap::new();
        let mut shows = Vec::with_capacity(existing.len());
        for screening in existing {
            if !movies.contains_key(&screening.movie_id) {
                let movie = self.catalog.movie(screening.movie_id).await?;
                movies.insert(screening.movie_id, movie);
            }
            let (title, duration) = match movies.get(&screening.movie_id).and_then(Option::as_ref) {
                Some(movie) => (movie.title.clone(), i64::from(movie.duration_minutes)),
                None => {
                    // сеанс без фильма в каталоге все равно занимает время начала
                    warn!(
                        "Movie {} of screening {} is missing from catalog",
                        screening.movie_id, screening.id
                    );
                    (format!("movie {}", screening.movie_id), 0)
                }
            };
            shows.push(ScheduledShow {
                screening_id: screening.id,
                movie_title: title,
                start: screening.show_time,
                duration_minutes: duration,
            });
        }
        Ok(shows)
    }

    async fn conflict_for(
        &self,
        room_id: i64,
        date: NaiveDate,
        candidate: &Candidate,
        exclude: Option<i64>,
    ) -> ServiceResult<Option<ConflictInfo>> {
        let shows = self.scheduled_shows(room_id, date).await?;
        Ok(find_conflict(candidate, &shows, self.config.buffer_minutes, exclude))
    }

    pub async fn create(&self, req: CreateScreening) -> ServiceResult<Screening> {
        req.validate()?;
        let movie = self.movie(req.movie_id).await?;
        let room = self.room(req.theater_id, req.room_id).await?;

        let total_seats = req.total_seats.unwrap_or(room.capacity);
        if total_seats <= 0 || total_seats > room.capacity {
            return Err(ServiceError::validation(format!(
                "totalSeats must be between 1 and room capacity {}",
                room.capacity
            )));
        }

        let _guard = self.locks.acquire((req.room_id, req.date)).await;
        let candidate = Candidate::new(req.time, movie.duration_minutes);
        if let Some(conflict) = self.conflict_for(req.room_id, req.date, &candidate, None).await? {
            info!(
                "Rejected screening of movie {} in room {} at {} {}: overlaps screening {}",
                movie.id, room.id, req.date, req.time, conflict.screening_id
            );
            return Err(ServiceError::SchedulingConflict(conflict));
        }

        let screening = self
            .screenings
            .insert(&NewScreening {
                movie_id: movie.id,
                theater_id: req.theater_id,
                room_id: room.id,
                show_date: req.date,
                show_time: req.time,
                price: req.price,
                seat_prices: req.seat_prices,
                total_seats,
                created_at: Local::now().naive_local(),
            })
            .await?;
        info!(
            "Screening {} created: movie {} in room {} at {} {}",
            screening.id, movie.id, room.id, screening.show_date, screening.show_time
        );
        Ok(screening)
    }

    pub async fn update(&self, id: i64, changes: ScreeningChanges) -> ServiceResult<Screening> {
        changes.validate()?;
        let current = self.get(id).await?;

        let mut next = current.clone();
        if let Some(movie_id) = changes.movie_id {
            next.movie_id = movie_id;
        }
        if let Some(room_id) = changes.room_id {
            next.room_id = room_id;
        }
        if let Some(date) = changes.date {
            next.show_date = date;
        }
        if let Some(time) = changes.time {
            next.show_time = time;
        }
        if let Some(price) = changes.price {
            next.price = price;
        }
        if let Some(ref seat_prices) = changes.seat_prices {
            next.seat_prices = seat_prices.clone();
        }
        if let Some(status) = changes.status {
            next.status = status;
        }

        let moved = next.room_id != current.room_id
            || next.show_date != current.show_date
            || next.show_time != current.show_time;
        let recheck = next.is_active()
            && (moved || next.movie_id != current.movie_id || !current.is_active());

        if changes.movie_id.is_some() || recheck {
            self.movie(next.movie_id).await?;
        }
        let total_seats = changes.total_seats.unwrap_or(current.total_seats);
        if next.room_id != current.room_id || changes.total_seats.is_some() {
            let room = self.room(next.theater_id, next.room_id).await?;
            if total_seats > room.capacity {
                return Err(ServiceError::validation(format!(
                    "totalSeats must not exceed room capacity {}",
                    room.capacity
                )));
            }
        }

        let _guards = self
            .locks
            .acquire_many([
                (current.room_id, current.show_date),
                (next.room_id, next.show_date),
            ])
            .await;

        if recheck {
            let movie = self.movie(next.movie_id).await?;
            let candidate = Candidate::new(next.show_time, movie.duration_minutes);
            if let Some(conflict) = self
                .conflict_for(next.room_id, next.show_date, &candidate, Some(id))
                .await?
            {
                info!(
                    "Rejected update of screening {}: overlaps screening {}",
                    id, conflict.screening_id
                );
                return Err(ServiceError::SchedulingConflict(conflict));
            }
        }

        // счетчики пишутся одной строкой с расписанием, поэтому под блокировкой
        // сеанса берем их свежими: брони могли списать места после чтения `current`
        let lock = self.ledger.lock(id).await;
        let fresh = self.get(id).await?;
        next.total_seats = fresh.total_seats;
        next.available_seats = fresh.available_seats;
        if total_seats != fresh.total_seats {
            next.available_seats = self.ledger.available_after_resize(&lock, total_seats).await?;
            next.total_seats = total_seats;
        }

        next.updated_at = Local::now().naive_local();
        self.screenings.save(&next).await?;
        drop(lock);
        info!(
            "Screening {} updated ({} of {} seats available)",
            id, next.available_seats, next.total_seats
        );
        self.get(id).await
    }

    /// Жесткое удаление. Брони сеанса остаются как есть.
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let screening = self.get(id).await?;
        let _guard = self.locks.acquire((screening.room_id, screening.show_date)).await;
        if !self.screenings.delete(id).await? {
            return Err(ServiceError::not_found("screening", id));
        }
        info!("Screening {} deleted", id);
        Ok(())
    }

    /// Переносит активные сеансы одной даты на другую. Конфликтующие
    /// пропускаются и попадают в отчет, инвентарь копий всегда свежий.
    pub async fn copy(&self, req: CopyRequest) -> ServiceResult<CopyOutcome> {
        if req.from_date == req.to_date {
            return Err(ServiceError::validation("fromDate and toDate must differ"));
        }

        let sources = self
            .screenings
            .active_on(req.theater_id, req.from_date, req.room_id)
            .await?;
        let _guards = self
            .locks
            .acquire_many(sources.iter().map(|s| (s.room_id, req.to_date)))
            .await;

        let mut outcome = CopyOutcome::default();
        for source in sources {
            let movie = match self.catalog.movie(source.movie_id).await? {
                Some(movie) => movie,
                None => {
                    outcome.conflicts.push(CopyConflict {
                        source_screening_id: source.id,
                        movie_title: format!("movie {}", source.movie_id),
                        time: source.show_time,
                        reason: "movie not found".to_string(),
                        conflict: None,
                    });
                    continue;
                }
            };

            let candidate = Candidate::new(source.show_time, movie.duration_minutes);
            if let Some(conflict) = self
                .conflict_for(source.room_id, req.to_date, &candidate, None)
                .await?
            {
                debug!(
                    "Copy of screening {} to {} overlaps screening {}",
                    source.id, req.to_date, conflict.screening_id
                );
                outcome.conflicts.push(CopyConflict {
                    source_screening_id: source.id,
                    movie_title: movie.title,
                    time: source.show_time,
                    reason: "scheduling conflict".to_string(),
                    conflict: Some(conflict),
                });
                continue;
            }

            let copy = NewScreening::copy_of(&source, req.to_date, Local::now().naive_local());
            match self.screenings.insert(&copy).await {
                Ok(created) => outcome.new_screenings.push(created),
                Err(StoreError::DuplicateSlot) => outcome.conflicts.push(CopyConflict {
                    source_screening_id: source.id,
                    movie_title: movie.title,
                    time: source.show_time,
                    reason: "slot already taken by an inactive screening".to_string(),
                    conflict: None,
                }),
                Err(e) => return Err(e.into()),
            }
        }

        outcome.copied_count = outcome.new_screenings.len();
        outcome.conflict_count = outcome.conflicts.len();
        info!(
            "Copied screenings from {} to {}: {} created, {} skipped",
            req.from_date, req.to_date, outcome.copied_count, outcome.conflict_count
        );
        Ok(outcome)
    }

    /// Сетка возможных времен начала фильма в зале на дату.
    pub async fn available_slots(
        &self,
        room_id: i64,
        date: NaiveDate,
        movie_id: i64,
    ) -> ServiceResult<SlotReport> {
        let movie = self.movie(movie_id).await?;
        let shows = self.scheduled_shows(room_id, date).await?;
        let window = SlotWindow {
            first_start: self.config.first_slot,
            last_start: self.config.last_slot,
            step_minutes: self.config.slot_step_minutes,
        };
        Ok(suggest(&window, movie.duration_minutes, &shows, self.config.buffer_minutes))
    }
}
