use crate::cache::CacheService;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// Карта занятых мест живет недолго: инвалидация идет после каждой брони/отмены
const OCCUPIED_TTL_SECONDS: u64 = 60;
// Версия должна пережить любую запись карты
const VERSION_TTL_SECONDS: i64 = 86_400;

fn occupied_key(screening_id: i64) -> String {
    format!("occupied:{}", screening_id)
}

fn version_key(screening_id: i64) -> String {
    format!("occupied:{}:version", screening_id)
}

/// Карта мест вместе с версией, прочитанной до похода в БД.
#[derive(Debug, Serialize, Deserialize)]
struct OccupiedEntry {
    version: u64,
    labels: Vec<String>,
}

/// Запись, сделанная до последней инвалидации, считается промахом.
fn fresh_labels(entry: OccupiedEntry, current: u64) -> Option<Vec<String>> {
    (entry.version == current).then_some(entry.labels)
}

impl CacheService {
    /// Текущая версия карты мест. Читать до запроса в БД и передать в `save_occupied`.
    pub async fn occupied_version(&self, screening_id: i64) -> u64 {
        let mut conn = self.redis.conn.clone();
        let version: Option<u64> = conn.get(version_key(screening_id)).await.ok().flatten();
        version.unwrap_or(0)
    }

    pub async fn get_occupied(&self, screening_id: i64) -> Option<Vec<String>> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(occupied_key(screening_id)).await.ok().flatten();
        let entry: OccupiedEntry = data.and_then(|json| serde_json::from_str(&json).ok())?;
        let current = self.occupied_version(screening_id).await;
        fresh_labels(entry, current)
    }

    pub async fn save_occupied(&self, screening_id: i64, version: u64, labels: &[String]) {
        let entry = OccupiedEntry { version, labels: labels.to_vec() };
        let data = match serde_json::to_string(&entry) {
            Ok(data) => data,
            Err(_) => return,
        };
        let mut conn = self.redis.conn.clone();
        let result: Result<(), redis::RedisError> = conn
            .set_ex(occupied_key(screening_id), data, OCCUPIED_TTL_SECONDS)
            .await;
        if let Err(e) = result {
            warn!("Failed to cache occupied seats for screening {}: {:?}", screening_id, e);
        }
    }

    // Инвалидировать карту мест сеанса: поднимаем версию, чтобы запоздавшая
    // запись старой карты тоже не читалась
    pub async fn invalidate_occupied(&self, screening_id: i64) {
        let mut conn = self.redis.conn.clone();
        let bumped: Result<u64, redis::RedisError> = conn.incr(version_key(screening_id), 1).await;
        if let Err(e) = bumped {
            warn!("Failed to bump occupied seats version for screening {}: {:?}", screening_id, e);
        }
        let _: Result<(), _> = conn.expire(version_key(screening_id), VERSION_TTL_SECONDS).await;
        let _: Result<(), _> = conn.del(occupied_key(screening_id)).await;
        debug!("Invalidated occupied seats cache for screening {}", screening_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(version: u64) -> OccupiedEntry {
        OccupiedEntry { version, labels: vec!["A1".into()] }
    }

    #[test]
    fn map_written_before_invalidation_is_a_miss() {
        // читатель взял версию 0, бронь подняла ее до 1, запись с 0 легла позже
        assert_eq!(fresh_labels(entry(0), 1), None);
        assert_eq!(fresh_labels(entry(1), 1), Some(vec!["A1".to_string()]));
    }
}
