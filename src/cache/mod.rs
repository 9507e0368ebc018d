use crate::redis_client::RedisClient;

pub mod movies;
pub mod seats;

/// Кеш поверх Redis. Любая ошибка Redis означает промах: вызывающий идет в БД.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
}

impl CacheService {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}
