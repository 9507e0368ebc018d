use crate::cache::CacheService;
use crate::models::Movie;
use redis::AsyncCommands;
use tracing::warn;

const MOVIE_TTL_SECONDS: u64 = 3600;

impl CacheService {
    pub async fn get_movie(&self, id: i64) -> Option<Movie> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(format!("movie:{}", id)).await.ok().flatten();
        data.and_then(|json| serde_json::from_str(&json).ok())
    }

    pub async fn save_movie(&self, movie: &Movie) {
        let data = match serde_json::to_string(movie) {
            Ok(data) => data,
            Err(_) => return,
        };
        let mut conn = self.redis.conn.clone();
        let result: Result<(), redis::RedisError> = conn
            .set_ex(format!("movie:{}", movie.id), data, MOVIE_TTL_SECONDS)
            .await;
        if let Err(e) = result {
            warn!("Failed to cache movie {}: {:?}", movie.id, e);
        }
    }
}
