use async_trait::async_trait;
use sqlx::PgPool;

use super::Catalog;
use crate::models::{ContactInfo, Movie, Room};
use crate::store::StoreResult;

#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn movie(&self, id: i64) -> StoreResult<Option<Movie>> {
        Ok(sqlx::query_as::<_, Movie>(
            "SELECT id, title, duration_minutes FROM movies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn room(&self, theater_id: i64, room_id: i64) -> StoreResult<Option<Room>> {
        Ok(sqlx::query_as::<_, Room>(
            "SELECT id, theater_id, name, capacity, room_type, status
             FROM theater_rooms
             WHERE theater_id = $1 AND id = $2",
        )
        .bind(theater_id)
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn contact(&self, user_id: i64) -> StoreResult<Option<ContactInfo>> {
        Ok(sqlx::query_as::<_, ContactInfo>(
            "SELECT name, email, phone FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}
