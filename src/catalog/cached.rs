use async_trait::async_trait;
use std::sync::Arc;

use super::Catalog;
use crate::cache::CacheService;
use crate::models::{ContactInfo, Movie, Room};
use crate::store::StoreResult;

/// Фильмы читаются на каждую проверку конфликтов, поэтому кешируем их в Redis.
/// Залы и контакты идут напрямую.
pub struct CachedCatalog {
    inner: Arc<dyn Catalog>,
    cache: CacheService,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn Catalog>, cache: CacheService) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl Catalog for CachedCatalog {
    async fn movie(&self, id: i64) -> StoreResult<Option<Movie>> {
        if let Some(movie) = self.cache.get_movie(id).await {
            return Ok(Some(movie));
        }
        let movie = self.inner.movie(id).await?;
        if let Some(ref m) = movie {
            self.cache.save_movie(m).await;
        }
        Ok(movie)
    }

    async fn room(&self, theater_id: i64, room_id: i64) -> StoreResult<Option<Room>> {
        self.inner.room(theater_id, room_id).await
    }

    async fn contact(&self, user_id: i64) -> StoreResult<Option<ContactInfo>> {
        self.inner.contact(user_id).await
    }
}
