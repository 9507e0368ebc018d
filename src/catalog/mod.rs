//! Каталог фильмов, залов и контактов пользователей. Для ядра только чтение:
//! CRUD каталога живет в другом сервисе.

use async_trait::async_trait;

use crate::models::{ContactInfo, Movie, Room};
use crate::store::StoreResult;

pub mod cached;
pub mod memory;
pub mod postgres;

pub use cached::CachedCatalog;
pub use memory::StaticCatalog;
pub use postgres::PgCatalog;

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn movie(&self, id: i64) -> StoreResult<Option<Movie>>;

    async fn room(&self, theater_id: i64, room_id: i64) -> StoreResult<Option<Room>>;

    /// Контакты по умолчанию для `customerInfo` брони.
    async fn contact(&self, user_id: i64) -> StoreResult<Option<ContactInfo>>;
}
