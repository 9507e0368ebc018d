use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::Catalog;
use crate::models::{ContactInfo, Movie, Room};
use crate::store::StoreResult;

/// Каталог в памяти, наполняется вручную.
#[derive(Default)]
pub struct StaticCatalog {
    movies: RwLock<HashMap<i64, Movie>>,
    rooms: RwLock<HashMap<(i64, i64), Room>>,
    contacts: RwLock<HashMap<i64, ContactInfo>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_movie(&self, id: i64, title: &str, duration_minutes: i32) -> Movie {
        let movie = Movie { id, title: title.to_string(), duration_minutes };
        self.movies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, movie.clone());
        movie
    }

    pub fn add_room(&self, theater_id: i64, id: i64, capacity: i32) -> Room {
        let room = Room {
            id,
            theater_id,
            name: format!("Hall {id}"),
            capacity,
            room_type: "standard".to_string(),
            status: "active".to_string(),
        };
        self.rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((theater_id, id), room.clone());
        room
    }

    pub fn set_room_status(&self, theater_id: i64, id: i64, status: &str) {
        if let Some(room) = self
            .rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&(theater_id, id))
        {
            room.status = status.to_string();
        }
    }

    pub fn add_contact(&self, user_id: i64, contact: ContactInfo) {
        self.contacts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, contact);
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn movie(&self, id: i64) -> StoreResult<Option<Movie>> {
        Ok(self.movies.read().unwrap_or_else(PoisonError::into_inner).get(&id).cloned())
    }

    async fn room(&self, theater_id: i64, room_id: i64) -> StoreResult<Option<Room>> {
        Ok(self
            .rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(theater_id, room_id))
            .cloned())
    }

    async fn contact(&self, user_id: i64) -> StoreResult<Option<ContactInfo>> {
        Ok(self
            .contacts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned())
    }
}
