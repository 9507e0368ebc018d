use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Записи каталога: ядро их только читает.

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: i64,
    pub theater_id: i64,
    pub name: String,
    pub capacity: i32,
    #[serde(rename = "type")]
    pub room_type: String,
    pub status: String,
}

impl Room {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}
