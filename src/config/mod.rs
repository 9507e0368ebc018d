use chrono::NaiveTime;
use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::models::time::hhmm;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub scheduling: SchedulingConfig,
    pub booking: BookingConfig,
    pub cleanup: CleanupConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// `text` или `json`
    pub log_format: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Правила расписания
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingConfig {
    /// Минимальный зазор между сеансами в одном зале.
    pub buffer_minutes: i64,
    pub slot_step_minutes: u32,
    #[serde(with = "hhmm")]
    pub first_slot: NaiveTime,
    #[serde(with = "hhmm")]
    pub last_slot: NaiveTime,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            buffer_minutes: 15,
            slot_step_minutes: 15,
            first_slot: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            last_slot: NaiveTime::from_hms_opt(22, 30, 0).unwrap_or_default(),
        }
    }
}

// Правила бронирования
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Отмена запрещена, если до начала сеанса меньше этого числа часов.
    pub cancellation_cutoff_hours: i64,
    /// Сколько раз пробуем сгенерировать уникальный код брони.
    pub code_attempts: u32,
    /// Через сколько минут неоплаченная бронь снимается. 0 - никогда.
    pub unpaid_hold_minutes: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            cancellation_cutoff_hours: 2,
            code_attempts: 5,
            unpaid_hold_minutes: 15,
        }
    }
}

// Фоновое обслуживание
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    pub interval_seconds: u64,
}

impl Config {
    /// Значения по умолчанию, затем `config/default.*`, затем переменные
    /// `SHOWTIME__<SECTION>__<KEY>`. Плоские PORT, DATABASE_URL и т.п.
    /// перекрывают всё остальное.
    pub fn load() -> Result<Self, ConfigError> {
        config::Config::builder()
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", "showtime_booking=debug,tower_http=debug")?
            .set_default("app.log_format", "text")?
            .set_default("database.pool_size", 20)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("scheduling.buffer_minutes", 15)?
            .set_default("scheduling.slot_step_minutes", 15)?
            .set_default("scheduling.first_slot", "09:00")?
            .set_default("scheduling.last_slot", "22:30")?
            .set_default("booking.cancellation_cutoff_hours", 2)?
            .set_default("booking.code_attempts", 5)?
            .set_default("booking.unpaid_hold_minutes", 15)?
            .set_default("cleanup.interval_seconds", 300)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("SHOWTIME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("app.host", env::var("HOST").ok())?
            .set_override_option("app.port", env::var("PORT").ok())?
            .set_override_option("app.environment", env::var("ENVIRONMENT").ok())?
            .set_override_option("app.rust_log", env::var("RUST_LOG").ok())?
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("database.pool_size", env::var("DB_POOL_SIZE").ok())?
            .set_override_option("redis.url", env::var("REDIS_URL").ok())?
            .build()?
            .try_deserialize()
    }
}
