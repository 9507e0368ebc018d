//! Время сеанса в API передается как `HH:MM` (минутная точность).

use chrono::{NaiveTime, Timelike};
use serde::{de, Deserialize, Deserializer, Serializer};

pub const HHMM: &str = "%H:%M";

pub fn parse_hhmm(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(raw.trim(), HHMM)
}

pub fn format_hhmm(time: &NaiveTime) -> String {
    time.format(HHMM).to_string()
}

/// Минуты от полуночи.
pub fn minute_of_day(time: &NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight() / 60)
}

pub mod hhmm {
    use super::*;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_hhmm(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_hhmm(&raw).map_err(|_| de::Error::custom(format!("expected HH:MM, got {raw:?}")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => serializer.serialize_str(&format_hhmm(t)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|r| {
                parse_hhmm(&r).map_err(|_| de::Error::custom(format!("expected HH:MM, got {r:?}")))
            })
            .transpose()
        }
    }
}
