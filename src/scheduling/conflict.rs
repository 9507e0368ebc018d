//! Детектор пересечений сеансов в одном зале.
//!
//! Сеанс занимает отрезок `[start, start + duration)` в минутах от полуночи.
//! Кандидат конфликтует с существующим сеансом `E`, если
//! `start < E.end + buffer && end + buffer > E.start`: между концом одного
//! показа и началом следующего должно остаться не меньше `buffer` минут.

use chrono::{Duration, NaiveTime};
use serde::Serialize;

use crate::models::time::{hhmm, minute_of_day};

/// Запрошенное размещение сеанса.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub start: NaiveTime,
    pub duration_minutes: i64,
}

impl Candidate {
    pub fn new(start: NaiveTime, duration_minutes: i32) -> Self {
        Self { start, duration_minutes: i64::from(duration_minutes) }
    }

    fn span(&self) -> (i64, i64) {
        let start = minute_of_day(&self.start);
        (start, start + self.duration_minutes)
    }
}

/// Уже стоящий в расписании активный сеанс того же зала и даты.
#[derive(Debug, Clone)]
pub struct ScheduledShow {
    pub screening_id: i64,
    pub movie_title: String,
    pub start: NaiveTime,
    pub duration_minutes: i64,
}

impl ScheduledShow {
    fn span(&self) -> (i64, i64) {
        let start = minute_of_day(&self.start);
        (start, start + self.duration_minutes)
    }
}

/// Описание сеанса, с которым столкнулся кандидат.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub screening_id: i64,
    pub movie_title: String,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
}

impl From<&ScheduledShow> for ConflictInfo {
    fn from(show: &ScheduledShow) -> Self {
        let (end_time, _) = show
            .start
            .overflowing_add_signed(Duration::minutes(show.duration_minutes));
        Self {
            screening_id: show.screening_id,
            movie_title: show.movie_title.clone(),
            start_time: show.start,
            end_time,
            duration_minutes: show.duration_minutes,
        }
    }
}

pub fn overlaps(a: (i64, i64), b: (i64, i64), buffer_minutes: i64) -> bool {
    a.0 < b.1 + buffer_minutes && a.1 + buffer_minutes > b.0
}

/// Первый по времени сеанс, с которым конфликтует кандидат.
/// `exclude` убирает из проверки сам изменяемый сеанс.
pub fn find_conflict(
    candidate: &Candidate,
    existing: &[ScheduledShow],
    buffer_minutes: i64,
    exclude: Option<i64>,
) -> Option<ConflictInfo> {
    let span = candidate.span();
    existing
        .iter()
        .filter(|show| Some(show.screening_id) != exclude)
        .filter(|show| overlaps(span, show.span(), buffer_minutes))
        .min_by_key(|show| show.start)
        .map(ConflictInfo::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::time::parse_hhmm;

    fn show(id: i64, start: &str, duration: i64) -> ScheduledShow {
        ScheduledShow {
            screening_id: id,
            movie_title: format!("Movie {id}"),
            start: parse_hhmm(start).unwrap(),
            duration_minutes: duration,
        }
    }

    fn at(start: &str, duration: i32) -> Candidate {
        Candidate::new(parse_hhmm(start).unwrap(), duration)
    }

    #[test]
    fn overlap_inside_running_show_is_rejected() {
        let existing = vec![show(1, "10:00", 120)];
        let conflict = find_conflict(&at("11:00", 90), &existing, 15, None).unwrap();
        assert_eq!(conflict.screening_id, 1);
        assert_eq!(conflict.movie_title, "Movie 1");
        assert_eq!(conflict.start_time, parse_hhmm("10:00").unwrap());
        assert_eq!(conflict.end_time, parse_hhmm("12:00").unwrap());
        assert_eq!(conflict.duration_minutes, 120);
    }

    #[test]
    fn start_exactly_at_buffered_end_is_accepted() {
        let existing = vec![show(1, "10:00", 120)];
        assert!(find_conflict(&at("12:15", 90), &existing, 15, None).is_none());
        assert!(find_conflict(&at("12:14", 90), &existing, 15, None).is_some());
    }

    #[test]
    fn buffer_applies_before_existing_show_too() {
        let existing = vec![show(1, "14:00", 100)];
        // 12:00 + 105 = 13:45, ровно 15 минут до начала
        assert!(find_conflict(&at("12:00", 105), &existing, 15, None).is_none());
        assert!(find_conflict(&at("12:00", 106), &existing, 15, None).is_some());
    }

    #[test]
    fn excluded_screening_is_ignored() {
        let existing = vec![show(7, "10:00", 120)];
        assert!(find_conflict(&at("10:30", 120), &existing, 15, Some(7)).is_none());
    }

    #[test]
    fn earliest_colliding_show_is_reported() {
        let existing = vec![show(2, "13:00", 90), show(1, "10:00", 120)];
        let conflict = find_conflict(&at("11:30", 120), &existing, 15, None).unwrap();
        assert_eq!(conflict.screening_id, 1);
    }

    #[test]
    fn test_is_symmetric() {
        let a = (600, 720);
        let b = (700, 800);
        assert_eq!(overlaps(a, b, 15), overlaps(b, a, 15));
        let c = (735, 800);
        assert!(!overlaps(a, c, 15));
        assert!(!overlaps(c, a, 15));
    }
}
