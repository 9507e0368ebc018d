//! Сетка кандидатов на время начала сеанса.
//!
//! Окно ограничивает только время начала: последний кандидат стартует в
//! `last_start`, даже если фильм закончится после закрытия.

use chrono::{Duration, NaiveTime};
use serde::Serialize;

use super::conflict::{find_conflict, Candidate, ConflictInfo, ScheduledShow};
use crate::models::time::{hhmm, minute_of_day};

#[derive(Debug, Clone, Copy)]
pub struct SlotWindow {
    pub first_start: NaiveTime,
    pub last_start: NaiveTime,
    pub step_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSuggestion {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub available: bool,
    pub conflict: Option<ConflictInfo>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotReport {
    pub available_slots: Vec<SlotSuggestion>,
    pub unavailable_slots: Vec<SlotSuggestion>,
    pub all_slots: Vec<SlotSuggestion>,
}

impl SlotWindow {
    /// Все времена начала от `first_start` до `last_start` включительно.
    pub fn starts(&self) -> Vec<NaiveTime> {
        let step = i64::from(self.step_minutes.max(1));
        let first = minute_of_day(&self.first_start);
        let last = minute_of_day(&self.last_start);
        let mut starts = Vec::new();
        let mut minute = first;
        while minute <= last {
            let (t, _) = self
                .first_start
                .overflowing_add_signed(Duration::minutes(minute - first));
            starts.push(t);
            minute += step;
        }
        starts
    }
}

/// Классифицирует каждую точку сетки детектором конфликтов.
pub fn suggest(
    window: &SlotWindow,
    duration_minutes: i32,
    existing: &[ScheduledShow],
    buffer_minutes: i64,
) -> SlotReport {
    let mut report = SlotReport::default();
    for start in window.starts() {
        let candidate = Candidate::new(start, duration_minutes);
        let conflict = find_conflict(&candidate, existing, buffer_minutes, None);
        let (end_time, _) = start.overflowing_add_signed(Duration::minutes(i64::from(duration_minutes)));
        let slot = SlotSuggestion {
            time: start,
            end_time,
            available: conflict.is_none(),
            conflict,
        };
        if slot.available {
            report.available_slots.push(slot.clone());
        } else {
            report.unavailable_slots.push(slot.clone());
        }
        report.all_slots.push(slot);
    }
    report
}
