//! Расписание сеансов: детектор пересечений, сетка слотов и сам планировщик.

pub mod conflict;
pub mod scheduler;
pub mod slots;

pub use conflict::{find_conflict, overlaps, Candidate, ConflictInfo, ScheduledShow};
pub use scheduler::{CopyConflict, CopyOutcome, CopyRequest, CreateScreening, Scheduler, ScreeningChanges};
pub use slots::{suggest, SlotReport, SlotSuggestion, SlotWindow};
