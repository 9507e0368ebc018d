//! Инвентарь мест: счетчик свободных мест сеанса и атомарные резерв/возврат.

pub mod ledger;

pub use ledger::{ScreeningLock, SeatHold, SeatLedger};
