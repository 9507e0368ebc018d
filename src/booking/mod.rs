pub mod code;
pub mod machine;
pub mod pricing;

pub use machine::{BookingService, CreateBooking, CustomerDraft, SeatRequest};
