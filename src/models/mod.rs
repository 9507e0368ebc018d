pub mod booking;
pub mod catalog;
pub mod screening;
pub mod time;

pub use booking::{Booking, BookingStatus, CustomerInfo, NewBooking, PaymentStatus, SeatClaim};
pub use catalog::{ContactInfo, Movie, Room};
pub use screening::{NewScreening, Screening, ScreeningStatus};
