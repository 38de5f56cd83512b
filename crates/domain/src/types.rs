//! Common data types used throughout the application

pub mod events;
pub mod range;
pub mod reservation;
pub mod slot;

pub use events::{DayClearEvent, DayClearNotification, HistoryAction, HistoryEvent};
pub use range::DateRange;
pub use reservation::{Reservation, ReservationPatch, ReservationStatus, ReservationType};
pub use slot::{Room, SlotKey};
