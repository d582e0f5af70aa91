//! Driven ports for the booking and history stores.
//!
//! Adapters live under `crate::outbound`; the domain depends only on these
//! traits.

mod macros;
pub(crate) use macros::define_port_error;

mod booking_repository;
mod history_repository;

#[cfg(test)]
pub use booking_repository::MockBookingRepository;
pub use booking_repository::{BookingRepository, BookingRepositoryError, CapacityOutcome};
#[cfg(test)]
pub use history_repository::MockHistoryRepository;
pub use history_repository::{HistoryRepository, HistoryRepositoryError};
