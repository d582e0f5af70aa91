//! Port for booking persistence.
//!
//! Two operations carry the concurrency discipline of the lifecycle:
//!
//! - [`BookingRepository::insert_within_capacity`] counts live bookings for
//!   the `(municipality, date)` pair, asks the [`CapacityGuard`], and inserts,
//!   all while holding a lock scoped to that pair.
//! - [`BookingRepository::transition`] is a compare-and-set on the current
//!   state that writes the matching history record in the same atomic step,
//!   so history order always follows commit order. The transition graph is
//!   acyclic, so the state doubles as an ABA-free version number.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    ActorId, Booking, BookingId, BookingState, BookingToken, CapacityGuard, CapacityRejection,
    HistoryRecord, Municipality, NewBooking,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by booking repository adapters.
    pub enum BookingRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "booking repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "booking repository query failed: {message}",
        /// The stored state no longer matches the expected state.
        Conflict { booking_id: i64 } =>
            "booking {booking_id} was modified concurrently",
        /// The booking disappeared between read and write.
        Missing { booking_id: i64 } =>
            "booking {booking_id} does not exist",
        /// The history record could not be written; the state change was
        /// rolled back with it.
        HistoryWrite { booking_id: i64, message: String } =>
            "history for booking {booking_id} could not be written: {message}",
    }
}

/// Result of an atomic capacity-checked insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapacityOutcome {
    /// The booking was stored and received an identifier.
    Inserted(Booking),
    /// The guard rejected the insert; nothing was written.
    Rejected(CapacityRejection),
}

/// Port for reading and writing bookings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Count live bookings for the booking's municipality and date, check
    /// `guard`, and insert on acceptance, atomically per pair.
    async fn insert_within_capacity(
        &self,
        booking: NewBooking,
        guard: CapacityGuard,
    ) -> Result<CapacityOutcome, BookingRepositoryError>;

    /// Move `record.booking_id()` to `record.state()` only if it is currently
    /// `expected`, appending `record` to the history in the same atomic step.
    ///
    /// Nothing is written when the compare fails or the append fails.
    async fn transition(
        &self,
        expected: BookingState,
        record: HistoryRecord,
    ) -> Result<Booking, BookingRepositoryError>;

    /// Find a booking by id.
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, BookingRepositoryError>;

    /// Find a booking by its public token.
    async fn find_by_token(
        &self,
        token: &BookingToken,
    ) -> Result<Option<Booking>, BookingRepositoryError>;

    /// All bookings created by `creator`.
    async fn find_all_by_creator(
        &self,
        creator: &ActorId,
    ) -> Result<Vec<Booking>, BookingRepositoryError>;

    /// Number of non-canceled bookings for the pair.
    async fn count_by_municipality_and_date(
        &self,
        municipality: &Municipality,
        date: NaiveDate,
    ) -> Result<u64, BookingRepositoryError>;

    /// All bookings for the pair, canceled ones included.
    async fn find_by_municipality_and_date(
        &self,
        municipality: &Municipality,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, BookingRepositoryError>;

    /// All bookings in a municipality.
    async fn find_by_municipality(
        &self,
        municipality: &Municipality,
    ) -> Result<Vec<Booking>, BookingRepositoryError>;

    /// All bookings in a district.
    async fn find_by_district(&self, district: &str)
    -> Result<Vec<Booking>, BookingRepositoryError>;

    /// Every booking.
    async fn find_all(&self) -> Result<Vec<Booking>, BookingRepositoryError>;
}
