//! Port for the append-only history store.

use async_trait::async_trait;

use crate::domain::{BookingId, HistoryRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised by history repository adapters.
    pub enum HistoryRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "history repository connection failed: {message}",
        /// Query or insert failed during execution.
        Query { message: String } =>
            "history repository query failed: {message}",
    }
}

/// Port for appending and reading history records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append one record. Records are never updated or deleted.
    async fn append(&self, record: &HistoryRecord) -> Result<(), HistoryRepositoryError>;

    /// Records for a booking, ascending by timestamp, ties in append order.
    async fn find_by_booking_id_ordered(
        &self,
        booking_id: BookingId,
    ) -> Result<Vec<HistoryRecord>, HistoryRepositoryError>;
}
