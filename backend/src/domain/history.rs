//! Append-only audit trail of accepted state transitions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ports::{HistoryRepository, HistoryRepositoryError};
use super::{ActorId, BookingId, BookingState};

/// One accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    booking_id: BookingId,
    state: BookingState,
    changed_at: DateTime<Utc>,
    changed_by: ActorId,
}

impl HistoryRecord {
    /// Build a record for `booking_id` entering `state`.
    pub fn new(
        booking_id: BookingId,
        state: BookingState,
        changed_by: ActorId,
        changed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            booking_id,
            state,
            changed_at,
            changed_by,
        }
    }

    /// Booking the record belongs to.
    pub fn booking_id(&self) -> BookingId {
        self.booking_id
    }

    /// State entered by the transition.
    pub fn state(&self) -> BookingState {
        self.state
    }

    /// When the transition was accepted.
    pub fn changed_at(&self) -> DateTime<Utc> {
        self.changed_at
    }

    /// Actor the transition is attributed to.
    pub fn changed_by(&self) -> &ActorId {
        &self.changed_by
    }
}

/// Read and append access to the audit trail.
///
/// Transition records written by the lifecycle service bypass
/// [`HistoryLedger::append`]: they travel with the compare-and-set through
/// [`BookingRepository::transition`] so that they commit together with the
/// state change.
///
/// [`BookingRepository::transition`]: super::ports::BookingRepository::transition
pub struct HistoryLedger<H> {
    history_repo: Arc<H>,
}

impl<H> Clone for HistoryLedger<H> {
    fn clone(&self) -> Self {
        Self {
            history_repo: Arc::clone(&self.history_repo),
        }
    }
}

impl<H> HistoryLedger<H>
where
    H: HistoryRepository,
{
    /// Create a ledger over the history repository.
    pub fn new(history_repo: Arc<H>) -> Self {
        Self { history_repo }
    }

    /// Append a record for an accepted transition.
    pub async fn append(
        &self,
        booking_id: BookingId,
        state: BookingState,
        actor: &ActorId,
        timestamp: DateTime<Utc>,
    ) -> Result<HistoryRecord, HistoryRepositoryError> {
        let record = HistoryRecord::new(booking_id, state, actor.clone(), timestamp);
        self.history_repo.append(&record).await?;
        debug!(booking_id = %booking_id, state = %state, "history record appended");
        Ok(record)
    }

    /// Records for a booking in chronological order; empty when none.
    pub async fn list_for_booking(
        &self,
        booking_id: BookingId,
    ) -> Result<Vec<HistoryRecord>, HistoryRepositoryError> {
        self.history_repo.find_by_booking_id_ordered(booking_id).await
    }
}
