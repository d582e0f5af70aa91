//! In-process store adapters.
//!
//! Bookings and their history share one table behind a `std::sync::Mutex`.
//! Every operation takes the lock once and never awaits while holding it, so
//! `insert_within_capacity` and `transition` are atomic with respect to each
//! other across tasks and threads, and a transition's history record lands in
//! the same critical section as its state change.
//!
//! Build the history adapter from the booking adapter with
//! [`InMemoryBookingRepository::history`] so both see the same table.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::ports::{
    BookingRepository, BookingRepositoryError, CapacityOutcome, HistoryRepository,
    HistoryRepositoryError,
};
use crate::domain::{
    ActorId, Booking, BookingId, BookingState, BookingToken, CapacityGuard, HistoryRecord,
    Municipality, NewBooking,
};

#[derive(Debug, Default)]
struct BookingTable {
    last_id: i64,
    rows: BTreeMap<BookingId, Booking>,
    history: Vec<HistoryRecord>,
}

type SharedTable = Arc<Mutex<BookingTable>>;

impl BookingTable {
    fn live_count(&self, municipality: &Municipality, date: NaiveDate) -> u64 {
        let count = self
            .rows
            .values()
            .filter(|booking| {
                booking.municipality() == municipality
                    && booking.date() == date
                    && booking.state() != BookingState::Canceled
            })
            .count();
        u64::try_from(count).unwrap_or(u64::MAX)
    }

    fn select<P>(&self, predicate: P) -> Vec<Booking>
    where
        P: Fn(&Booking) -> bool,
    {
        self.rows
            .values()
            .filter(|booking| predicate(booking))
            .cloned()
            .collect()
    }
}

/// Booking store held in process memory. Identifiers start at 1.
#[derive(Debug, Default)]
pub struct InMemoryBookingRepository {
    table: SharedTable,
}

impl InMemoryBookingRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// History adapter reading and writing this store's history.
    pub fn history(&self) -> InMemoryHistoryRepository {
        InMemoryHistoryRepository {
            table: Arc::clone(&self.table),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BookingTable>, BookingRepositoryError> {
        self.table
            .lock()
            .map_err(|_| BookingRepositoryError::query("booking table lock poisoned"))
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert_within_capacity(
        &self,
        booking: NewBooking,
        guard: CapacityGuard,
    ) -> Result<CapacityOutcome, BookingRepositoryError> {
        let mut table = self.lock()?;

        let current = table.live_count(&booking.municipality, booking.date);
        if let Err(rejection) = guard.check(&booking.municipality, booking.date, current) {
            return Ok(CapacityOutcome::Rejected(rejection));
        }
        if table.rows.values().any(|row| row.token() == &booking.token) {
            return Err(BookingRepositoryError::query("duplicate booking token"));
        }

        table.last_id += 1;
        let stored = Booking::new(BookingId::new(table.last_id), booking);
        table.rows.insert(stored.id(), stored.clone());
        Ok(CapacityOutcome::Inserted(stored))
    }

    async fn transition(
        &self,
        expected: BookingState,
        record: HistoryRecord,
    ) -> Result<Booking, BookingRepositoryError> {
        let id = record.booking_id();
        let mut table = self.lock()?;
        let row = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| BookingRepositoryError::missing(id.get()))?;
        if row.state() != expected {
            return Err(BookingRepositoryError::conflict(id.get()));
        }
        *row = row.clone().with_state(record.state());
        let updated = row.clone();
        table.history.push(record);
        Ok(updated)
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, BookingRepositoryError> {
        Ok(self.lock()?.rows.get(&id).cloned())
    }

    async fn find_by_token(
        &self,
        token: &BookingToken,
    ) -> Result<Option<Booking>, BookingRepositoryError> {
        Ok(self
            .lock()?
            .rows
            .values()
            .find(|booking| booking.token() == token)
            .cloned())
    }

    async fn find_all_by_creator(
        &self,
        creator: &ActorId,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        Ok(self
            .lock()?
            .select(|booking| booking.created_by() == creator))
    }

    async fn count_by_municipality_and_date(
        &self,
        municipality: &Municipality,
        date: NaiveDate,
    ) -> Result<u64, BookingRepositoryError> {
        Ok(self.lock()?.live_count(municipality, date))
    }

    async fn find_by_municipality_and_date(
        &self,
        municipality: &Municipality,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        Ok(self.lock()?.select(|booking| {
            booking.municipality() == municipality && booking.date() == date
        }))
    }

    async fn find_by_municipality(
        &self,
        municipality: &Municipality,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        Ok(self
            .lock()?
            .select(|booking| booking.municipality() == municipality))
    }

    async fn find_by_district(
        &self,
        district: &str,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        Ok(self
            .lock()?
            .select(|booking| booking.district() == Some(district)))
    }

    async fn find_all(&self) -> Result<Vec<Booking>, BookingRepositoryError> {
        Ok(self.lock()?.select(|_| true))
    }
}

/// History store held in process memory.
///
/// [`InMemoryHistoryRepository::new`] gives a standalone store; use
/// [`InMemoryBookingRepository::history`] to see the records written by
/// transitions.
#[derive(Debug, Default)]
pub struct InMemoryHistoryRepository {
    table: SharedTable,
}

impl InMemoryHistoryRepository {
    /// Create an empty, standalone history store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BookingTable>, HistoryRepositoryError> {
        self.table
            .lock()
            .map_err(|_| HistoryRepositoryError::query("history lock poisoned"))
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn append(&self, record: &HistoryRecord) -> Result<(), HistoryRepositoryError> {
        self.lock()?.history.push(record.clone());
        Ok(())
    }

    async fn find_by_booking_id_ordered(
        &self,
        booking_id: BookingId,
    ) -> Result<Vec<HistoryRecord>, HistoryRepositoryError> {
        let mut records: Vec<HistoryRecord> = self
            .lock()?
            .history
            .iter()
            .filter(|record| record.booking_id() == booking_id)
            .cloned()
            .collect();
        // Stable: equal timestamps keep append order.
        records.sort_by_key(HistoryRecord::changed_at);
        Ok(records)
    }
}
