//! Booking lifecycle service.
//!
//! Owns every decision to create or mutate a booking. Each accepted
//! transition is stamped with the injected clock and handed to the booking
//! store, which applies the compare-and-set and appends the history record
//! atomically. Reads of the trail go through the [`HistoryLedger`]. Nothing
//! here retries; callers decide what to do with a
//! [`ErrorCode::ConcurrencyConflict`].
//!
//! [`ErrorCode::ConcurrencyConflict`]: crate::domain::ErrorCode::ConcurrencyConflict

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use mockable::Clock;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{
    BookingRepository, BookingRepositoryError, CapacityOutcome, HistoryRepository,
    HistoryRepositoryError,
};
use crate::domain::{
    Actor, ActorId, Booking, BookingId, BookingPolicy, BookingRequest, BookingState,
    BookingToken, Error, HistoryLedger, HistoryRecord, Municipality, NewBooking,
    is_legal_transition, slots,
};

fn map_booking_repository_error(error: BookingRepositoryError) -> Error {
    match error {
        BookingRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("booking repository unavailable: {message}"))
        }
        BookingRepositoryError::Query { message } => {
            Error::internal(format!("booking repository error: {message}"))
        }
        BookingRepositoryError::Conflict { booking_id } => Error::concurrency_conflict(format!(
            "booking {booking_id} was modified concurrently; retry from a fresh read"
        )),
        BookingRepositoryError::Missing { booking_id } => {
            Error::not_found(format!("booking {booking_id} not found"))
        }
        BookingRepositoryError::HistoryWrite {
            booking_id,
            message,
        } => {
            error!(booking_id, error = %message, "history append failed; transition rolled back");
            Error::history_write_failed(format!(
                "booking {booking_id} was not moved because its history record could not be written: {message}"
            ))
            .with_details(json!({ "bookingId": booking_id }))
        }
    }
}

fn map_history_read_error(error: HistoryRepositoryError) -> Error {
    match error {
        HistoryRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("history repository unavailable: {message}"))
        }
        HistoryRepositoryError::Query { message } => {
            Error::internal(format!("history repository error: {message}"))
        }
    }
}

/// State machine and creation rules for bookings.
pub struct BookingLifecycleService<B, H> {
    booking_repo: Arc<B>,
    ledger: HistoryLedger<H>,
    policy: BookingPolicy,
    clock: Arc<dyn Clock>,
}

impl<B, H> Clone for BookingLifecycleService<B, H> {
    fn clone(&self) -> Self {
        Self {
            booking_repo: Arc::clone(&self.booking_repo),
            ledger: self.ledger.clone(),
            policy: self.policy.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<B, H> BookingLifecycleService<B, H>
where
    B: BookingRepository,
    H: HistoryRepository,
{
    /// Create a lifecycle service.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use mockable::DefaultClock;
    /// # use municipal_bookings::domain::{BookingLifecycleService, BookingPolicy};
    /// # use municipal_bookings::outbound::memory::{
    /// #     InMemoryBookingRepository,
    /// # };
    /// let bookings = InMemoryBookingRepository::new();
    /// let history = bookings.history();
    /// let service = BookingLifecycleService::new(
    ///     Arc::new(bookings),
    ///     Arc::new(history),
    ///     BookingPolicy::default(),
    ///     Arc::new(DefaultClock),
    /// );
    /// # let _ = service;
    /// ```
    pub fn new(
        booking_repo: Arc<B>,
        history_repo: Arc<H>,
        policy: BookingPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            booking_repo,
            ledger: HistoryLedger::new(history_repo),
            policy,
            clock,
        }
    }

    /// Policy the service was built with.
    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    /// Validate a request and store a new `RECEIVED` booking.
    ///
    /// No history record is written for creation.
    pub async fn create(&self, request: BookingRequest, actor: &Actor) -> Result<Booking, Error> {
        info!(actor = %actor.id(), role = %actor.role(), "booking requested");

        let today = self.clock.local().date_naive();
        if let Err(violation) = self
            .policy
            .check_schedule(request.date, request.time, today)
        {
            warn!(actor = %actor.id(), reason = %violation, "booking request rejected");
            return Err(Error::invalid_request(violation.to_string()));
        }

        let municipality = Municipality::new(request.municipality)
            .map_err(|err| Error::invalid_request(err.to_string()))?;

        let draft = NewBooking {
            municipality,
            village: request.village,
            district: request.district,
            postal_code: request.postal_code,
            date: request.date,
            time: request.time,
            description: request.description,
            token: BookingToken::generate(),
            state: BookingState::Received,
            created_by: actor.id().clone(),
        };

        let outcome = self
            .booking_repo
            .insert_within_capacity(draft, self.policy.capacity())
            .await
            .map_err(map_booking_repository_error)?;

        match outcome {
            CapacityOutcome::Inserted(booking) => {
                info!(
                    actor = %actor.id(),
                    booking_id = %booking.id(),
                    municipality = %booking.municipality(),
                    "booking created"
                );
                Ok(booking)
            }
            CapacityOutcome::Rejected(rejection) => {
                warn!(
                    actor = %actor.id(),
                    municipality = %rejection.municipality,
                    date = %rejection.date,
                    "booking request rejected: capacity reached"
                );
                Err(Error::capacity_exceeded(rejection.to_string()).with_details(json!({
                    "municipality": rejection.municipality.as_ref(),
                    "date": rejection.date,
                    "dailyCap": rejection.daily_cap,
                })))
            }
        }
    }

    /// Move a booking to `CANCELED`.
    ///
    /// Uses the transition table without the same-state short-circuit, so
    /// cancelling a terminal booking fails with an illegal transition.
    pub async fn cancel(&self, id: BookingId, actor: &Actor) -> Result<Booking, Error> {
        let booking = self.get(id).await?;
        self.apply_transition(booking, BookingState::Canceled, actor)
            .await
    }

    /// Move a booking to `new_state`.
    ///
    /// Requesting the current state returns the booking untouched without
    /// writing anything.
    pub async fn update_state(
        &self,
        id: BookingId,
        new_state: BookingState,
        actor: &Actor,
    ) -> Result<Booking, Error> {
        info!(booking_id = %id, new_state = %new_state, actor = %actor.id(), "booking state update requested");
        let booking = self.get(id).await?;

        if booking.state() == new_state {
            debug!(booking_id = %id, state = %new_state, "state unchanged; nothing to do");
            return Ok(booking);
        }

        self.apply_transition(booking, new_state, actor).await
    }

    async fn apply_transition(
        &self,
        booking: Booking,
        next: BookingState,
        actor: &Actor,
    ) -> Result<Booking, Error> {
        let id = booking.id();
        let current = booking.state();

        if !is_legal_transition(current, next) {
            warn!(booking_id = %id, from = %current, to = %next, actor = %actor.id(), "state transition rejected");
            return Err(Error::illegal_transition(format!(
                "invalid state transition: {current} -> {next}"
            ))
            .with_details(json!({ "from": current, "to": next })));
        }

        // Stamped before the compare-and-set: any later transition of this
        // booking can only start after this one commits.
        let record = HistoryRecord::new(id, next, actor.id().clone(), self.clock.utc());
        let updated = self
            .booking_repo
            .transition(current, record)
            .await
            .map_err(map_booking_repository_error)?;

        info!(booking_id = %id, from = %current, to = %next, actor = %actor.id(), "booking state updated");
        Ok(updated)
    }

    /// Load a booking by id.
    pub async fn get(&self, id: BookingId) -> Result<Booking, Error> {
        self.booking_repo
            .find_by_id(id)
            .await
            .map_err(map_booking_repository_error)?
            .ok_or_else(|| Error::not_found(format!("booking {id} not found")))
    }

    /// Public lookup by token. Absence is an expected outcome.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<Booking>, Error> {
        let Ok(token) = BookingToken::new(token) else {
            return Ok(None);
        };
        self.booking_repo
            .find_by_token(&token)
            .await
            .map_err(map_booking_repository_error)
    }

    /// Bookings created by `creator`.
    pub async fn list_by_creator(&self, creator: &ActorId) -> Result<Vec<Booking>, Error> {
        self.booking_repo
            .find_all_by_creator(creator)
            .await
            .map_err(map_booking_repository_error)
    }

    /// Every booking.
    pub async fn list_all(&self) -> Result<Vec<Booking>, Error> {
        self.booking_repo
            .find_all()
            .await
            .map_err(map_booking_repository_error)
    }

    /// Bookings in a municipality.
    pub async fn list_by_municipality(
        &self,
        municipality: &Municipality,
    ) -> Result<Vec<Booking>, Error> {
        info!(municipality = %municipality, "bookings requested for municipality");
        self.booking_repo
            .find_by_municipality(municipality)
            .await
            .map_err(map_booking_repository_error)
    }

    /// Bookings in a district.
    pub async fn list_by_district(&self, district: &str) -> Result<Vec<Booking>, Error> {
        info!(district, "bookings requested for district");
        self.booking_repo
            .find_by_district(district)
            .await
            .map_err(map_booking_repository_error)
    }

    /// Slots still free for a municipality on a date.
    pub async fn available_slots(
        &self,
        municipality: &Municipality,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, Error> {
        let bookings = self
            .booking_repo
            .find_by_municipality_and_date(municipality, date)
            .await
            .map_err(map_booking_repository_error)?;
        Ok(slots::available_slots(
            self.policy.hours(),
            municipality,
            date,
            &bookings,
        ))
    }

    /// Transition history of an existing booking, oldest first.
    pub async fn history(&self, id: BookingId) -> Result<Vec<HistoryRecord>, Error> {
        let booking = self.get(id).await?;
        self.ledger
            .list_for_booking(booking.id())
            .await
            .map_err(map_history_read_error)
    }
}

#[cfg(test)]
#[path = "booking_service_tests.rs"]
mod tests;
