//! PostgreSQL-backed `BookingRepository` adapter.
//!
//! Capacity-checked inserts run inside a transaction that first takes a
//! transaction-scoped advisory lock keyed on `municipality|date`, so two
//! creates for the same pair serialise while other pairs proceed in
//! parallel. A transition is a conditional `UPDATE` plus the history
//! `INSERT`, committed in one transaction.

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{BookingRepository, BookingRepositoryError, CapacityOutcome};
use crate::domain::{
    ActorId, Booking, BookingId, BookingState, BookingToken, CapacityGuard, HistoryRecord,
    Municipality, NewBooking,
};

use super::error_mapping::{map_diesel_failure, map_pool_failure};
use super::models::{BookingRow, NewBookingRow, NewHistoryRow};
use super::pool::{DbPool, PoolError};
use super::schema::{booking_state_history, bookings};

const CAPACITY_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";

/// Diesel-backed implementation of the booking store port.
#[derive(Clone)]
pub struct DieselBookingRepository {
    pool: DbPool,
}

impl DieselBookingRepository {
    /// Create a repository over an existing pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: &PoolError) -> BookingRepositoryError {
    map_pool_failure(error, BookingRepositoryError::connection)
}

fn map_diesel_error(error: &diesel::result::Error) -> BookingRepositoryError {
    map_diesel_failure(
        error,
        BookingRepositoryError::query,
        BookingRepositoryError::connection,
    )
}

/// Ways a transition transaction can end without committing.
#[derive(Debug)]
enum TransitionAbort {
    Database(diesel::result::Error),
    History(diesel::result::Error),
    Conflict,
    Missing,
}

impl From<diesel::result::Error> for TransitionAbort {
    fn from(error: diesel::result::Error) -> Self {
        Self::Database(error)
    }
}

fn map_transition_abort(abort: &TransitionAbort, id: BookingId) -> BookingRepositoryError {
    match abort {
        TransitionAbort::Database(error) => map_diesel_error(error),
        TransitionAbort::History(error) => {
            let cause = map_diesel_error(error);
            BookingRepositoryError::history_write(id.get(), cause.to_string())
        }
        TransitionAbort::Conflict => BookingRepositoryError::conflict(id.get()),
        TransitionAbort::Missing => BookingRepositoryError::missing(id.get()),
    }
}

/// Advisory lock key for a `(municipality, date)` pair.
fn capacity_lock_key(municipality: &Municipality, date: NaiveDate) -> String {
    format!("bookings:{municipality}|{date}")
}

fn row_to_booking(row: BookingRow) -> Result<Booking, BookingRepositoryError> {
    let BookingRow {
        id,
        municipality,
        village,
        district,
        postal_code,
        booking_date,
        booking_time,
        description,
        token,
        state,
        created_by,
    } = row;

    let corrupt = |field: &str, err: &dyn std::fmt::Display| {
        BookingRepositoryError::query(format!("booking {id} has invalid {field}: {err}"))
    };

    let draft = NewBooking {
        municipality: Municipality::new(municipality).map_err(|err| corrupt("municipality", &err))?,
        village,
        district,
        postal_code,
        date: booking_date,
        time: booking_time,
        description,
        token: BookingToken::new(token).map_err(|err| corrupt("token", &err))?,
        state: state
            .parse::<BookingState>()
            .map_err(|err| corrupt("state", &err))?,
        created_by: ActorId::new(created_by).map_err(|err| corrupt("creator", &err))?,
    };

    Ok(Booking::new(BookingId::new(id), draft))
}

fn rows_to_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, BookingRepositoryError> {
    rows.into_iter().map(row_to_booking).collect()
}

fn insertable(booking: &NewBooking) -> NewBookingRow<'_> {
    NewBookingRow {
        municipality: booking.municipality.as_ref(),
        village: booking.village.as_deref(),
        district: booking.district.as_deref(),
        postal_code: booking.postal_code.as_deref(),
        booking_date: booking.date,
        booking_time: booking.time,
        description: booking.description.as_str(),
        token: booking.token.as_ref(),
        state: booking.state.as_str(),
        created_by: booking.created_by.as_ref(),
    }
}

fn history_insertable(record: &HistoryRecord) -> NewHistoryRow<'_> {
    NewHistoryRow {
        booking_id: record.booking_id().get(),
        state: record.state().as_str(),
        changed_at: record.changed_at(),
        changed_by: record.changed_by().as_ref(),
    }
}

#[async_trait]
impl BookingRepository for DieselBookingRepository {
    async fn insert_within_capacity(
        &self,
        booking: NewBooking,
        guard: CapacityGuard,
    ) -> Result<CapacityOutcome, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;
        let lock_key = capacity_lock_key(&booking.municipality, booking.date);

        let decision = conn
            .transaction(|conn| {
                async move {
                    diesel::sql_query(CAPACITY_LOCK_SQL)
                        .bind::<Text, _>(lock_key.as_str())
                        .execute(conn)
                        .await?;

                    let current: i64 = bookings::table
                        .filter(bookings::municipality.eq(booking.municipality.as_ref()))
                        .filter(bookings::booking_date.eq(booking.date))
                        .filter(bookings::state.ne(BookingState::Canceled.as_str()))
                        .count()
                        .get_result(conn)
                        .await?;
                    let current = u64::try_from(current).unwrap_or_default();

                    if let Err(rejection) = guard.check(&booking.municipality, booking.date, current)
                    {
                        return Ok(Err(rejection));
                    }

                    let row = diesel::insert_into(bookings::table)
                        .values(insertable(&booking))
                        .returning(BookingRow::as_returning())
                        .get_result::<BookingRow>(conn)
                        .await?;
                    Ok::<_, diesel::result::Error>(Ok(row))
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(&err))?;

        match decision {
            Ok(row) => row_to_booking(row).map(CapacityOutcome::Inserted),
            Err(rejection) => {
                debug!(
                    municipality = %rejection.municipality,
                    date = %rejection.date,
                    current = rejection.current,
                    "capacity guard rejected insert"
                );
                Ok(CapacityOutcome::Rejected(rejection))
            }
        }
    }

    async fn transition(
        &self,
        expected: BookingState,
        record: HistoryRecord,
    ) -> Result<Booking, BookingRepositoryError> {
        let id = record.booking_id();
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;

        let row = conn
            .transaction(|conn| {
                async move {
                    let updated = diesel::update(
                        bookings::table
                            .filter(bookings::id.eq(id.get()))
                            .filter(bookings::state.eq(expected.as_str())),
                    )
                    .set(bookings::state.eq(record.state().as_str()))
                    .returning(BookingRow::as_returning())
                    .get_result::<BookingRow>(conn)
                    .await
                    .optional()?;

                    let Some(row) = updated else {
                        let exists: bool = diesel::select(diesel::dsl::exists(
                            bookings::table.filter(bookings::id.eq(id.get())),
                        ))
                        .get_result(conn)
                        .await?;
                        return Err(if exists {
                            TransitionAbort::Conflict
                        } else {
                            TransitionAbort::Missing
                        });
                    };

                    diesel::insert_into(booking_state_history::table)
                        .values(history_insertable(&record))
                        .execute(conn)
                        .await
                        .map_err(TransitionAbort::History)?;

                    Ok::<_, TransitionAbort>(row)
                }
                .scope_boxed()
            })
            .await
            .map_err(|abort| map_transition_abort(&abort, id))?;

        row_to_booking(row)
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;

        let row = bookings::table
            .filter(bookings::id.eq(id.get()))
            .select(BookingRow::as_select())
            .first::<BookingRow>(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(&err))?;

        row.map(row_to_booking).transpose()
    }

    async fn find_by_token(
        &self,
        token: &BookingToken,
    ) -> Result<Option<Booking>, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;

        let row = bookings::table
            .filter(bookings::token.eq(token.as_ref()))
            .select(BookingRow::as_select())
            .first::<BookingRow>(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(&err))?;

        row.map(row_to_booking).transpose()
    }

    async fn find_all_by_creator(
        &self,
        creator: &ActorId,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;

        let rows = bookings::table
            .filter(bookings::created_by.eq(creator.as_ref()))
            .order(bookings::id.asc())
            .select(BookingRow::as_select())
            .load::<BookingRow>(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;

        rows_to_bookings(rows)
    }

    async fn count_by_municipality_and_date(
        &self,
        municipality: &Municipality,
        date: NaiveDate,
    ) -> Result<u64, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;

        let count: i64 = bookings::table
            .filter(bookings::municipality.eq(municipality.as_ref()))
            .filter(bookings::booking_date.eq(date))
            .filter(bookings::state.ne(BookingState::Canceled.as_str()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn find_by_municipality_and_date(
        &self,
        municipality: &Municipality,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;

        let rows = bookings::table
            .filter(bookings::municipality.eq(municipality.as_ref()))
            .filter(bookings::booking_date.eq(date))
            .order((bookings::booking_time.asc(), bookings::id.asc()))
            .select(BookingRow::as_select())
            .load::<BookingRow>(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;

        rows_to_bookings(rows)
    }

    async fn find_by_municipality(
        &self,
        municipality: &Municipality,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;

        let rows = bookings::table
            .filter(bookings::municipality.eq(municipality.as_ref()))
            .order(bookings::id.asc())
            .select(BookingRow::as_select())
            .load::<BookingRow>(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;

        rows_to_bookings(rows)
    }

    async fn find_by_district(
        &self,
        district: &str,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;

        let rows = bookings::table
            .filter(bookings::district.eq(district))
            .order(bookings::id.asc())
            .select(BookingRow::as_select())
            .load::<BookingRow>(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;

        rows_to_bookings(rows)
    }

    async fn find_all(&self) -> Result<Vec<Booking>, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;

        let rows = bookings::table
            .order(bookings::id.asc())
            .select(BookingRow::as_select())
            .load::<BookingRow>(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;

        rows_to_bookings(rows)
    }
}
