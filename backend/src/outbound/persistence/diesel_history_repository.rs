//! PostgreSQL-backed `HistoryRepository` adapter.
//!
//! The table rejects UPDATE and DELETE through a trigger, so this adapter only
//! ever inserts and selects.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{HistoryRepository, HistoryRepositoryError};
use crate::domain::{ActorId, BookingId, BookingState, HistoryRecord};

use super::error_mapping::{map_diesel_failure, map_pool_failure};
use super::models::{HistoryRow, NewHistoryRow};
use super::pool::{DbPool, PoolError};
use super::schema::booking_state_history;

/// Diesel-backed implementation of the history store port.
#[derive(Clone)]
pub struct DieselHistoryRepository {
    pool: DbPool,
}

impl DieselHistoryRepository {
    /// Create a repository over an existing pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: &PoolError) -> HistoryRepositoryError {
    map_pool_failure(error, HistoryRepositoryError::connection)
}

fn map_diesel_error(error: &diesel::result::Error) -> HistoryRepositoryError {
    map_diesel_failure(
        error,
        HistoryRepositoryError::query,
        HistoryRepositoryError::connection,
    )
}

fn row_to_record(row: HistoryRow) -> Result<HistoryRecord, HistoryRepositoryError> {
    let state = row.state.parse::<BookingState>().map_err(|err| {
        HistoryRepositoryError::query(format!(
            "history for booking {} has invalid state: {err}",
            row.booking_id
        ))
    })?;
    let changed_by = ActorId::new(row.changed_by).map_err(|err| {
        HistoryRepositoryError::query(format!(
            "history for booking {} has invalid actor: {err}",
            row.booking_id
        ))
    })?;

    Ok(HistoryRecord::new(
        BookingId::new(row.booking_id),
        state,
        changed_by,
        row.changed_at,
    ))
}

#[async_trait]
impl HistoryRepository for DieselHistoryRepository {
    async fn append(&self, record: &HistoryRecord) -> Result<(), HistoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;

        let row = NewHistoryRow {
            booking_id: record.booking_id().get(),
            state: record.state().as_str(),
            changed_at: record.changed_at(),
            changed_by: record.changed_by().as_ref(),
        };

        diesel::insert_into(booking_state_history::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;

        Ok(())
    }

    async fn find_by_booking_id_ordered(
        &self,
        booking_id: BookingId,
    ) -> Result<Vec<HistoryRecord>, HistoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| map_pool_error(&err))?;

        let rows = booking_state_history::table
            .filter(booking_state_history::booking_id.eq(booking_id.get()))
            .order((
                booking_state_history::changed_at.asc(),
                booking_state_history::id.asc(),
            ))
            .select(HistoryRow::as_select())
            .load::<HistoryRow>(&mut conn)
            .await
            .map_err(|err| map_diesel_error(&err))?;

        rows.into_iter().map(row_to_record).collect()
    }
}
