//! Translation of pool and Diesel failures into port errors.
//!
//! Both booking adapters share the same split: anything that means the
//! database is unreachable becomes a connection error, everything else a
//! query error. Driver details are logged at debug level and never leak into
//! the port error message.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Map a pool failure through the adapter's connection constructor.
pub(crate) fn map_pool_failure<E, C>(error: &PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    debug!(error = %error, "connection pool failure");
    connection(error.message().to_owned())
}

/// Map a Diesel failure through the adapter's query or connection constructor.
pub(crate) fn map_diesel_failure<E, Q, C>(error: &DieselError, query: Q, connection: C) -> E
where
    Q: FnOnce(&'static str) -> E,
    C: FnOnce(&'static str) -> E,
{
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(error = %other, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
        | DieselError::BrokenTransactionManager => connection("database connection error"),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            query("unique constraint violated")
        }
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, _) => {
            query("check constraint violated")
        }
        DieselError::NotFound => query("record not found"),
        DieselError::DeserializationError(_) => query("unreadable database row"),
        _ => query("database error"),
    }
}
