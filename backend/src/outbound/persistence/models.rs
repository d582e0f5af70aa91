//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;

use super::schema::{booking_state_history, bookings};

/// Row struct for reading from the bookings table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BookingRow {
    pub id: i64,
    pub municipality: String,
    pub village: Option<String>,
    pub district: Option<String>,
    pub postal_code: Option<String>,
    pub booking_date: NaiveDate,
    pub booking_time: NaiveTime,
    pub description: String,
    pub token: String,
    pub state: String,
    pub created_by: String,
}

/// Insertable struct for creating booking records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub(crate) struct NewBookingRow<'a> {
    pub municipality: &'a str,
    pub village: Option<&'a str>,
    pub district: Option<&'a str>,
    pub postal_code: Option<&'a str>,
    pub booking_date: NaiveDate,
    pub booking_time: NaiveTime,
    pub description: &'a str,
    pub token: &'a str,
    pub state: &'a str,
    pub created_by: &'a str,
}

/// Row struct for reading from the booking_state_history table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = booking_state_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct HistoryRow {
    #[expect(dead_code, reason = "surrogate key only used for ordering in SQL")]
    pub id: i64,
    pub booking_id: i64,
    pub state: String,
    pub changed_at: DateTime<Utc>,
    pub changed_by: String,
}

/// Insertable struct for appending history records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = booking_state_history)]
pub(crate) struct NewHistoryRow<'a> {
    pub booking_id: i64,
    pub state: &'a str,
    pub changed_at: DateTime<Utc>,
    pub changed_by: &'a str,
}
