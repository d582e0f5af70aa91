//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Citizen bookings.
    ///
    /// `token` carries a unique constraint; `state` is checked against the
    /// five lifecycle names.
    bookings (id) {
        /// Primary key assigned on insert.
        id -> Int8,
        /// Municipality the booking counts against.
        municipality -> Varchar,
        /// Optional village or parish.
        village -> Nullable<Varchar>,
        /// Optional district.
        district -> Nullable<Varchar>,
        /// Optional postal code.
        postal_code -> Nullable<Varchar>,
        /// Collection date.
        booking_date -> Date,
        /// Collection time of day.
        booking_time -> Time,
        /// Free-text description.
        description -> Text,
        /// Public lookup token.
        token -> Varchar,
        /// Lifecycle state in wire form (`IN_PROGRESS`, ...).
        state -> Varchar,
        /// Identity of the requesting citizen.
        created_by -> Varchar,
        /// Insert timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only transition audit. A trigger rejects UPDATE and DELETE.
    booking_state_history (id) {
        /// Surrogate key; breaks timestamp ties in append order.
        id -> Int8,
        /// Booking the transition belongs to.
        booking_id -> Int8,
        /// State entered.
        state -> Varchar,
        /// When the transition was accepted.
        changed_at -> Timestamptz,
        /// Actor the transition is attributed to.
        changed_by -> Varchar,
    }
}

diesel::joinable!(booking_state_history -> bookings (booking_id));

diesel::allow_tables_to_appear_in_same_query!(bookings, booking_state_history);
