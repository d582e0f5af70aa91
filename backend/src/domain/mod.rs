//! Booking lifecycle domain.
//!
//! Purpose: define the booking entity, its state machine, the scheduling and
//! capacity rules applied at creation, and the audit ledger. Types here are
//! transport agnostic and free of persistence concerns; stores are reached
//! only through [`ports`].
//!
//! Public surface:
//! - [`BookingLifecycleService`]: create, cancel, transition, and read.
//! - [`BookingState`] and [`is_legal_transition`]: the transition table.
//! - [`ServiceHours`], [`list_slots`], [`available_slots`]: slot calendar.
//! - [`CapacityGuard`]: daily cap per municipality.
//! - [`HistoryLedger`] and [`HistoryRecord`]: the audit trail.
//! - [`Error`] and [`ErrorCode`]: failure taxonomy.

pub mod booking;
pub mod booking_service;
pub mod capacity;
pub mod error;
pub mod history;
pub mod policy;
pub mod ports;
pub mod slots;
pub mod state;

pub use self::booking::{
    Actor, ActorId, Booking, BookingId, BookingRequest, BookingToken, BookingValidationError,
    Municipality, NewBooking, Role,
};
pub use self::booking_service::BookingLifecycleService;
pub use self::capacity::{CapacityGuard, CapacityRejection, DEFAULT_DAILY_CAP};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::history::{HistoryLedger, HistoryRecord};
pub use self::policy::{BookingPolicy, ScheduleViolation};
pub use self::slots::{ServiceHours, ServiceHoursError, Slots, available_slots, list_slots};
pub use self::state::{BookingState, ParseBookingStateError, is_legal_transition};

/// Convenient domain result alias.
pub type DomainResult<T> = Result<T, Error>;
