//! Booking lifecycle states and the transition table.
//!
//! The table is a pure total function of `(current, requested)`. It knows
//! nothing about who asks for the change; authorisation belongs to whatever
//! layer invokes the lifecycle service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a booking.
///
/// ```text
/// RECEIVED    -> ASSIGNED, CANCELED
/// ASSIGNED    -> IN_PROGRESS, CANCELED
/// IN_PROGRESS -> DONE, CANCELED
/// DONE        -> (terminal)
/// CANCELED    -> (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingState {
    /// Submitted by a citizen and awaiting staff.
    Received,
    /// Staff have taken ownership.
    Assigned,
    /// Collection is under way.
    InProgress,
    /// Completed.
    Done,
    /// Withdrawn before completion.
    Canceled,
}

impl BookingState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Received,
        Self::Assigned,
        Self::InProgress,
        Self::Done,
        Self::Canceled,
    ];

    /// States reachable in one step from `self`.
    pub const fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Received => &[Self::Assigned, Self::Canceled],
            Self::Assigned => &[Self::InProgress, Self::Canceled],
            Self::InProgress => &[Self::Done, Self::Canceled],
            Self::Done | Self::Canceled => &[],
        }
    }

    /// Whether the state has no outgoing transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Canceled)
    }

    /// Wire representation, e.g. `IN_PROGRESS`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::Assigned => "ASSIGNED",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Canceled => "CANCELED",
        }
    }
}

/// Return `true` when `to` is reachable from `from` in one step.
///
/// Same-state pairs are never legal transitions; the lifecycle service treats
/// them as no-ops before consulting this table.
///
/// # Examples
/// ```
/// use municipal_bookings::domain::{BookingState, is_legal_transition};
///
/// assert!(is_legal_transition(BookingState::Received, BookingState::Assigned));
/// assert!(!is_legal_transition(BookingState::Assigned, BookingState::Done));
/// ```
pub fn is_legal_transition(from: BookingState, to: BookingState) -> bool {
    from.allowed_next().contains(&to)
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`BookingState`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown booking state: {value}")]
pub struct ParseBookingStateError {
    value: String,
}

impl FromStr for BookingState {
    type Err = ParseBookingStateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalised)
            .ok_or_else(|| ParseBookingStateError {
                value: value.to_owned(),
            })
    }
}
