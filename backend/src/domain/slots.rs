//! Slot calendar: bookable times of day and which of them remain free.
//!
//! Everything here is a pure function of its inputs.

use std::collections::HashSet;
use std::iter::FusedIterator;

use chrono::{NaiveDate, NaiveTime, TimeDelta};

use super::{Booking, BookingState, Municipality};

/// Errors raised when constructing [`ServiceHours`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceHoursError {
    /// The window closes before it opens.
    #[error("service hours close at {close} before opening at {open}")]
    ClosesBeforeOpening {
        /// Opening time.
        open: NaiveTime,
        /// Closing time.
        close: NaiveTime,
    },
    /// The slot interval is zero or negative.
    #[error("slot interval must be positive")]
    NonPositiveInterval,
}

/// Daily service window, inclusive of both bounds, split at a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceHours {
    open: NaiveTime,
    close: NaiveTime,
    interval: TimeDelta,
}

impl ServiceHours {
    /// Validate and build a service window.
    pub fn new(
        open: NaiveTime,
        close: NaiveTime,
        interval: TimeDelta,
    ) -> Result<Self, ServiceHoursError> {
        if close < open {
            return Err(ServiceHoursError::ClosesBeforeOpening { open, close });
        }
        if interval <= TimeDelta::zero() {
            return Err(ServiceHoursError::NonPositiveInterval);
        }
        Ok(Self {
            open,
            close,
            interval,
        })
    }

    /// Opening time.
    pub fn open(&self) -> NaiveTime {
        self.open
    }

    /// Closing time.
    pub fn close(&self) -> NaiveTime {
        self.close
    }

    /// Distance between consecutive slots.
    pub fn interval(&self) -> TimeDelta {
        self.interval
    }

    /// Whether `time` falls inside the window, bounds included.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.open <= time && time <= self.close
    }

    /// Candidate slot start times for one day.
    pub fn slots(&self) -> Slots {
        Slots {
            next: Some(self.open),
            close: self.close,
            interval: self.interval,
        }
    }
}

impl Default for ServiceHours {
    /// 08:00 to 17:00, hourly.
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            interval: TimeDelta::hours(1),
        }
    }
}

/// Iterator over slot start times. Cloning restarts from the current position.
#[derive(Debug, Clone)]
pub struct Slots {
    next: Option<NaiveTime>,
    close: NaiveTime,
    interval: TimeDelta,
}

impl Iterator for Slots {
    type Item = NaiveTime;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|time| *time <= self.close)?;
        let (following, wrapped_seconds) = current.overflowing_add_signed(self.interval);
        // A wrap past midnight ends the day.
        self.next = (wrapped_seconds == 0 && following > current).then_some(following);
        Some(current)
    }
}

impl FusedIterator for Slots {}

/// Slot start times from `open` to `close` inclusive, stepping by `interval`.
///
/// # Examples
/// ```
/// use chrono::{NaiveTime, TimeDelta};
/// use municipal_bookings::domain::list_slots;
///
/// let open = NaiveTime::from_hms_opt(8, 0, 0).expect("valid time");
/// let close = NaiveTime::from_hms_opt(10, 0, 0).expect("valid time");
/// let slots: Vec<_> = list_slots(open, close, TimeDelta::hours(1))
///     .expect("valid window")
///     .collect();
/// assert_eq!(slots.len(), 3);
/// ```
pub fn list_slots(
    open: NaiveTime,
    close: NaiveTime,
    interval: TimeDelta,
) -> Result<Slots, ServiceHoursError> {
    ServiceHours::new(open, close, interval).map(|hours| hours.slots())
}

/// Slots for `municipality` on `date` not taken by a live booking.
///
/// Bookings for other municipalities or dates, and canceled bookings, do not
/// occupy a slot.
pub fn available_slots(
    hours: &ServiceHours,
    municipality: &Municipality,
    date: NaiveDate,
    bookings: &[Booking],
) -> Vec<NaiveTime> {
    let occupied: HashSet<NaiveTime> = bookings
        .iter()
        .filter(|booking| {
            booking.municipality() == municipality
                && booking.date() == date
                && booking.state() != BookingState::Canceled
        })
        .map(Booking::time)
        .collect();

    hours
        .slots()
        .filter(|slot| !occupied.contains(slot))
        .collect()
}
