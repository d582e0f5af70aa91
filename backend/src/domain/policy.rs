//! Scheduling policy applied to new booking requests.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

use super::{CapacityGuard, ServiceHours};

/// Reason a requested date and time cannot be booked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleViolation {
    /// The date is strictly before today.
    #[error("cannot book a past date")]
    PastDate,
    /// The time falls outside the service window.
    #[error("bookings are only allowed between {} and {}", .open.format("%H:%M"), .close.format("%H:%M"))]
    OutsideServiceHours {
        /// Opening time.
        open: NaiveTime,
        /// Closing time.
        close: NaiveTime,
    },
    /// The date falls on a non-operating weekday.
    #[error("bookings are not possible on {}", weekday_name(.weekday))]
    NonOperatingDay {
        /// The offending weekday.
        weekday: Weekday,
    },
}

const fn weekday_name(weekday: &Weekday) -> &'static str {
    match *weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Immutable configuration for the lifecycle service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingPolicy {
    hours: ServiceHours,
    closed_days: Vec<Weekday>,
    capacity: CapacityGuard,
}

impl BookingPolicy {
    /// Assemble a policy from its parts.
    pub fn new(hours: ServiceHours, closed_days: Vec<Weekday>, capacity: CapacityGuard) -> Self {
        Self {
            hours,
            closed_days,
            capacity,
        }
    }

    /// Service window and slot interval.
    pub fn hours(&self) -> &ServiceHours {
        &self.hours
    }

    /// Weekdays with no service.
    pub fn closed_days(&self) -> &[Weekday] {
        &self.closed_days
    }

    /// Daily capacity guard.
    pub fn capacity(&self) -> CapacityGuard {
        self.capacity
    }

    /// Replace the capacity guard.
    #[must_use]
    pub fn with_capacity(mut self, capacity: CapacityGuard) -> Self {
        self.capacity = capacity;
        self
    }

    /// Whether the service operates on `date`.
    pub fn is_operating_day(&self, date: NaiveDate) -> bool {
        !self.closed_days.contains(&date.weekday())
    }

    /// Check date and time, failing on the first violation.
    ///
    /// Order: past date, then service hours, then non-operating day.
    pub fn check_schedule(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        today: NaiveDate,
    ) -> Result<(), ScheduleViolation> {
        if date < today {
            return Err(ScheduleViolation::PastDate);
        }
        if !self.hours.contains(time) {
            return Err(ScheduleViolation::OutsideServiceHours {
                open: self.hours.open(),
                close: self.hours.close(),
            });
        }
        if !self.is_operating_day(date) {
            return Err(ScheduleViolation::NonOperatingDay {
                weekday: date.weekday(),
            });
        }
        Ok(())
    }
}

impl Default for BookingPolicy {
    /// Weekdays 08:00 to 17:00, hourly slots, ten bookings per day.
    fn default() -> Self {
        Self::new(
            ServiceHours::default(),
            vec![Weekday::Sat, Weekday::Sun],
            CapacityGuard::default(),
        )
    }
}
