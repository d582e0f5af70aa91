//! Test utilities for the bookings crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Only compiled for tests or with the `test-support` feature.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::{Actor, ActorId, BookingRequest};

/// Clock pinned to an instant that tests can move forward.
///
/// `local()` reports the same wall-clock reading as `utc()` so date
/// arithmetic in tests does not depend on the host time zone.
pub struct FixtureClock(Mutex<DateTime<Utc>>);

impl FixtureClock {
    /// Clock reading `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Clock reading `hour:00` UTC on `date`.
    ///
    /// # Panics
    /// Panics when `hour` is not a valid hour of the day.
    pub fn on(date: NaiveDate, hour: u32) -> Self {
        let time = NaiveTime::from_hms_opt(hour, 0, 0)
            .unwrap_or_else(|| panic!("invalid fixture hour {hour}"));
        Self::new(Utc.from_utc_datetime(&date.and_time(time)))
    }

    /// Move the clock forward.
    pub fn advance(&self, delta: TimeDelta) {
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        let utc = *self.lock_clock();
        match Local.from_local_datetime(&utc.naive_utc()).earliest() {
            Some(local) => local,
            None => utc.with_timezone(&Local),
        }
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Citizen actor with the given identity.
///
/// # Panics
/// Panics when `id` is blank.
pub fn citizen(id: &str) -> Actor {
    Actor::citizen(ActorId::new(id).unwrap_or_else(|err| panic!("fixture actor: {err}")))
}

/// Staff actor with the given identity.
///
/// # Panics
/// Panics when `id` is blank.
pub fn staff(id: &str) -> Actor {
    Actor::staff(ActorId::new(id).unwrap_or_else(|err| panic!("fixture actor: {err}")))
}

/// Minimal valid request for `municipality` at `date` and `hour:00`.
///
/// # Panics
/// Panics when `hour` is not a valid hour of the day.
pub fn booking_request(municipality: &str, date: NaiveDate, hour: u32) -> BookingRequest {
    BookingRequest {
        municipality: municipality.to_owned(),
        village: None,
        district: None,
        postal_code: None,
        date,
        time: NaiveTime::from_hms_opt(hour, 0, 0)
            .unwrap_or_else(|| panic!("invalid fixture hour {hour}")),
        description: "old mattress".to_owned(),
    }
}
