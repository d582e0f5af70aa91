//! Daily capacity cap per municipality.
//!
//! The guard itself is a pure decision over a count. Stores evaluate it while
//! holding whatever lock makes count-then-insert atomic for the
//! `(municipality, date)` pair.

use chrono::NaiveDate;

use super::Municipality;

/// Default maximum number of live bookings per municipality per day.
pub const DEFAULT_DAILY_CAP: u32 = 10;

/// Rejection produced when a municipality has no capacity left on a date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("daily capacity reached for {municipality}")]
pub struct CapacityRejection {
    /// Municipality that is full.
    pub municipality: Municipality,
    /// Date that is full.
    pub date: NaiveDate,
    /// Count observed when the decision was taken.
    pub current: u64,
    /// Configured cap.
    pub daily_cap: u32,
}

/// Immutable daily cap, uniform across municipalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityGuard {
    daily_cap: u32,
}

impl CapacityGuard {
    /// Build a guard enforcing `daily_cap` bookings per municipality and date.
    pub const fn new(daily_cap: u32) -> Self {
        Self { daily_cap }
    }

    /// Configured cap.
    pub const fn daily_cap(&self) -> u32 {
        self.daily_cap
    }

    /// Accept when `current_count` is below the cap.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use municipal_bookings::domain::{CapacityGuard, Municipality};
    ///
    /// let guard = CapacityGuard::new(2);
    /// let lisbon = Municipality::new("Lisbon").expect("valid municipality");
    /// let date = NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date");
    /// assert!(guard.check(&lisbon, date, 1).is_ok());
    /// assert!(guard.check(&lisbon, date, 2).is_err());
    /// ```
    pub fn check(
        &self,
        municipality: &Municipality,
        date: NaiveDate,
        current_count: u64,
    ) -> Result<(), CapacityRejection> {
        if current_count >= u64::from(self.daily_cap) {
            return Err(CapacityRejection {
                municipality: municipality.clone(),
                date,
                current: current_count,
                daily_cap: self.daily_cap,
            });
        }
        Ok(())
    }
}

impl Default for CapacityGuard {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_CAP)
    }
}
