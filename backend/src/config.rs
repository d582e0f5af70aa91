//! Booking settings loaded via OrthoConfig.
//!
//! Values come from `BOOKINGS_*` environment variables, command-line flags or
//! a configuration file. Every field is optional; the accessors fall back to
//! the documented defaults.

use chrono::{NaiveTime, TimeDelta, Weekday};
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{
    BookingPolicy, CapacityGuard, DEFAULT_DAILY_CAP, ServiceHours, ServiceHoursError,
};

const DEFAULT_OPENING_TIME: &str = "08:00";
const DEFAULT_CLOSING_TIME: &str = "17:00";
const DEFAULT_SLOT_INTERVAL_MINUTES: i64 = 60;
const DEFAULT_CLOSED_WEEKDAYS: &str = "sat,sun";

/// Errors raised when settings cannot be turned into a [`BookingPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A time of day was not `HH:MM`.
    #[error("{field} must be HH:MM, got {value:?}")]
    InvalidTime {
        /// Setting name.
        field: &'static str,
        /// Rejected value.
        value: String,
    },
    /// A weekday name was not recognised.
    #[error("unknown weekday {value:?} in closed_weekdays")]
    InvalidWeekday {
        /// Rejected value.
        value: String,
    },
    /// The daily cap was zero.
    #[error("daily_cap must be at least 1")]
    ZeroCapacity,
    /// The service window was inconsistent.
    #[error(transparent)]
    Hours(#[from] ServiceHoursError),
}

/// Operator-tunable booking rules.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "BOOKINGS")]
pub struct BookingSettings {
    /// Maximum live bookings per municipality and day.
    pub daily_cap: Option<u32>,
    /// First bookable time, `HH:MM`.
    pub opening_time: Option<String>,
    /// Last bookable time, `HH:MM`, inclusive.
    pub closing_time: Option<String>,
    /// Distance between slots in minutes.
    pub slot_interval_minutes: Option<i64>,
    /// Comma-separated weekdays without service, e.g. `sat,sun`.
    pub closed_weekdays: Option<String>,
    /// PostgreSQL URL for the persistence adapters.
    pub database_url: Option<String>,
}

impl BookingSettings {
    /// Configured daily cap, falling back to the default.
    pub fn daily_cap(&self) -> u32 {
        self.daily_cap.unwrap_or(DEFAULT_DAILY_CAP)
    }

    /// Configured database URL, if any.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    /// Build the immutable policy the lifecycle service enforces.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when a time, weekday, interval or cap is
    /// malformed.
    pub fn policy(&self) -> Result<BookingPolicy, SettingsError> {
        let open = parse_time(
            "opening_time",
            self.opening_time.as_deref().unwrap_or(DEFAULT_OPENING_TIME),
        )?;
        let close = parse_time(
            "closing_time",
            self.closing_time.as_deref().unwrap_or(DEFAULT_CLOSING_TIME),
        )?;
        let interval = TimeDelta::minutes(
            self.slot_interval_minutes
                .unwrap_or(DEFAULT_SLOT_INTERVAL_MINUTES),
        );
        let hours = ServiceHours::new(open, close, interval)?;

        let closed_days = parse_weekdays(
            self.closed_weekdays
                .as_deref()
                .unwrap_or(DEFAULT_CLOSED_WEEKDAYS),
        )?;

        let daily_cap = self.daily_cap();
        if daily_cap == 0 {
            return Err(SettingsError::ZeroCapacity);
        }

        Ok(BookingPolicy::new(
            hours,
            closed_days,
            CapacityGuard::new(daily_cap),
        ))
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, SettingsError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| SettingsError::InvalidTime {
        field,
        value: value.to_owned(),
    })
}

fn parse_weekdays(value: &str) -> Result<Vec<Weekday>, SettingsError> {
    let mut days = Vec::new();
    for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        let day = name
            .parse::<Weekday>()
            .map_err(|_| SettingsError::InvalidWeekday {
                value: name.to_owned(),
            })?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}
