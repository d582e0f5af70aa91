//! Booking entity and its identifiers.
//!
//! A booking is created once by the lifecycle service and afterwards only its
//! state changes. Identity fields (`id`, `token`, `created_by`) never change.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::BookingState;

/// Validation errors raised by the booking value constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingValidationError {
    /// Municipality was blank.
    #[error("municipality must not be empty")]
    EmptyMunicipality,
    /// Actor identity was blank.
    #[error("actor identity must not be empty")]
    EmptyActor,
    /// Token was blank.
    #[error("booking token must not be empty")]
    EmptyToken,
}

/// Store-assigned booking identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(i64);

impl BookingId {
    /// Wrap a raw identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque token used for unauthenticated lookup of a single booking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BookingToken(String);

impl BookingToken {
    /// Validate and wrap an existing token.
    pub fn new(token: impl Into<String>) -> Result<Self, BookingValidationError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(BookingValidationError::EmptyToken);
        }
        Ok(Self(token))
    }

    /// Generate a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl AsRef<str> for BookingToken {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for BookingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<BookingToken> for String {
    fn from(value: BookingToken) -> Self {
        value.0
    }
}

impl TryFrom<String> for BookingToken {
    type Error = BookingValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Name of the municipality a booking belongs to.
///
/// Stored trimmed; comparisons are exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Municipality(String);

impl Municipality {
    /// Validate and construct a municipality name.
    pub fn new(name: impl Into<String>) -> Result<Self, BookingValidationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(BookingValidationError::EmptyMunicipality);
        }
        if trimmed.len() == name.len() {
            return Ok(Self(name));
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for Municipality {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Municipality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Municipality> for String {
    fn from(value: Municipality) -> Self {
        value.0
    }
}

impl TryFrom<String> for Municipality {
    type Error = BookingValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Authenticated identity (typically an e-mail address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorId(String);

impl ActorId {
    /// Validate and construct an actor identity.
    pub fn new(id: impl Into<String>) -> Result<Self, BookingValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(BookingValidationError::EmptyActor);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for ActorId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ActorId> for String {
    fn from(value: ActorId) -> Self {
        value.0
    }
}

impl TryFrom<String> for ActorId {
    type Error = BookingValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Coarse role attached to an authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Member of the public requesting collections.
    Citizen,
    /// Municipal staff managing bookings.
    Staff,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Citizen => f.write_str("citizen"),
            Self::Staff => f.write_str("staff"),
        }
    }
}

/// Already-authenticated caller of a lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    id: ActorId,
    role: Role,
}

impl Actor {
    /// Pair an identity with its role.
    pub fn new(id: ActorId, role: Role) -> Self {
        Self { id, role }
    }

    /// Citizen actor.
    pub fn citizen(id: ActorId) -> Self {
        Self::new(id, Role::Citizen)
    }

    /// Staff actor.
    pub fn staff(id: ActorId) -> Self {
        Self::new(id, Role::Staff)
    }

    /// Identity attributed in history records.
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Coarse role classification.
    pub fn role(&self) -> Role {
        self.role
    }
}

/// Inbound payload for creating a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// Municipality the collection happens in.
    pub municipality: String,
    /// Optional village or parish.
    #[serde(default)]
    pub village: Option<String>,
    /// Optional district.
    #[serde(default)]
    pub district: Option<String>,
    /// Optional postal code.
    #[serde(default)]
    pub postal_code: Option<String>,
    /// Requested calendar date.
    pub date: NaiveDate,
    /// Requested time of day.
    pub time: NaiveTime,
    /// Free-text description of the items.
    #[serde(default)]
    pub description: String,
}

/// Booking contents before the store assigns an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    /// Municipality the booking counts against.
    pub municipality: Municipality,
    /// Optional village or parish.
    pub village: Option<String>,
    /// Optional district.
    pub district: Option<String>,
    /// Optional postal code.
    pub postal_code: Option<String>,
    /// Collection date.
    pub date: NaiveDate,
    /// Collection time of day.
    pub time: NaiveTime,
    /// Free-text description.
    pub description: String,
    /// Unique lookup token.
    pub token: BookingToken,
    /// Lifecycle state.
    pub state: BookingState,
    /// Identity of the requesting citizen.
    pub created_by: ActorId,
}

/// Persisted booking.
///
/// ## Invariants
/// - `id`, `token`, and `created_by` never change after creation.
/// - `state` only changes through the lifecycle service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    id: BookingId,
    municipality: Municipality,
    village: Option<String>,
    district: Option<String>,
    postal_code: Option<String>,
    date: NaiveDate,
    time: NaiveTime,
    description: String,
    token: BookingToken,
    state: BookingState,
    created_by: ActorId,
}

impl Booking {
    /// Attach a store-assigned identifier to new booking contents.
    pub fn new(id: BookingId, draft: NewBooking) -> Self {
        let NewBooking {
            municipality,
            village,
            district,
            postal_code,
            date,
            time,
            description,
            token,
            state,
            created_by,
        } = draft;
        Self {
            id,
            municipality,
            village,
            district,
            postal_code,
            date,
            time,
            description,
            token,
            state,
            created_by,
        }
    }

    /// Copy of this booking in `state`. Used by store adapters.
    #[must_use]
    pub fn with_state(mut self, state: BookingState) -> Self {
        self.state = state;
        self
    }

    /// Store-assigned identifier.
    pub fn id(&self) -> BookingId {
        self.id
    }

    /// Municipality the booking counts against.
    pub fn municipality(&self) -> &Municipality {
        &self.municipality
    }

    /// Optional village or parish.
    pub fn village(&self) -> Option<&str> {
        self.village.as_deref()
    }

    /// Optional district.
    pub fn district(&self) -> Option<&str> {
        self.district.as_deref()
    }

    /// Optional postal code.
    pub fn postal_code(&self) -> Option<&str> {
        self.postal_code.as_deref()
    }

    /// Collection date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Collection time of day.
    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// Free-text description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Unique lookup token.
    pub fn token(&self) -> &BookingToken {
        &self.token
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BookingState {
        self.state
    }

    /// Identity of the requesting citizen.
    pub fn created_by(&self) -> &ActorId {
        &self.created_by
    }
}
