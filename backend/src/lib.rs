//! Booking lifecycle engine for municipal bulky-item collection.
//!
//! Citizens request a collection slot; staff move the booking through
//! `RECEIVED → ASSIGNED → IN_PROGRESS → DONE`, or cancel it. The crate owns the
//! state machine, the per-municipality daily cap and the append-only audit
//! trail. Storage sits behind the ports in [`domain::ports`] with in-memory
//! and PostgreSQL adapters in [`outbound`].

pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
