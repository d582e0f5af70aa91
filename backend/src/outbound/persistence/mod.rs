//! PostgreSQL adapters for the booking and history store ports.
//!
//! Built on Diesel with `diesel-async` connections pooled by `bb8`. Row
//! structs and table definitions stay private to this module; only the
//! repositories, the pool and the migration runner are exported.
//!
//! ```no_run
//! use municipal_bookings::outbound::persistence::{
//!     DbPool, DieselBookingRepository, DieselHistoryRepository, PoolConfig, run_migrations,
//! };
//!
//! # async fn wire() -> Result<(), Box<dyn std::error::Error>> {
//! let url = "postgres://localhost/bookings";
//! run_migrations(url)?;
//! let pool = DbPool::new(PoolConfig::new(url)).await?;
//! let bookings = DieselBookingRepository::new(pool.clone());
//! let history = DieselHistoryRepository::new(pool);
//! # let _ = (bookings, history);
//! # Ok(())
//! # }
//! ```

mod diesel_booking_repository;
mod diesel_history_repository;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_booking_repository::DieselBookingRepository;
pub use diesel_history_repository::DieselHistoryRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
