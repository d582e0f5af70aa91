//! Outbound adapters implementing the domain store ports.
//!
//! - **memory**: mutex-guarded maps for tests and single-process runs
//! - **persistence**: PostgreSQL repositories using Diesel
//!
//! Adapters translate between domain types and storage representations and
//! hold no business rules beyond the atomicity the ports require.

pub mod memory;
pub mod persistence;
