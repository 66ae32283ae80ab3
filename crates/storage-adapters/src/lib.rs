//! # storage-adapters
//!
//! Store implementations of the `domains` ports.
//!
//! - [`memory::MemoryStore`] is always compiled and backs tests and local runs.
//! - [`postgres::PgStore`] (feature `db-postgres`) is the production store.

pub mod feed;
pub mod memory;
#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use feed::ChangeHub;
pub use memory::MemoryStore;
#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
