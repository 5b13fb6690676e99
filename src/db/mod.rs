//! Database layer
//!
//! Database abstraction for the Quillpress blog server. Supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The driver is selected from configuration; everything above this layer
//! works against the `DatabasePool` trait and the repository traits in
//! [`repositories`] without knowing which backend is active.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool};
