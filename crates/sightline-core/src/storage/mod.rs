//! Storage layer
//!
//! Connection pool management for SQLite-backed deployments. The schema
//! behind a search view belongs to the host application; this layer only
//! opens and tends the pool the executor runs on.

pub mod database;

pub use database::{default_database_path, Database, DatabaseConfig};
