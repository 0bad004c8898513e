//! SQLite storage implementation for taxonomies.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `taxonomies-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for terms, taxonomies and taxable links
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place where Diesel dependencies exist. The `core`
//! crate is database-agnostic and works with traits.
//!
//! ```text
//!          core (domain)
//!                │
//!                ▼
//!      storage-sqlite (this crate)
//!                │
//!                ▼
//!            SQLite DB
//! ```
//!
//! Reads borrow a pooled connection. Writes are sent to a single writer task
//! and each runs in its own `BEGIN IMMEDIATE` transaction, which makes every
//! find-or-create atomic.

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod taxables;
pub mod taxonomies;
pub mod terms;

mod setup;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use setup::{open, Repositories};

// Re-export from taxonomies-core for convenience
pub use taxonomies_core::errors::{DatabaseError, Error, Result};
