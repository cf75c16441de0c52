//! SQLite storage implementation for the curator platform admin backend.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `curator-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for the variables taxonomy and user records
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! `core` is database-agnostic and works with traits.
//!
//! ```text
//!        core (domain)
//!              │
//!              ▼
//!   storage-sqlite (this crate)
//!              │
//!              ▼
//!          SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod users;
pub mod variables;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::StorageError;

pub use users::UserRepository;
pub use variables::VariableRepository;

// Re-export from curator-core for convenience
pub use curator_core::errors::{DatabaseError, Error, Result};
