//! Curator Core - Domain entities, services, and traits.
//!
//! This crate contains the business logic of the curator platform admin
//! backend: the taxonomy variables (genres, subgenres, moods, eras) and the
//! read-side user/curator records. It is database-agnostic and defines traits
//! that are implemented by the `storage-sqlite` crate.

pub mod errors;
pub mod users;
pub mod variables;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
