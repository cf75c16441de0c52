//! SQLite storage for user and curator records.

mod model;
mod repository;

pub use model::UserDB;
pub use repository::UserRepository;
