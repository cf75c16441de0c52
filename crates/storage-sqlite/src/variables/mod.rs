//! SQLite storage for the taxonomy variables.

mod model;
mod repository;

pub use model::{StoreStateDB, VariableOptionDB};
pub use repository::VariableRepository;
