//! Users module - read-side user and curator records for the admin tables.

mod users_model;
mod users_service;
mod users_traits;

pub use users_model::{CuratorProfile, CuratorStatus, CuratorView, User, UserRole};
pub use users_service::UserService;
pub use users_traits::{UserRepositoryTrait, UserServiceTrait};
