//! Traits for user repository and service.

use crate::Result;

use super::{CuratorView, User};

/// Read access to user records. The admin backend never writes them.
pub trait UserRepositoryTrait: Send + Sync {
    fn list_users(&self) -> Result<Vec<User>>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
}

/// Service trait backing the admin user tables.
pub trait UserServiceTrait: Send + Sync {
    fn get_all_users(&self) -> Result<Vec<User>>;
    fn get_admin_users(&self) -> Result<Vec<User>>;
    fn get_curators(&self) -> Result<Vec<CuratorView>>;
    fn get_user(&self, id: &str) -> Result<User>;
}
