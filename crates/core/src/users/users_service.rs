use log::warn;
use std::sync::Arc;

use crate::errors::DatabaseError;
use crate::Result;

use super::{CuratorView, User, UserRepositoryTrait, UserServiceTrait};

pub struct UserService {
    repository: Arc<dyn UserRepositoryTrait>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// Loads every user, dropping records that break the model invariants.
    fn load_valid(&self) -> Result<Vec<User>> {
        let users = self.repository.list_users()?;
        Ok(users
            .into_iter()
            .filter(|user| match user.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Skipping user record {}: {}", user.id, e);
                    false
                }
            })
            .collect())
    }
}

impl UserServiceTrait for UserService {
    fn get_all_users(&self) -> Result<Vec<User>> {
        self.load_valid()
    }

    fn get_admin_users(&self) -> Result<Vec<User>> {
        Ok(self
            .load_valid()?
            .into_iter()
            .filter(User::is_admin)
            .collect())
    }

    fn get_curators(&self) -> Result<Vec<CuratorView>> {
        Ok(self
            .load_valid()?
            .into_iter()
            .filter_map(|user| {
                let curator_score = user.curator.as_ref()?.curator_score();
                Some(CuratorView {
                    user,
                    curator_score,
                })
            })
            .collect())
    }

    fn get_user(&self, id: &str) -> Result<User> {
        let user = self
            .repository
            .get_user(id)?
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        user.validate()?;
        Ok(user)
    }
}
