//! Repository implementation for users.

use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::warn;
use std::sync::Arc;

use curator_core::users::{User, UserRepositoryTrait};
use curator_core::Result;

use super::model::UserDB;
use crate::db::get_connection;
use crate::errors::StorageError;
use crate::schema::users;

/// Read-only access to the platform's user table.
pub struct UserRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
}

impl UserRepository {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        Self { pool }
    }
}

impl UserRepositoryTrait for UserRepository {
    fn list_users(&self) -> Result<Vec<User>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = users::table
            .order(users::created_at.asc())
            .select(UserDB::as_select())
            .load::<UserDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                match User::try_from(row) {
                    Ok(user) => Some(user),
                    Err(e) => {
                        warn!("Skipping unreadable user row {}: {}", id, e);
                        None
                    }
                }
            })
            .collect())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let mut conn = get_connection(&self.pool)?;
        let row = users::table
            .find(id)
            .select(UserDB::as_select())
            .first::<UserDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(User::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations};
    use chrono::NaiveDate;
    use curator_core::users::{CuratorProfile, CuratorStatus, UserRole};
    use tempfile::tempdir;

    fn create_test_repository() -> (UserRepository, Arc<crate::DbPool>, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        (UserRepository::new(Arc::clone(&pool)), pool, temp_dir)
    }

    fn user(id: &str, day: u32, role: UserRole, curator: Option<CuratorProfile>) -> User {
        let ts = NaiveDate::from_ymd_opt(2024, 2, day)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: Some(id.to_uppercase()),
            role,
            curator,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn insert(pool: &crate::DbPool, row: UserDB) {
        let mut conn = get_connection(pool).expect("Failed to get connection");
        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .expect("Failed to insert user");
    }

    #[test]
    fn test_list_and_get_users() {
        let (repo, pool, _temp_dir) = create_test_repository();
        let curator = user(
            "cur",
            2,
            UserRole::User,
            Some(CuratorProfile {
                status: CuratorStatus::Suspicious,
                credits: 12,
                accepted: 3,
                declined: 4,
                playlist_ids: vec!["pl-9".to_string(), "pl-2".to_string()],
            }),
        );
        let admin = user("boss", 1, UserRole::Admin, None);
        insert(&pool, UserDB::from(&curator));
        insert(&pool, UserDB::from(&admin));

        let listed = repo.list_users().unwrap();
        assert_eq!(listed, vec![admin.clone(), curator.clone()]);

        assert_eq!(repo.get_user("cur").unwrap(), Some(curator));
        assert_eq!(repo.get_user("nobody").unwrap(), None);
    }

    #[test]
    fn test_unreadable_rows_are_skipped_in_listing() {
        let (repo, pool, _temp_dir) = create_test_repository();
        insert(&pool, UserDB::from(&user("ok", 1, UserRole::User, None)));
        let mut bad = UserDB::from(&user("bad", 2, UserRole::User, None));
        bad.role = "superuser".to_string();
        insert(&pool, bad);

        let ids: Vec<String> = repo.list_users().unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec!["ok"]);
        assert!(repo.get_user("bad").is_err());
    }
}
