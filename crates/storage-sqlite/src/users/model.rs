//! Database models for users.

use diesel::prelude::*;

use curator_core::errors::{Error, ValidationError};
use curator_core::users::{CuratorProfile, CuratorStatus, User, UserRole};

use crate::utils::{format_timestamp, parse_timestamp};

/// Database model for users
#[derive(Queryable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserDB {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub curator_status: Option<String>, // NULL when the user is not a curator
    pub credits: i64,
    pub accepted: i64,
    pub declined: i64,
    pub playlist_ids: String, // JSON array
    pub created_at: String,   // RFC3339
    pub updated_at: String,   // RFC3339
}

fn timestamp(id: &str, field: &str, raw: &str) -> Result<chrono::NaiveDateTime, Error> {
    parse_timestamp(raw).ok_or_else(|| {
        ValidationError::InvalidInput(format!("user {} has invalid {} '{}'", id, field, raw))
            .into()
    })
}

impl TryFrom<UserDB> for User {
    type Error = Error;

    fn try_from(db: UserDB) -> Result<Self, Self::Error> {
        let role: UserRole = db.role.parse()?;
        let curator = match db.curator_status.as_deref() {
            Some(status) => Some(CuratorProfile {
                status: status.parse::<CuratorStatus>()?,
                credits: db.credits,
                accepted: db.accepted,
                declined: db.declined,
                playlist_ids: serde_json::from_str(&db.playlist_ids)?,
            }),
            None => None,
        };

        Ok(User {
            created_at: timestamp(&db.id, "createdAt", &db.created_at)?,
            updated_at: timestamp(&db.id, "updatedAt", &db.updated_at)?,
            id: db.id,
            email: db.email,
            name: db.name,
            role,
            curator,
        })
    }
}

impl From<&User> for UserDB {
    fn from(user: &User) -> Self {
        let curator = user.curator.as_ref();
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.as_str().to_string(),
            curator_status: curator.map(|c| c.status.as_str().to_string()),
            credits: curator.map_or(0, |c| c.credits),
            accepted: curator.map_or(0, |c| c.accepted),
            declined: curator.map_or(0, |c| c.declined),
            playlist_ids: curator
                .and_then(|c| serde_json::to_string(&c.playlist_ids).ok())
                .unwrap_or_else(|| "[]".to_string()),
            created_at: format_timestamp(user.created_at),
            updated_at: format_timestamp(user.updated_at),
        }
    }
}
