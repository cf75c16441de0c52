//! Domain models for platform users and curator profiles.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown user role '{}'",
                other
            ))),
        }
    }
}

/// Review state of a curator account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CuratorStatus {
    Unverified,
    Verified,
    Declined,
    Suspicious,
    Blocked,
}

impl CuratorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CuratorStatus::Unverified => "unverified",
            CuratorStatus::Verified => "verified",
            CuratorStatus::Declined => "declined",
            CuratorStatus::Suspicious => "suspicious",
            CuratorStatus::Blocked => "blocked",
        }
    }
}

impl FromStr for CuratorStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unverified" => Ok(CuratorStatus::Unverified),
            "verified" => Ok(CuratorStatus::Verified),
            "declined" => Ok(CuratorStatus::Declined),
            "suspicious" => Ok(CuratorStatus::Suspicious),
            "blocked" => Ok(CuratorStatus::Blocked),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown curator status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratorProfile {
    pub status: CuratorStatus,
    pub credits: i64,
    /// Pitches this curator accepted.
    pub accepted: i64,
    /// Pitches this curator declined.
    pub declined: i64,
    pub playlist_ids: Vec<String>,
}

impl CuratorProfile {
    /// Share of decided pitches that were accepted, as a rounded percentage.
    pub fn curator_score(&self) -> u32 {
        let decided = self.accepted + self.declined;
        if decided <= 0 {
            return 0;
        }
        (100.0 * self.accepted as f64 / decided as f64).round() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub curator: Option<CuratorProfile>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Checks the invariants every stored user record must hold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let broken = |reason: &str| ValidationError::InvariantViolated {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingField("email".to_string()));
        }
        if self.updated_at < self.created_at {
            return Err(broken("updatedAt is earlier than createdAt"));
        }
        if let Some(curator) = &self.curator {
            if curator.credits < 0 {
                return Err(broken("credits must not be negative"));
            }
            if curator.accepted < 0 || curator.declined < 0 {
                return Err(broken("decision counts must not be negative"));
            }
        }
        Ok(())
    }
}

/// A curator row for the admin tables: the user plus the derived score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratorView {
    #[serde(flatten)]
    pub user: User,
    pub curator_score: u32,
}
