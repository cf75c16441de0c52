//! Database models for taxonomy variables.

use diesel::prelude::*;
use serde_json::{Map, Value};

use curator_core::errors::{Error, ValidationError};
use curator_core::variables::{Category, VariableOption};

use crate::errors::StorageError;

/// Database model for a variable option row
#[derive(Queryable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::variable_options)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct VariableOptionDB {
    pub category: String,
    pub id: String,
    pub label: String,
    pub parent_id: Option<String>,
    pub position: i64,
    pub extra: Option<String>, // JSON object, NULL when empty
}

impl VariableOptionDB {
    pub fn from_domain(option: &VariableOption, position: i64) -> Result<Self, StorageError> {
        Ok(Self {
            category: option.category.as_str().to_string(),
            id: option.id.clone(),
            label: option.label.clone(),
            parent_id: option.parent_id.clone(),
            position,
            extra: extra_to_text(&option.extra)?,
        })
    }
}

impl TryFrom<VariableOptionDB> for VariableOption {
    type Error = Error;

    fn try_from(db: VariableOptionDB) -> Result<Self, Self::Error> {
        let category: Category = db.category.parse().map_err(|_| {
            ValidationError::InvalidInput(format!(
                "stored option '{}' has unknown category '{}'",
                db.id, db.category
            ))
        })?;
        Ok(VariableOption {
            extra: text_to_extra(db.extra.as_deref())?,
            id: db.id,
            category,
            label: db.label,
            parent_id: db.parent_id,
        })
    }
}

/// The single bookkeeping row of the store.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::variable_store_state)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StoreStateDB {
    pub id: i32,
    pub revision: i64,
    pub document_extra: Option<String>,
    pub updated_at: String,
}

pub fn extra_to_text(extra: &Map<String, Value>) -> Result<Option<String>, StorageError> {
    if extra.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(extra)?))
}

pub fn text_to_extra(text: Option<&str>) -> Result<Map<String, Value>, Error> {
    match text {
        None => Ok(Map::new()),
        Some(raw) => Ok(serde_json::from_str(raw)?),
    }
}
