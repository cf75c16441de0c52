//! JSON exchange format for the full taxonomy.
//!
//! ```text
//! {
//!   "version": 1,
//!   "categories": {
//!     "genres":    [{ "id": "...", "label": "Rock" }],
//!     "subgenres": [{ "id": "...", "label": "Punk", "parentId": "..." }],
//!     "moods":     [],
//!     "eras":      []
//!   }
//! }
//! ```
//!
//! Categories are written in a fixed order and options in insertion order, so
//! exporting an unchanged set twice yields identical bytes. Unknown fields on
//! the document and on options are carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::variables_errors::{VariablesError, Violation};
use super::variables_model::{Category, CategorySet, VariableOption};
use super::variables_validator::validate;
use crate::errors::{Error, Result};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct VariablesDocument {
    version: u32,
    categories: DocumentCategories,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentCategories {
    #[serde(default)]
    genres: Vec<DocumentOption>,
    #[serde(default)]
    subgenres: Vec<DocumentOption>,
    #[serde(default)]
    moods: Vec<DocumentOption>,
    #[serde(default)]
    eras: Vec<DocumentOption>,
}

impl DocumentCategories {
    fn slot(&mut self, category: Category) -> &mut Vec<DocumentOption> {
        match category {
            Category::Genres => &mut self.genres,
            Category::Subgenres => &mut self.subgenres,
            Category::Moods => &mut self.moods,
            Category::Eras => &mut self.eras,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentOption {
    id: String,
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    // Redundant with the enclosing key; accepted on input, never written.
    #[serde(default, skip_serializing)]
    category: Option<Category>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Serializes the set into the versioned exchange document.
pub fn export(set: &CategorySet) -> Result<String> {
    let mut categories = DocumentCategories::default();
    for (category, options) in set.iter() {
        categories
            .slot(category)
            .extend(options.iter().map(|o| DocumentOption {
                id: o.id.clone(),
                label: o.label.clone(),
                parent_id: o.parent_id.clone(),
                category: None,
                extra: o.extra.clone(),
            }));
    }

    let document = VariablesDocument {
        version: FORMAT_VERSION,
        categories,
        extra: set.extra.clone(),
    };
    serde_json::to_string_pretty(&document)
        .map_err(|e| Error::Unexpected(format!("Failed to serialize variables: {}", e)))
}

/// Parses a document and rebuilds the set it describes, together with every
/// violation the rebuilt set has. Nothing is committed here.
pub fn import(document: &str) -> std::result::Result<(CategorySet, Vec<Violation>), VariablesError> {
    let parsed: VariablesDocument = serde_json::from_str(document)
        .map_err(|e| VariablesError::MalformedDocument(e.to_string()))?;

    if parsed.version != FORMAT_VERSION {
        return Err(VariablesError::MalformedDocument(format!(
            "unsupported document version {} (this server reads version {})",
            parsed.version, FORMAT_VERSION
        )));
    }

    let mut categories = parsed.categories;
    let mut options = Vec::new();
    for category in Category::ALL {
        for entry in std::mem::take(categories.slot(category)) {
            if let Some(declared) = entry.category {
                if declared != category {
                    return Err(VariablesError::MalformedDocument(format!(
                        "option '{}' is listed under {} but declares category {}",
                        entry.id, category, declared
                    )));
                }
            }
            options.push(VariableOption {
                id: entry.id,
                category,
                label: entry.label,
                parent_id: entry.parent_id,
                extra: entry.extra,
            });
        }
    }

    let mut set = CategorySet::from_options(options);
    set.extra = parsed.extra;
    let violations = validate(&set);
    Ok((set, violations))
}
