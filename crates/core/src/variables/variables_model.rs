//! Domain models for taxonomy variables.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use super::variables_errors::{VariablesError, Violation};
use super::variables_validator::ExternalReference;

/// Monotonic counter of committed mutations on a category set.
pub type Revision = u64;

/// The four taxonomy kinds managed from the admin dashboard.
///
/// Declaration order is the canonical order used for listing and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Genres,
    Subgenres,
    Moods,
    Eras,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Genres,
        Category::Subgenres,
        Category::Moods,
        Category::Eras,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Genres => "genres",
            Category::Subgenres => "subgenres",
            Category::Moods => "moods",
            Category::Eras => "eras",
        }
    }

    /// Only subgenres hang under a parent (a genre).
    pub fn requires_parent(&self) -> bool {
        matches!(self, Category::Subgenres)
    }

    fn index(&self) -> usize {
        match self {
            Category::Genres => 0,
            Category::Subgenres => 1,
            Category::Moods => 2,
            Category::Eras => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = VariablesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "genres" => Ok(Category::Genres),
            "subgenres" => Ok(Category::Subgenres),
            "moods" => Ok(Category::Moods),
            "eras" => Ok(Category::Eras),
            other => Err(VariablesError::UnknownCategory(other.to_string())),
        }
    }
}

/// A single selectable value within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableOption {
    pub id: String,
    pub category: Category,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Fields this version does not understand, kept for round-trips.
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

/// Data for creating a new option
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVariableOption {
    #[serde(default)]
    pub id: Option<String>,
    pub label: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub expected_revision: Option<Revision>,
}

/// Partial update of an existing option. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionPatch {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub expected_revision: Option<Revision>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOptions {
    /// Delete dependent subgenres together with a genre.
    #[serde(default)]
    pub cascade: bool,
    #[serde(default)]
    pub expected_revision: Option<Revision>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub deleted_ids: Vec<String>,
    pub revision: Revision,
}

/// Options of one category together with the revision they were read at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListing {
    pub category: Category,
    pub revision: Revision,
    pub options: Vec<VariableOption>,
}

/// Every category with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySetSnapshot {
    pub revision: Revision,
    pub categories: BTreeMap<Category, Vec<VariableOption>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    /// Revision the document was exported at (or the caller last read).
    #[serde(default)]
    pub expected_revision: Option<Revision>,
    /// Outside references to check against the imported set.
    #[serde(default)]
    pub references: Vec<ExternalReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub revision: Revision,
    pub counts: BTreeMap<Category, usize>,
    /// Informational violations that did not block the import, such as
    /// outside references the new set no longer resolves.
    pub notices: Vec<Violation>,
}

/// A single change applied to the store as part of one atomic commit.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreMutation {
    Put(VariableOption),
    Delete { category: Category, id: String },
}

/// The full taxonomy: category -> ordered options.
///
/// Alongside the flat per-category lists it keeps an index from genre id to
/// the ids of the subgenres pointing at it, so dependent lookups and cascade
/// deletes do not scan the subgenre list.
#[derive(Debug, Clone, Default)]
pub struct CategorySet {
    options: [Vec<VariableOption>; 4],
    children: HashMap<String, Vec<String>>,
    /// Document-level fields this version does not understand.
    pub extra: Map<String, Value>,
}

impl CategorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from options in the given order, without de-duplicating
    /// ids. Duplicates are left for the validator to report.
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = VariableOption>,
    {
        let mut set = Self::new();
        for option in options {
            set.link_child(&option);
            set.options[option.category.index()].push(option);
        }
        set
    }

    pub fn list(&self, category: Category) -> &[VariableOption] {
        &self.options[category.index()]
    }

    pub fn get(&self, category: Category, id: &str) -> Option<&VariableOption> {
        self.list(category).iter().find(|o| o.id == id)
    }

    pub fn contains(&self, category: Category, id: &str) -> bool {
        self.get(category, id).is_some()
    }

    /// Inserts an option, or overwrites the option with the same id in place.
    /// Returns the previous value when one was replaced.
    pub fn put(&mut self, option: VariableOption) -> Option<VariableOption> {
        let idx = option.category.index();
        match self.options[idx].iter().position(|o| o.id == option.id) {
            Some(pos) => {
                if self.options[idx][pos].parent_id != option.parent_id {
                    let previous = self.options[idx][pos].clone();
                    self.unlink_child(&previous);
                    self.link_child(&option);
                }
                Some(std::mem::replace(&mut self.options[idx][pos], option))
            }
            None => {
                self.link_child(&option);
                self.options[idx].push(option);
                None
            }
        }
    }

    /// Removes an option. Subgenres of a removed genre stay in the index so a
    /// validation pass can still see them dangling.
    pub fn remove(&mut self, category: Category, id: &str) -> Option<VariableOption> {
        let idx = category.index();
        let pos = self.options[idx].iter().position(|o| o.id == id)?;
        let removed = self.options[idx].remove(pos);
        self.unlink_child(&removed);
        Some(removed)
    }

    /// Ids of the subgenres whose parent is `parent_id`, in insertion order.
    pub fn children_of(&self, parent_id: &str) -> &[String] {
        self.children
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn apply(&mut self, mutation: StoreMutation) -> Result<(), VariablesError> {
        match mutation {
            StoreMutation::Put(option) => {
                self.put(option);
                Ok(())
            }
            StoreMutation::Delete { category, id } => match self.remove(category, &id) {
                Some(_) => Ok(()),
                None => Err(VariablesError::NotFound { category, id }),
            },
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[VariableOption])> {
        Category::ALL.into_iter().map(move |c| (c, self.list(c)))
    }

    pub fn len(&self) -> usize {
        self.options.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> BTreeMap<Category, usize> {
        self.iter().map(|(c, opts)| (c, opts.len())).collect()
    }

    pub fn to_map(&self) -> BTreeMap<Category, Vec<VariableOption>> {
        self.iter().map(|(c, opts)| (c, opts.to_vec())).collect()
    }

    fn link_child(&mut self, option: &VariableOption) {
        if !option.category.requires_parent() {
            return;
        }
        if let Some(parent) = &option.parent_id {
            let ids = self.children.entry(parent.clone()).or_default();
            if !ids.contains(&option.id) {
                ids.push(option.id.clone());
            }
        }
    }

    fn unlink_child(&mut self, option: &VariableOption) {
        if !option.category.requires_parent() {
            return;
        }
        if let Some(parent) = &option.parent_id {
            if let Some(ids) = self.children.get_mut(parent) {
                ids.retain(|id| id != &option.id);
                if ids.is_empty() {
                    self.children.remove(parent);
                }
            }
        }
    }
}

impl PartialEq for CategorySet {
    fn eq(&self, other: &Self) -> bool {
        self.options == other.options && self.extra == other.extra
    }
}
