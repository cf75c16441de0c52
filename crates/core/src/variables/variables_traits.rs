//! Traits for the variable store and the variables manager service.

use async_trait::async_trait;

use crate::Result;

use super::{
    Category, CategoryListing, CategorySet, CategorySetSnapshot, DeleteOptions, DeleteOutcome,
    ImportOptions, ImportOutcome, NewVariableOption, OptionPatch, Revision, StoreMutation, VariableOption,
};

/// Persistence for the taxonomy.
///
/// Every write names the revision it was read at. A write against a stale
/// revision fails with `VariablesError::Conflict`; a successful write advances
/// the revision by exactly one.
#[async_trait]
pub trait VariableStoreTrait: Send + Sync {
    fn revision(&self) -> Result<Revision>;
    /// A consistent copy of the whole set and the revision it belongs to.
    fn snapshot(&self) -> Result<(CategorySet, Revision)>;
    fn list(&self, category: Category) -> Result<Vec<VariableOption>>;
    fn get(&self, category: Category, id: &str) -> Result<VariableOption>;
    /// Subgenres whose parent is `parent_id`, in insertion order.
    fn list_children(&self, parent_id: &str) -> Result<Vec<VariableOption>>;

    /// Applies all mutations atomically or none of them.
    async fn commit(&self, expected: Revision, mutations: Vec<StoreMutation>) -> Result<Revision>;
    /// Swaps the whole set in one step.
    async fn replace_all(&self, expected: Revision, set: CategorySet) -> Result<Revision>;

    async fn put(&self, expected: Revision, option: VariableOption) -> Result<Revision> {
        self.commit(expected, vec![StoreMutation::Put(option)]).await
    }

    async fn delete(&self, expected: Revision, category: Category, id: &str) -> Result<Revision> {
        self.commit(
            expected,
            vec![StoreMutation::Delete {
                category,
                id: id.to_string(),
            }],
        )
        .await
    }
}

/// CRUD and import/export façade used by the admin UI.
#[async_trait]
pub trait VariablesServiceTrait: Send + Sync {
    fn list_options(&self, category: Category) -> Result<CategoryListing>;
    fn get_option(&self, category: Category, id: &str) -> Result<VariableOption>;
    fn get_category_set(&self) -> Result<CategorySetSnapshot>;

    async fn create_option(
        &self,
        category: Category,
        option: NewVariableOption,
    ) -> Result<VariableOption>;
    async fn update_option(
        &self,
        category: Category,
        id: &str,
        patch: OptionPatch,
    ) -> Result<VariableOption>;
    async fn delete_option(
        &self,
        category: Category,
        id: &str,
        options: DeleteOptions,
    ) -> Result<DeleteOutcome>;

    // Import/Export
    fn export_document(&self) -> Result<String>;
    /// Replaces the whole set with the document's contents. Fails with
    /// `Conflict` when `options.expected_revision` is stale.
    async fn import_document(
        &self,
        document: &str,
        options: ImportOptions,
    ) -> Result<ImportOutcome>;
}
