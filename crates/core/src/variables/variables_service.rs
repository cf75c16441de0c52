//! Variables manager service implementation.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::Result;

use super::variables_codec;
use super::{
    has_blocking, validate, validate_with_references, Category, CategoryListing, CategorySet,
    CategorySetSnapshot, DeleteOptions, DeleteOutcome, ImportOptions, ImportOutcome,
    NewVariableOption, OptionPatch, Revision, StoreMutation, VariableOption, VariableStoreTrait,
    VariablesError, VariablesServiceTrait, Violation, ViolationKind,
};

pub struct VariablesService {
    store: Arc<dyn VariableStoreTrait>,
    // Shared by single edits, exclusive for a bulk import.
    import_gate: RwLock<()>,
}

impl VariablesService {
    pub fn new(store: Arc<dyn VariableStoreTrait>) -> Self {
        Self {
            store,
            import_gate: RwLock::new(()),
        }
    }

    /// Snapshots the store, lets `stage` describe the change against a copy of
    /// the live set, validates the staged result and commits it.
    ///
    /// `stage` may return an error to reject the change before validation.
    async fn stage_and_commit<F>(
        &self,
        expected: Option<Revision>,
        stage: F,
    ) -> Result<Revision>
    where
        F: FnOnce(&CategorySet) -> Result<Vec<StoreMutation>> + Send,
    {
        let _shared = self.import_gate.read().await;

        let (live, current) = self.store.snapshot()?;
        let expected = expected.unwrap_or(current);
        if expected != current {
            return Err(VariablesError::Conflict { expected, current }.into());
        }

        let mutations = stage(&live)?;
        let mut staged = live;
        for mutation in mutations.iter().cloned() {
            staged.apply(mutation)?;
        }

        let violations = validate(&staged);
        if has_blocking(&violations) {
            debug!(
                "Rejected variables change at revision {}: {} violation(s)",
                current,
                violations.len()
            );
            return Err(VariablesError::ValidationFailed(violations).into());
        }

        self.store.commit(expected, mutations).await
    }

    fn require(set: &CategorySet, category: Category, id: &str) -> Result<VariableOption> {
        set.get(category, id).cloned().ok_or_else(|| {
            VariablesError::NotFound {
                category,
                id: id.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl VariablesServiceTrait for VariablesService {
    fn list_options(&self, category: Category) -> Result<CategoryListing> {
        let (set, revision) = self.store.snapshot()?;
        Ok(CategoryListing {
            category,
            revision,
            options: set.list(category).to_vec(),
        })
    }

    fn get_option(&self, category: Category, id: &str) -> Result<VariableOption> {
        self.store.get(category, id)
    }

    fn get_category_set(&self) -> Result<CategorySetSnapshot> {
        let (set, revision) = self.store.snapshot()?;
        Ok(CategorySetSnapshot {
            revision,
            categories: set.to_map(),
        })
    }

    async fn create_option(
        &self,
        category: Category,
        new_option: NewVariableOption,
    ) -> Result<VariableOption> {
        let option = VariableOption {
            id: new_option
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            category,
            label: new_option.label.trim().to_string(),
            parent_id: new_option.parent_id,
            extra: Default::default(),
        };

        let staged = option.clone();
        let revision = self
            .stage_and_commit(new_option.expected_revision, move |live| {
                if live.contains(category, &staged.id) {
                    return Err(VariablesError::ValidationFailed(vec![Violation::error(
                        ViolationKind::DuplicateId,
                        category,
                        Some(&staged.id),
                        format!("Id '{}' already exists in {}", staged.id, category),
                    )])
                    .into());
                }
                Ok(vec![StoreMutation::Put(staged)])
            })
            .await?;

        info!(
            "Created {} option '{}' ({}) at revision {}",
            category, option.label, option.id, revision
        );
        Ok(option)
    }

    async fn update_option(
        &self,
        category: Category,
        id: &str,
        patch: OptionPatch,
    ) -> Result<VariableOption> {
        let mut updated: Option<VariableOption> = None;
        let revision = self
            .stage_and_commit(patch.expected_revision, |live| {
                let mut option = Self::require(live, category, id)?;
                if let Some(label) = patch.label {
                    option.label = label.trim().to_string();
                }
                if let Some(parent_id) = patch.parent_id {
                    option.parent_id = Some(parent_id);
                }
                updated = Some(option.clone());
                Ok(vec![StoreMutation::Put(option)])
            })
            .await?;

        let option = updated.ok_or_else(|| {
            crate::Error::Unexpected(format!("update of {} option '{}' staged nothing", category, id))
        })?;
        info!(
            "Updated {} option '{}' at revision {}",
            category, option.id, revision
        );
        Ok(option)
    }

    async fn delete_option(
        &self,
        category: Category,
        id: &str,
        options: DeleteOptions,
    ) -> Result<DeleteOutcome> {
        let mut deleted_ids = Vec::new();
        let revision = self
            .stage_and_commit(options.expected_revision, |live| {
                Self::require(live, category, id)?;

                let dependents: Vec<String> = if category == Category::Genres {
                    live.children_of(id).to_vec()
                } else {
                    Vec::new()
                };
                if !dependents.is_empty() && !options.cascade {
                    return Err(VariablesError::HasDependents {
                        id: id.to_string(),
                        dependents,
                    }
                    .into());
                }

                let mut mutations: Vec<StoreMutation> = dependents
                    .iter()
                    .map(|child| StoreMutation::Delete {
                        category: Category::Subgenres,
                        id: child.clone(),
                    })
                    .collect();
                mutations.push(StoreMutation::Delete {
                    category,
                    id: id.to_string(),
                });

                deleted_ids.push(id.to_string());
                deleted_ids.extend(dependents);
                Ok(mutations)
            })
            .await?;

        if deleted_ids.len() > 1 {
            info!(
                "Deleted {} option '{}' with {} dependent subgenre(s) at revision {}",
                category,
                id,
                deleted_ids.len() - 1,
                revision
            );
        } else {
            info!("Deleted {} option '{}' at revision {}", category, id, revision);
        }
        Ok(DeleteOutcome {
            deleted_ids,
            revision,
        })
    }

    fn export_document(&self) -> Result<String> {
        let (set, revision) = self.store.snapshot()?;
        debug!("Exporting {} variables at revision {}", set.len(), revision);
        variables_codec::export(&set)
    }

    async fn import_document(
        &self,
        document: &str,
        options: ImportOptions,
    ) -> Result<ImportOutcome> {
        let _exclusive = self.import_gate.write().await;

        let current = self.store.revision()?;
        let expected = options.expected_revision.unwrap_or(current);
        if expected != current {
            warn!(
                "Rejected variables import read at revision {} (live revision {})",
                expected, current
            );
            return Err(VariablesError::Conflict { expected, current }.into());
        }

        let (set, mut violations) = variables_codec::import(document)?;
        if has_blocking(&violations) {
            warn!(
                "Rejected variables import: {} violation(s)",
                violations.iter().filter(|v| v.is_blocking()).count()
            );
            return Err(VariablesError::ValidationFailed(violations).into());
        }
        if !options.references.is_empty() {
            violations = validate_with_references(&set, &options.references);
        }

        let counts = set.counts();
        let revision = self.store.replace_all(expected, set).await?;
        info!(
            "Imported {} variables, revision {} -> {} ({} notice(s))",
            counts.values().sum::<usize>(),
            expected,
            revision,
            violations.len()
        );

        Ok(ImportOutcome {
            revision,
            counts,
            notices: violations,
        })
    }
}
