//! Process-local variable store.

use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{Error, Result};

use super::{
    Category, CategorySet, Revision, StoreMutation, VariableOption, VariableStoreTrait,
    VariablesError,
};

struct StoreState {
    set: CategorySet,
    revision: Revision,
}

/// A [`VariableStoreTrait`] that keeps the set in memory.
///
/// Owned by whoever constructs it and handed to the service explicitly; two
/// instances never share state.
pub struct InMemoryVariableStore {
    state: RwLock<StoreState>,
}

impl InMemoryVariableStore {
    pub fn new() -> Self {
        Self::with_set(CategorySet::new())
    }

    /// Seeds the store with an existing set at revision 0.
    pub fn with_set(set: CategorySet) -> Self {
        Self {
            state: RwLock::new(StoreState { set, revision: 0 }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| Error::Unexpected("variable store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| Error::Unexpected("variable store lock poisoned".to_string()))
    }
}

impl Default for InMemoryVariableStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_revision(expected: Revision, current: Revision) -> Result<()> {
    if expected != current {
        return Err(VariablesError::Conflict { expected, current }.into());
    }
    Ok(())
}

#[async_trait]
impl VariableStoreTrait for InMemoryVariableStore {
    fn revision(&self) -> Result<Revision> {
        Ok(self.read()?.revision)
    }

    fn snapshot(&self) -> Result<(CategorySet, Revision)> {
        let state = self.read()?;
        Ok((state.set.clone(), state.revision))
    }

    fn list(&self, category: Category) -> Result<Vec<VariableOption>> {
        Ok(self.read()?.set.list(category).to_vec())
    }

    fn get(&self, category: Category, id: &str) -> Result<VariableOption> {
        self.read()?
            .set
            .get(category, id)
            .cloned()
            .ok_or_else(|| {
                VariablesError::NotFound {
                    category,
                    id: id.to_string(),
                }
                .into()
            })
    }

    fn list_children(&self, parent_id: &str) -> Result<Vec<VariableOption>> {
        let state = self.read()?;
        Ok(state
            .set
            .children_of(parent_id)
            .iter()
            .filter_map(|id| state.set.get(Category::Subgenres, id).cloned())
            .collect())
    }

    async fn commit(&self, expected: Revision, mutations: Vec<StoreMutation>) -> Result<Revision> {
        let mut state = self.write()?;
        check_revision(expected, state.revision)?;

        let mut staged = state.set.clone();
        for mutation in mutations {
            staged.apply(mutation)?;
        }
        state.set = staged;
        state.revision += 1;
        Ok(state.revision)
    }

    async fn replace_all(&self, expected: Revision, set: CategorySet) -> Result<Revision> {
        let mut state = self.write()?;
        check_revision(expected, state.revision)?;
        state.set = set;
        state.revision += 1;
        Ok(state.revision)
    }
}
