//! Repository implementation for taxonomy variables.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use curator_core::errors::DatabaseError;
use curator_core::variables::{
    Category, CategorySet, Revision, StoreMutation, VariableOption, VariableStoreTrait,
    VariablesError,
};
use curator_core::{Error, Result};

use super::model::{extra_to_text, text_to_extra, StoreStateDB, VariableOptionDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{variable_options, variable_store_state};
use crate::utils::{chunk_rows_for_sqlite, format_timestamp};

const STATE_ROW: i32 = 1;
const OPTION_COLUMNS: usize = 6;

/// SQLite-backed [`VariableStoreTrait`].
///
/// Reads go through the pool; every write goes through the writer actor, which
/// checks and bumps the revision inside the same immediate transaction.
pub struct VariableRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl VariableRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }
}

fn load_state(conn: &mut SqliteConnection) -> Result<StoreStateDB> {
    Ok(variable_store_state::table
        .find(STATE_ROW)
        .select(StoreStateDB::as_select())
        .first(conn)
        .map_err(StorageError::from)?)
}

fn to_revision(stored: i64) -> Result<Revision> {
    Revision::try_from(stored).map_err(|_| {
        Error::Database(DatabaseError::Internal(format!(
            "stored revision {} is negative",
            stored
        )))
    })
}

fn to_stored(revision: Revision) -> Result<i64> {
    i64::try_from(revision).map_err(|_| {
        Error::Database(DatabaseError::Internal(format!(
            "revision {} does not fit the store",
            revision
        )))
    })
}

/// Fails with `Conflict` unless the live revision is `expected`.
fn check_revision(conn: &mut SqliteConnection, expected: Revision) -> Result<()> {
    let current = to_revision(load_state(conn)?.revision)?;
    if current != expected {
        return Err(VariablesError::Conflict { expected, current }.into());
    }
    Ok(())
}

fn bump_revision(
    conn: &mut SqliteConnection,
    expected: Revision,
    document_extra: Option<Option<String>>,
) -> Result<Revision> {
    let next = expected + 1;
    let now = format_timestamp(chrono::Utc::now().naive_utc());
    let target = variable_store_state::table.find(STATE_ROW);

    let updated = match document_extra {
        Some(extra) => diesel::update(target)
            .set((
                variable_store_state::revision.eq(to_stored(next)?),
                variable_store_state::document_extra.eq(extra),
                variable_store_state::updated_at.eq(now),
            ))
            .execute(conn),
        None => diesel::update(target)
            .set((
                variable_store_state::revision.eq(to_stored(next)?),
                variable_store_state::updated_at.eq(now),
            ))
            .execute(conn),
    };
    updated.map_err(StorageError::from)?;

    Ok(next)
}

fn load_options(conn: &mut SqliteConnection, category: Category) -> Result<Vec<VariableOption>> {
    let rows = variable_options::table
        .filter(variable_options::category.eq(category.as_str()))
        .order(variable_options::position.asc())
        .select(VariableOptionDB::as_select())
        .load::<VariableOptionDB>(conn)
        .map_err(StorageError::from)?;
    rows.into_iter().map(VariableOption::try_from).collect()
}

fn put_option(conn: &mut SqliteConnection, option: &VariableOption) -> Result<()> {
    let category = option.category.as_str();
    let existing = variable_options::table
        .filter(variable_options::category.eq(category))
        .filter(variable_options::id.eq(&option.id))
        .select(variable_options::position)
        .first::<i64>(conn)
        .optional()
        .map_err(StorageError::from)?;

    match existing {
        Some(_) => {
            diesel::update(
                variable_options::table
                    .filter(variable_options::category.eq(category))
                    .filter(variable_options::id.eq(&option.id)),
            )
            .set((
                variable_options::label.eq(&option.label),
                variable_options::parent_id.eq(option.parent_id.as_deref()),
                variable_options::extra.eq(extra_to_text(&option.extra)?),
            ))
            .execute(conn)
            .map_err(StorageError::from)?;
        }
        None => {
            let last: Option<i64> = variable_options::table
                .filter(variable_options::category.eq(category))
                .select(diesel::dsl::max(variable_options::position))
                .first(conn)
                .map_err(StorageError::from)?;
            let row = VariableOptionDB::from_domain(option, last.map_or(0, |p| p + 1))?;
            diesel::insert_into(variable_options::table)
                .values(&row)
                .execute(conn)
                .map_err(StorageError::from)?;
        }
    }
    Ok(())
}

fn delete_option(conn: &mut SqliteConnection, category: Category, id: &str) -> Result<()> {
    let deleted = diesel::delete(
        variable_options::table
            .filter(variable_options::category.eq(category.as_str()))
            .filter(variable_options::id.eq(id)),
    )
    .execute(conn)
    .map_err(StorageError::from)?;

    if deleted == 0 {
        return Err(VariablesError::NotFound {
            category,
            id: id.to_string(),
        }
        .into());
    }
    Ok(())
}

#[async_trait]
impl VariableStoreTrait for VariableRepository {
    fn revision(&self) -> Result<Revision> {
        let mut conn = get_connection(&self.pool)?;
        to_revision(load_state(&mut conn)?.revision)
    }

    fn snapshot(&self) -> Result<(CategorySet, Revision)> {
        let mut conn = get_connection(&self.pool)?;
        conn.transaction::<_, StorageError, _>(|c| {
            let state = load_state(c)?;
            let mut options = Vec::new();
            for category in Category::ALL {
                options.extend(load_options(c, category)?);
            }
            let mut set = CategorySet::from_options(options);
            set.extra = text_to_extra(state.document_extra.as_deref())?;
            Ok((set, to_revision(state.revision)?))
        })
        .map_err(Error::from)
    }

    fn list(&self, category: Category) -> Result<Vec<VariableOption>> {
        let mut conn = get_connection(&self.pool)?;
        load_options(&mut conn, category)
    }

    fn get(&self, category: Category, id: &str) -> Result<VariableOption> {
        let mut conn = get_connection(&self.pool)?;
        let row = variable_options::table
            .filter(variable_options::category.eq(category.as_str()))
            .filter(variable_options::id.eq(id))
            .select(VariableOptionDB::as_select())
            .first::<VariableOptionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        match row {
            Some(row) => VariableOption::try_from(row),
            None => Err(VariablesError::NotFound {
                category,
                id: id.to_string(),
            }
            .into()),
        }
    }

    fn list_children(&self, parent_id: &str) -> Result<Vec<VariableOption>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = variable_options::table
            .filter(variable_options::category.eq(Category::Subgenres.as_str()))
            .filter(variable_options::parent_id.eq(parent_id))
            .order(variable_options::position.asc())
            .select(VariableOptionDB::as_select())
            .load::<VariableOptionDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(VariableOption::try_from).collect()
    }

    async fn commit(&self, expected: Revision, mutations: Vec<StoreMutation>) -> Result<Revision> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Revision> {
                check_revision(conn, expected)?;
                let count = mutations.len();
                for mutation in &mutations {
                    match mutation {
                        StoreMutation::Put(option) => put_option(conn, option)?,
                        StoreMutation::Delete { category, id } => {
                            delete_option(conn, *category, id)?
                        }
                    }
                }
                let revision = bump_revision(conn, expected, None)?;
                debug!("Committed {} variable mutation(s) at revision {}", count, revision);
                Ok(revision)
            })
            .await
    }

    async fn replace_all(&self, expected: Revision, set: CategorySet) -> Result<Revision> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Revision> {
                check_revision(conn, expected)?;

                diesel::delete(variable_options::table)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let mut rows = Vec::with_capacity(set.len());
                for (_, options) in set.iter() {
                    for (position, option) in options.iter().enumerate() {
                        let position = i64::try_from(position).map_err(|_| {
                            Error::Database(DatabaseError::Internal(
                                "too many options in one category".to_string(),
                            ))
                        })?;
                        rows.push(VariableOptionDB::from_domain(option, position)?);
                    }
                }
                for chunk in chunk_rows_for_sqlite(&rows, OPTION_COLUMNS) {
                    diesel::insert_into(variable_options::table)
                        .values(chunk)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }

                let document_extra = extra_to_text(&set.extra)?;
                let revision = bump_revision(conn, expected, Some(document_extra))?;
                debug!("Replaced variables with {} option(s) at revision {}", rows.len(), revision);
                Ok(revision)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, write_actor::spawn_writer};
    use serde_json::{json, Map};
    use tempfile::tempdir;

    async fn create_test_repository() -> (VariableRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = create_pool(&db_path_str).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        (VariableRepository::new(Arc::clone(&pool), writer), temp_dir)
    }

    fn opt(category: Category, id: &str, label: &str, parent: Option<&str>) -> VariableOption {
        VariableOption {
            id: id.to_string(),
            category,
            label: label.to_string(),
            parent_id: parent.map(str::to_string),
            extra: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_put_get_delete_advance_revision() {
        let (repo, _temp_dir) = create_test_repository().await;
        assert_eq!(repo.revision().unwrap(), 0);

        let rev = repo.put(0, opt(Category::Genres, "g1", "Rock", None)).await.unwrap();
        assert_eq!(rev, 1);
        assert_eq!(repo.get(Category::Genres, "g1").unwrap().label, "Rock");

        let rev = repo.delete(1, Category::Genres, "g1").await.unwrap();
        assert_eq!(rev, 2);
        assert!(matches!(
            repo.get(Category::Genres, "g1"),
            Err(Error::Variables(VariablesError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_overwrite_keeps_position() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.put(0, opt(Category::Moods, "m1", "Calm", None)).await.unwrap();
        repo.put(1, opt(Category::Moods, "m2", "Dark", None)).await.unwrap();
        repo.put(2, opt(Category::Moods, "m1", "Serene", None)).await.unwrap();

        let labels: Vec<String> = repo
            .list(Category::Moods)
            .unwrap()
            .into_iter()
            .map(|o| o.label)
            .collect();
        assert_eq!(labels, vec!["Serene", "Dark"]);
    }

    #[tokio::test]
    async fn test_stale_revision_is_rejected() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.put(0, opt(Category::Eras, "e1", "1980s", None)).await.unwrap();

        let result = repo.put(0, opt(Category::Eras, "e2", "1990s", None)).await;
        assert!(matches!(
            result,
            Err(Error::Variables(VariablesError::Conflict {
                expected: 0,
                current: 1
            }))
        ));
        assert_eq!(repo.list(Category::Eras).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.put(0, opt(Category::Genres, "g1", "Rock", None)).await.unwrap();

        let result = repo
            .commit(
                1,
                vec![
                    StoreMutation::Put(opt(Category::Genres, "g2", "Jazz", None)),
                    StoreMutation::Delete {
                        category: Category::Genres,
                        id: "missing".to_string(),
                    },
                ],
            )
            .await;
        assert!(matches!(
            result,
            Err(Error::Variables(VariablesError::NotFound { .. }))
        ));
        assert_eq!(repo.revision().unwrap(), 1);
        assert_eq!(repo.list(Category::Genres).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_children_and_cascade_commit() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.commit(
            0,
            vec![
                StoreMutation::Put(opt(Category::Genres, "g1", "Rock", None)),
                StoreMutation::Put(opt(Category::Subgenres, "s1", "Punk", Some("g1"))),
                StoreMutation::Put(opt(Category::Subgenres, "s2", "Grunge", Some("g1"))),
            ],
        )
        .await
        .unwrap();

        let children: Vec<String> = repo
            .list_children("g1")
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(children, vec!["s1", "s2"]);

        let rev = repo
            .commit(
                1,
                vec![
                    StoreMutation::Delete {
                        category: Category::Subgenres,
                        id: "s1".to_string(),
                    },
                    StoreMutation::Delete {
                        category: Category::Subgenres,
                        id: "s2".to_string(),
                    },
                    StoreMutation::Delete {
                        category: Category::Genres,
                        id: "g1".to_string(),
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(rev, 2);
        let (set, revision) = repo.snapshot().unwrap();
        assert!(set.is_empty());
        assert_eq!(revision, 2);
    }

    #[tokio::test]
    async fn test_replace_all_round_trips_set() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.put(0, opt(Category::Eras, "old", "Old", None)).await.unwrap();

        let mut punk = opt(Category::Subgenres, "s1", "Punk", Some("g1"));
        punk.extra.insert("color".to_string(), json!("#222"));
        let mut set = CategorySet::from_options(vec![
            opt(Category::Genres, "g1", "Rock", None),
            opt(Category::Genres, "g2", "Jazz", None),
            punk,
            opt(Category::Moods, "m1", "Calm", None),
        ]);
        set.extra.insert("source".to_string(), json!("legacy"));

        let rev = repo.replace_all(1, set.clone()).await.unwrap();
        assert_eq!(rev, 2);

        let (stored, revision) = repo.snapshot().unwrap();
        assert_eq!(revision, 2);
        assert_eq!(stored, set);
        assert_eq!(stored.children_of("g1"), ["s1".to_string()]);
        assert!(repo.list(Category::Eras).unwrap().is_empty());
    }
}
