use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use super::*;
use crate::{Error, Result};

fn service() -> (VariablesService, Arc<InMemoryVariableStore>) {
    let store = Arc::new(InMemoryVariableStore::new());
    (VariablesService::new(store.clone()), store)
}

fn new_option(label: &str) -> NewVariableOption {
    NewVariableOption {
        label: label.to_string(),
        ..Default::default()
    }
}

fn new_subgenre(label: &str, parent: &str) -> NewVariableOption {
    NewVariableOption {
        label: label.to_string(),
        parent_id: Some(parent.to_string()),
        ..Default::default()
    }
}

fn violation_kinds(err: &Error) -> Vec<ViolationKind> {
    match err {
        Error::Variables(e) => e.violations().iter().map(|v| v.kind).collect(),
        _ => Vec::new(),
    }
}

#[tokio::test]
async fn test_create_then_get_returns_option() {
    let (service, _) = service();

    let rock = service
        .create_option(Category::Genres, new_option("  Rock "))
        .await
        .unwrap();
    assert_eq!(rock.label, "Rock");
    assert!(uuid::Uuid::parse_str(&rock.id).is_ok());

    let fetched = service.get_option(Category::Genres, &rock.id).unwrap();
    assert_eq!(fetched, rock);

    let listing = service.list_options(Category::Genres).unwrap();
    assert_eq!(listing.revision, 1);
    assert_eq!(listing.options, vec![rock]);
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let (service, _) = service();
    let calm = service
        .create_option(Category::Moods, new_option("Calm"))
        .await
        .unwrap();

    let outcome = service
        .delete_option(Category::Moods, &calm.id, DeleteOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.deleted_ids, vec![calm.id.clone()]);
    assert_eq!(outcome.revision, 2);

    let result = service.get_option(Category::Moods, &calm.id);
    assert!(matches!(
        result,
        Err(Error::Variables(VariablesError::NotFound { .. }))
    ));

    let again = service
        .delete_option(Category::Moods, &calm.id, DeleteOptions::default())
        .await;
    assert!(matches!(
        again,
        Err(Error::Variables(VariablesError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn test_subgenre_with_unknown_parent_is_rejected() {
    let (service, store) = service();

    let err = service
        .create_option(Category::Subgenres, new_subgenre("Punk", "no-such-genre"))
        .await
        .unwrap_err();
    assert_eq!(
        violation_kinds(&err),
        vec![ViolationKind::DanglingParentReference]
    );
    assert_eq!(store.revision().unwrap(), 0);
    assert!(store.list(Category::Subgenres).unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_label_is_rejected_case_insensitively() {
    let (service, store) = service();
    service
        .create_option(Category::Genres, new_option("Rock"))
        .await
        .unwrap();

    let err = service
        .create_option(Category::Genres, new_option("rock"))
        .await
        .unwrap_err();
    assert_eq!(violation_kinds(&err), vec![ViolationKind::DuplicateLabel]);
    assert_eq!(store.list(Category::Genres).unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_with_existing_id_is_rejected() {
    let (service, _) = service();
    let first = NewVariableOption {
        id: Some("era-60s".to_string()),
        label: "1960s".to_string(),
        ..Default::default()
    };
    service.create_option(Category::Eras, first).await.unwrap();

    let clash = NewVariableOption {
        id: Some("era-60s".to_string()),
        label: "Sixties".to_string(),
        ..Default::default()
    };
    let err = service.create_option(Category::Eras, clash).await.unwrap_err();
    assert_eq!(violation_kinds(&err), vec![ViolationKind::DuplicateId]);
}

#[tokio::test]
async fn test_genre_delete_with_dependents() {
    let (service, store) = service();
    let rock = service
        .create_option(Category::Genres, new_option("Rock"))
        .await
        .unwrap();
    let punk = service
        .create_option(Category::Subgenres, new_subgenre("Punk", &rock.id))
        .await
        .unwrap();
    let grunge = service
        .create_option(Category::Subgenres, new_subgenre("Grunge", &rock.id))
        .await
        .unwrap();

    let err = service
        .delete_option(Category::Genres, &rock.id, DeleteOptions::default())
        .await
        .unwrap_err();
    match err {
        Error::Variables(VariablesError::HasDependents { id, dependents }) => {
            assert_eq!(id, rock.id);
            assert_eq!(dependents, vec![punk.id.clone(), grunge.id.clone()]);
        }
        other => panic!("expected HasDependents, got {other:?}"),
    }
    assert_eq!(store.revision().unwrap(), 3);

    let outcome = service
        .delete_option(
            Category::Genres,
            &rock.id,
            DeleteOptions {
                cascade: true,
                expected_revision: Some(3),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.deleted_ids, vec![rock.id, punk.id, grunge.id]);
    assert_eq!(outcome.revision, 4);
    assert!(store.list(Category::Genres).unwrap().is_empty());
    assert!(store.list(Category::Subgenres).unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_expected_revision_conflicts() {
    let (service, store) = service();

    let first = NewVariableOption {
        expected_revision: Some(0),
        ..new_option("Calm")
    };
    let second = NewVariableOption {
        expected_revision: Some(0),
        ..new_option("Energetic")
    };

    service.create_option(Category::Moods, first).await.unwrap();
    let err = service
        .create_option(Category::Moods, second)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Variables(VariablesError::Conflict {
            expected: 0,
            current: 1
        })
    ));
    assert_eq!(store.revision().unwrap(), 1);
    assert_eq!(store.list(Category::Moods).unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_relabels_and_moves_subgenre() {
    let (service, store) = service();
    let rock = service
        .create_option(Category::Genres, new_option("Rock"))
        .await
        .unwrap();
    let metal = service
        .create_option(Category::Genres, new_option("Metal"))
        .await
        .unwrap();
    let prog = service
        .create_option(Category::Subgenres, new_subgenre("Prog", &rock.id))
        .await
        .unwrap();

    let updated = service
        .update_option(
            Category::Subgenres,
            &prog.id,
            OptionPatch {
                label: Some(" Progressive ".to_string()),
                parent_id: Some(metal.id.clone()),
                expected_revision: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.label, "Progressive");
    assert_eq!(updated.parent_id.as_deref(), Some(metal.id.as_str()));

    assert!(store.list_children(&rock.id).unwrap().is_empty());
    assert_eq!(store.list_children(&metal.id).unwrap(), vec![updated]);
}

#[tokio::test]
async fn test_update_missing_option_is_not_found() {
    let (service, _) = service();
    let result = service
        .update_option(Category::Eras, "missing", OptionPatch::default())
        .await;
    assert!(matches!(
        result,
        Err(Error::Variables(VariablesError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn test_export_then_import_into_empty_store() {
    let (source, _) = service();
    let rock = source
        .create_option(Category::Genres, new_option("Rock"))
        .await
        .unwrap();
    source
        .create_option(Category::Subgenres, new_subgenre("Punk", &rock.id))
        .await
        .unwrap();
    source
        .create_option(Category::Eras, new_option("1970s"))
        .await
        .unwrap();
    let document = source.export_document().unwrap();

    let (target, _) = service();
    let outcome = target
        .import_document(&document, ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.revision, 1);
    assert_eq!(outcome.counts[&Category::Genres], 1);
    assert_eq!(outcome.counts[&Category::Subgenres], 1);
    assert_eq!(outcome.counts[&Category::Moods], 0);
    assert!(outcome.notices.is_empty());

    assert_eq!(
        target.get_category_set().unwrap().categories,
        source.get_category_set().unwrap().categories
    );
    assert_eq!(target.export_document().unwrap(), document);
}

#[tokio::test]
async fn test_import_with_dangling_parent_leaves_store_unchanged() {
    let (service, store) = service();
    service
        .create_option(Category::Genres, new_option("Jazz"))
        .await
        .unwrap();
    let before = service.get_category_set().unwrap();

    let document = json!({
        "version": 1,
        "categories": {
            "genres": [{ "id": "g1", "label": "Rock" }],
            "subgenres": [{ "id": "s1", "label": "Punk", "parentId": "g404" }]
        }
    })
    .to_string();

    let err = service
        .import_document(&document, ImportOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        violation_kinds(&err),
        vec![ViolationKind::DanglingParentReference]
    );
    assert_eq!(store.revision().unwrap(), before.revision);
    assert_eq!(service.get_category_set().unwrap(), before);
}

#[tokio::test]
async fn test_import_of_stale_export_is_conflict() {
    let (service, store) = service();
    service
        .create_option(Category::Genres, new_option("Rock"))
        .await
        .unwrap();
    let document = service.export_document().unwrap();
    let exported_at = store.revision().unwrap();
    let jazz = service
        .create_option(Category::Genres, new_option("Jazz"))
        .await
        .unwrap();

    let result = service
        .import_document(
            &document,
            ImportOptions {
                expected_revision: Some(exported_at),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(Error::Variables(VariablesError::Conflict {
            expected: 1,
            current: 2
        }))
    ));
    assert_eq!(store.revision().unwrap(), 2);
    assert_eq!(service.get_option(Category::Genres, &jazz.id).unwrap(), jazz);

    let outcome = service
        .import_document(
            &document,
            ImportOptions {
                expected_revision: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.revision, 3);
    assert!(service.get_option(Category::Genres, &jazz.id).is_err());
}

#[tokio::test]
async fn test_import_reports_orphaned_references() {
    let (service, _) = service();
    let document = json!({
        "version": 1,
        "categories": {
            "moods": [{ "id": "m1", "label": "Calm" }]
        }
    })
    .to_string();
    let references = vec![
        ExternalReference {
            source: "pitch p1".to_string(),
            category: Category::Moods,
            option_id: "m1".to_string(),
        },
        ExternalReference {
            source: "pitch p2".to_string(),
            category: Category::Moods,
            option_id: "m9".to_string(),
        },
    ];

    let outcome = service
        .import_document(
            &document,
            ImportOptions {
                expected_revision: None,
                references,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.revision, 1);
    assert_eq!(outcome.notices.len(), 1);
    assert_eq!(outcome.notices[0].kind, ViolationKind::OrphanReference);
    assert_eq!(outcome.notices[0].severity, Severity::Info);
    assert_eq!(outcome.notices[0].option_id.as_deref(), Some("m9"));
}

/// Store that parks inside `replace_all` until released, so a test can run
/// an edit while an import is mid-commit.
struct ParkedImportStore {
    inner: InMemoryVariableStore,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl VariableStoreTrait for ParkedImportStore {
    fn revision(&self) -> Result<Revision> {
        self.inner.revision()
    }
    fn snapshot(&self) -> Result<(CategorySet, Revision)> {
        self.inner.snapshot()
    }
    fn list(&self, category: Category) -> Result<Vec<VariableOption>> {
        self.inner.list(category)
    }
    fn get(&self, category: Category, id: &str) -> Result<VariableOption> {
        self.inner.get(category, id)
    }
    fn list_children(&self, parent_id: &str) -> Result<Vec<VariableOption>> {
        self.inner.list_children(parent_id)
    }
    async fn commit(&self, expected: Revision, mutations: Vec<StoreMutation>) -> Result<Revision> {
        self.inner.commit(expected, mutations).await
    }
    async fn replace_all(&self, expected: Revision, set: CategorySet) -> Result<Revision> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.replace_all(expected, set).await
    }
}

#[tokio::test]
async fn test_edit_waits_for_running_import() {
    let store = Arc::new(ParkedImportStore {
        inner: InMemoryVariableStore::new(),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let service = Arc::new(VariablesService::new(store.clone()));
    let document = json!({
        "version": 1,
        "categories": {
            "genres": [{ "id": "g1", "label": "Rock" }],
            "subgenres": [{ "id": "s1", "label": "Punk", "parentId": "g1" }]
        }
    })
    .to_string();

    let importer = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .import_document(&document, ImportOptions::default())
                .await
        })
    };
    store.entered.notified().await;

    let editor = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .create_option(Category::Subgenres, new_subgenre("Grunge", "g1"))
                .await
        })
    };
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!editor.is_finished());
    assert_eq!(store.revision().unwrap(), 0);

    store.release.notify_one();
    let outcome = importer.await.unwrap().unwrap();
    assert_eq!(outcome.revision, 1);

    // The edit staged against the imported set, not the empty one.
    let grunge = editor.await.unwrap().unwrap();
    assert_eq!(grunge.parent_id.as_deref(), Some("g1"));
    assert_eq!(store.revision().unwrap(), 2);
    let listing = service.list_options(Category::Subgenres).unwrap();
    let labels: Vec<&str> = listing.options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["Punk", "Grunge"]);
}

#[tokio::test]
async fn test_malformed_import_is_reported() {
    let (service, store) = service();
    let result = service
        .import_document("{ \"version\": 7 }", ImportOptions::default())
        .await;
    assert!(matches!(
        result,
        Err(Error::Variables(VariablesError::MalformedDocument(_)))
    ));
    assert_eq!(store.revision().unwrap(), 0);
}
