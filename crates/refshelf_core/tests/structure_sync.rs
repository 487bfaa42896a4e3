mod common;

use common::ScriptedGenerator;
use refshelf_core::db::open_db_in_memory;
use refshelf_core::service::structure_sync::synchronize_structure;
use refshelf_core::{
    LibraryStore, Organizer, OrganizerSettings, SqliteLibraryStore, StoreError, TaxonomyNode,
};

fn taxonomy(json: &str) -> TaxonomyNode {
    serde_json::from_str(json).unwrap()
}

#[test]
fn sync_creates_tree_in_order_with_parent_links() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    let report = synchronize_structure(&store, &taxonomy(r#"{"A": {"B": {}}, "C": {}}"#)).unwrap();

    assert_eq!(report.created, 3);
    let collections = store.list_collections().unwrap();
    let names: Vec<&str> = collections.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(collections[0].parent_id, None);
    assert_eq!(collections[1].parent_id, Some(collections[0].id));
    assert_eq!(collections[2].parent_id, None);
    assert_eq!(report.ids_by_path.get("A/B"), Some(&collections[1].id));
}

#[test]
fn sync_replaces_previous_tree_and_memberships() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    let paper = store.insert_paper("Paper", "", &[]).unwrap();
    let old = store.create_collection("Old", None).unwrap();
    store.set_paper_collections(paper, &[old]).unwrap();

    synchronize_structure(&store, &taxonomy(r#"{"New": {}}"#)).unwrap();

    let collections = store.list_collections().unwrap();
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].name, "New");
    assert!(store.get_paper(paper).unwrap().is_unclassified());
}

#[test]
fn implemented_tree_reads_back_as_the_same_taxonomy() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();
    let organizer = Organizer::new(
        store,
        ScriptedGenerator::default(),
        OrganizerSettings::new("test-model"),
    );

    let proposal = taxonomy(
        r#"{"Modelling": {"Physics": {"Electrochemical": {}}, "Data": {}}, "Aging": {}, "Methods": {"Physics": {}}}"#,
    );
    organizer.implement_structure(&proposal).unwrap();

    assert_eq!(organizer.live_taxonomy().unwrap(), proposal);
}

#[test]
fn empty_taxonomy_clears_everything() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();
    store.create_collection("Old", None).unwrap();

    let report = synchronize_structure(&store, &TaxonomyNode::new()).unwrap();

    assert_eq!(report.created, 0);
    assert!(store.list_collections().unwrap().is_empty());
}

#[test]
fn failure_mid_rebuild_leaves_partial_tree() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();
    store.create_collection("Old", None).unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_broken BEFORE INSERT ON collections
         WHEN NEW.collectionName = 'Broken'
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
    )
    .unwrap();

    let err = synchronize_structure(&store, &taxonomy(r#"{"Kept": {}, "Broken": {}, "Never": {}}"#))
        .unwrap_err();

    assert!(matches!(err, StoreError::Db(_)));
    let names: Vec<String> = store
        .list_collections()
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Kept"]);
}
