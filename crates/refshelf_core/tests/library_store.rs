use refshelf_core::db::open_db_in_memory;
use refshelf_core::{LibraryStore, SqliteLibraryStore, StoreError};
use std::collections::BTreeSet;

#[test]
fn inserted_paper_reads_back_with_keywords() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    let id = store
        .insert_paper("Plating onset", "Low temperature plating.", &["plating", "aging"])
        .unwrap();
    let paper = store.get_paper(id).unwrap();

    assert_eq!(paper.title, "Plating onset");
    assert_eq!(paper.abstract_text, "Low temperature plating.");
    assert_eq!(paper.keyword_list(), vec!["aging", "plating"]);
    assert!(paper.is_unclassified());
}

#[test]
fn missing_abstract_reads_as_empty_text() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    let id = store.insert_paper("No abstract", "", &[]).unwrap();
    assert_eq!(store.get_paper(id).unwrap().abstract_text, "");
}

#[test]
fn get_paper_rejects_unknown_and_non_article_items() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    assert!(matches!(
        store.get_paper(404),
        Err(StoreError::PaperNotFound(404))
    ));

    conn.execute(
        "INSERT INTO items (itemID, itemTypeID, libraryID, key) VALUES (50, 2, 1, 'BOOK0001');",
        [],
    )
    .unwrap();
    assert!(matches!(
        store.get_paper(50),
        Err(StoreError::PaperNotFound(50))
    ));
}

#[test]
fn unclassified_listing_excludes_members_and_untitled_items() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    let first = store.insert_paper("First", "a", &[]).unwrap();
    let second = store.insert_paper("Second", "b", &[]).unwrap();
    let untitled = store.insert_paper("", "c", &[]).unwrap();
    let collection = store.create_collection("Filed", None).unwrap();
    store.set_paper_collections(first, &[collection]).unwrap();

    let ids: Vec<i64> = store
        .list_unclassified_papers()
        .unwrap()
        .iter()
        .map(|paper| paper.id)
        .collect();
    assert_eq!(ids, vec![second]);
    assert!(!ids.contains(&untitled));
}

#[test]
fn collections_list_in_id_order_with_parents() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    let root = store.create_collection("Energy", None).unwrap();
    let child = store.create_collection("Storage", Some(root)).unwrap();
    let collections = store.list_collections().unwrap();

    assert_eq!(collections.len(), 2);
    assert_eq!(collections[0].id, root);
    assert_eq!(collections[0].parent_id, None);
    assert_eq!(collections[1].id, child);
    assert_eq!(collections[1].parent_id, Some(root));

    let key: String = conn
        .query_row(
            "SELECT key FROM collections WHERE collectionID = ?1;",
            [child],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(key.len(), 8);
    assert!(key
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
}

#[test]
fn create_collection_rejects_unknown_parent() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    assert!(matches!(
        store.create_collection("Orphan", Some(77)),
        Err(StoreError::CollectionNotFound(77))
    ));
    assert!(store.list_collections().unwrap().is_empty());
}

#[test]
fn set_paper_collections_replaces_membership_in_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    let paper = store.insert_paper("Paper", "", &[]).unwrap();
    let a = store.create_collection("A", None).unwrap();
    let b = store.create_collection("B", None).unwrap();
    let c = store.create_collection("C", None).unwrap();

    store.set_paper_collections(paper, &[a, b]).unwrap();
    store.set_paper_collections(paper, &[c, a]).unwrap();

    assert_eq!(store.get_paper(paper).unwrap().collections, vec!["C", "A"]);
    assert!(store.list_collection_papers(b).unwrap().is_empty());
    assert_eq!(store.list_collection_papers(c).unwrap(), vec![paper]);
}

#[test]
fn set_paper_collections_with_unknown_id_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    let paper = store.insert_paper("Paper", "", &[]).unwrap();
    let a = store.create_collection("A", None).unwrap();
    store.set_paper_collections(paper, &[a]).unwrap();

    assert!(matches!(
        store.set_paper_collections(paper, &[a, 999]),
        Err(StoreError::CollectionNotFound(999))
    ));
    assert_eq!(store.get_paper(paper).unwrap().collections, vec!["A"]);
}

#[test]
fn merge_keywords_only_adds_and_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    let paper = store.insert_paper("Paper", "", &["existing"]).unwrap();
    let suggestions = vec![" fresh ".to_string(), "existing".to_string(), "".to_string()];

    let first = store.merge_paper_keywords(paper, &suggestions).unwrap();
    let second = store.merge_paper_keywords(paper, &suggestions).unwrap();

    let expected: BTreeSet<String> = ["existing", "fresh"].iter().map(|s| s.to_string()).collect();
    assert_eq!(first, expected);
    assert_eq!(second, expected);
    assert!(matches!(
        store.merge_paper_keywords(9999, &suggestions),
        Err(StoreError::PaperNotFound(9999))
    ));
}

#[test]
fn all_keywords_is_the_union_across_papers() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    store.insert_paper("One", "", &["b", "a"]).unwrap();
    store.insert_paper("Two", "", &["c", "a"]).unwrap();

    let keywords: Vec<String> = store.list_all_keywords().unwrap().into_iter().collect();
    assert_eq!(keywords, vec!["a", "b", "c"]);
}

#[test]
fn all_keywords_ignore_tags_on_non_paper_items() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    store.insert_paper("Paper", "", &["paper-tag"]).unwrap();
    store.insert_paper("", "", &["untitled-tag"]).unwrap();
    conn.execute_batch(
        "INSERT INTO items (itemID, itemTypeID, libraryID, key) VALUES (60, 1, 1, 'NOTE0001');
         INSERT INTO tags (name) VALUES ('_todo-note');
         INSERT INTO itemTags (itemID, tagID, type)
             SELECT 60, tagID, 0 FROM tags WHERE name = '_todo-note';",
    )
    .unwrap();

    let keywords: Vec<String> = store.list_all_keywords().unwrap().into_iter().collect();
    assert_eq!(keywords, vec!["paper-tag"]);
}

#[test]
fn delete_all_collections_clears_memberships() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLibraryStore::try_new(&conn).unwrap();

    let paper = store.insert_paper("Paper", "", &[]).unwrap();
    let root = store.create_collection("Root", None).unwrap();
    let child = store.create_collection("Child", Some(root)).unwrap();
    store.set_paper_collections(paper, &[child]).unwrap();

    store.delete_all_collections().unwrap();

    assert!(store.list_collections().unwrap().is_empty());
    assert!(store.get_paper(paper).unwrap().is_unclassified());
}
