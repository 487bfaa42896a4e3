//! Library store contracts and Zotero SQLite implementation.
//!
//! # Responsibility
//! - Provide the paper/collection/tag operations used by the organizer.
//! - Keep Zotero table layout and SQL details inside the repository boundary.
//!
//! # Invariants
//! - Papers are `journalArticle` items with a non-empty title.
//! - Enumeration order is ascending Zotero id (`itemID`, `collectionID`).
//! - Keyword merges only add links; they never remove existing tags.
//! - Membership replacement for one paper runs in a single transaction.

use crate::db::DbError;
use crate::model::library::{Collection, CollectionId, Paper, PaperId};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Library id of the personal Zotero library.
const USER_LIBRARY_ID: i64 = 1;
const COLLECTION_KEY_LEN: usize = 8;

const PAPER_SELECT_SQL: &str = "SELECT
    i.itemID AS item_id,
    (SELECT v.value
       FROM itemData d
       INNER JOIN itemDataValues v ON v.valueID = d.valueID
      WHERE d.itemID = i.itemID
        AND d.fieldID = (SELECT fieldID FROM fields WHERE fieldName = 'title')
      LIMIT 1) AS title,
    (SELECT v.value
       FROM itemData d
       INNER JOIN itemDataValues v ON v.valueID = d.valueID
      WHERE d.itemID = i.itemID
        AND d.fieldID = (SELECT fieldID FROM fields WHERE fieldName = 'abstractNote')
      LIMIT 1) AS abstract_text
FROM items i
WHERE i.itemTypeID = (SELECT itemTypeID FROM itemTypes WHERE typeName = 'journalArticle')";

/// Result type used by library store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from library store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Paper id does not name a titled journal article.
    PaperNotFound(PaperId),
    /// Collection id does not exist.
    CollectionNotFound(CollectionId),
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::PaperNotFound(id) => write!(f, "paper not found: {id}"),
            Self::CollectionNotFound(id) => write!(f, "collection not found: {id}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "library store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "library store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Library operations consumed by the organizer.
pub trait LibraryStore {
    /// Loads one paper with keywords and collection names.
    fn get_paper(&self, paper_id: PaperId) -> StoreResult<Paper>;
    /// Lists papers that belong to no collection.
    fn list_unclassified_papers(&self) -> StoreResult<Vec<Paper>>;
    /// Lists every collection of the library.
    fn list_collections(&self) -> StoreResult<Vec<Collection>>;
    /// Returns the union of keyword tags across all papers.
    ///
    /// Tags on notes, attachments, or untitled items are not included.
    fn list_all_keywords(&self) -> StoreResult<BTreeSet<String>>;
    /// Lists member paper ids of one collection in membership order.
    fn list_collection_papers(&self, collection_id: CollectionId) -> StoreResult<Vec<PaperId>>;
    /// Creates one collection under an optional parent.
    fn create_collection(
        &self,
        name: &str,
        parent_id: Option<CollectionId>,
    ) -> StoreResult<CollectionId>;
    /// Deletes every collection and every collection membership link.
    fn delete_all_collections(&self) -> StoreResult<()>;
    /// Replaces a paper's membership with exactly `collection_ids`, in order.
    fn set_paper_collections(
        &self,
        paper_id: PaperId,
        collection_ids: &[CollectionId],
    ) -> StoreResult<()>;
    /// Adds keywords to a paper and returns its full keyword set.
    fn merge_paper_keywords(
        &self,
        paper_id: PaperId,
        keywords: &[String],
    ) -> StoreResult<BTreeSet<String>>;
}

/// SQLite-backed store over a Zotero library database.
pub struct SqliteLibraryStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLibraryStore<'conn> {
    /// Creates a store after checking the connection exposes the Zotero tables.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_library_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Inserts one journal article with title, abstract, and tags.
    ///
    /// Used to seed fresh libraries; Zotero itself owns item creation for
    /// real libraries.
    pub fn insert_paper(
        &self,
        title: &str,
        abstract_text: &str,
        keywords: &[&str],
    ) -> StoreResult<PaperId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO items (itemTypeID, libraryID, key)
             SELECT itemTypeID, ?1, ?2
             FROM itemTypes
             WHERE typeName = 'journalArticle';",
            params![USER_LIBRARY_ID, new_object_key()],
        )?;
        let paper_id = tx.last_insert_rowid();

        for (field_name, value) in [("title", title), ("abstractNote", abstract_text)] {
            if value.is_empty() {
                continue;
            }
            tx.execute(
                "INSERT OR IGNORE INTO itemDataValues (value) VALUES (?1);",
                [value],
            )?;
            tx.execute(
                "INSERT INTO itemData (itemID, fieldID, valueID)
                 SELECT ?1,
                        (SELECT fieldID FROM fields WHERE fieldName = ?2),
                        (SELECT valueID FROM itemDataValues WHERE value = ?3);",
                params![paper_id, field_name, value],
            )?;
        }

        for keyword in keywords {
            link_keyword(&tx, paper_id, keyword)?;
        }

        tx.commit()?;
        Ok(paper_id)
    }
}

impl LibraryStore for SqliteLibraryStore<'_> {
    fn get_paper(&self, paper_id: PaperId) -> StoreResult<Paper> {
        let sql = format!("{PAPER_SELECT_SQL} AND i.itemID = ?1;");
        let row: Option<(PaperId, Option<String>, Option<String>)> = self
            .conn
            .query_row(&sql, [paper_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()?;

        match row {
            Some((id, Some(title), abstract_text)) if !title.is_empty() => {
                load_paper(self.conn, id, title, abstract_text)
            }
            _ => Err(StoreError::PaperNotFound(paper_id)),
        }
    }

    fn list_unclassified_papers(&self) -> StoreResult<Vec<Paper>> {
        let sql = format!(
            "{PAPER_SELECT_SQL}
               AND NOT EXISTS (
                   SELECT 1 FROM collectionItems ci WHERE ci.itemID = i.itemID
               )
             ORDER BY i.itemID ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut candidates = Vec::new();
        while let Some(row) = rows.next()? {
            let id: PaperId = row.get("item_id")?;
            let title: Option<String> = row.get("title")?;
            let abstract_text: Option<String> = row.get("abstract_text")?;
            if let Some(title) = title.filter(|value| !value.is_empty()) {
                candidates.push((id, title, abstract_text));
            }
        }

        let mut papers = Vec::with_capacity(candidates.len());
        for (id, title, abstract_text) in candidates {
            papers.push(load_paper(self.conn, id, title, abstract_text)?);
        }
        debug!(
            "event=list_unclassified module=repo status=ok count={}",
            papers.len()
        );
        Ok(papers)
    }

    fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        let mut stmt = self.conn.prepare(
            "SELECT collectionID, collectionName, parentCollectionID
             FROM collections
             WHERE libraryID = ?1
             ORDER BY collectionID ASC;",
        )?;
        let mut rows = stmt.query([USER_LIBRARY_ID])?;
        let mut collections = Vec::new();
        while let Some(row) = rows.next()? {
            collections.push(Collection {
                id: row.get(0)?,
                name: row.get(1)?,
                parent_id: row.get(2)?,
            });
        }
        Ok(collections)
    }

    fn list_all_keywords(&self) -> StoreResult<BTreeSet<String>> {
        // Only tags of papers: titled journal articles.
        let sql = format!(
            "SELECT DISTINCT t.name
             FROM itemTags it
             INNER JOIN tags t ON t.tagID = it.tagID
             WHERE it.itemID IN (
                 SELECT item_id FROM ({PAPER_SELECT_SQL})
                 WHERE title IS NOT NULL AND title <> ''
             );"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut keywords = BTreeSet::new();
        while let Some(row) = rows.next()? {
            keywords.insert(row.get::<_, String>(0)?);
        }
        Ok(keywords)
    }

    fn list_collection_papers(&self, collection_id: CollectionId) -> StoreResult<Vec<PaperId>> {
        ensure_collection_exists(self.conn, collection_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT itemID
             FROM collectionItems
             WHERE collectionID = ?1
             ORDER BY orderIndex ASC, itemID ASC;",
        )?;
        let mut rows = stmt.query([collection_id])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn create_collection(
        &self,
        name: &str,
        parent_id: Option<CollectionId>,
    ) -> StoreResult<CollectionId> {
        if let Some(parent_id) = parent_id {
            ensure_collection_exists(self.conn, parent_id)?;
        }
        self.conn.execute(
            "INSERT INTO collections (collectionName, parentCollectionID, libraryID, key)
             VALUES (?1, ?2, ?3, ?4);",
            params![name, parent_id, USER_LIBRARY_ID, new_object_key()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn delete_all_collections(&self) -> StoreResult<()> {
        let links = self.conn.execute("DELETE FROM collectionItems;", [])?;
        let collections = self.conn.execute(
            "DELETE FROM collections WHERE libraryID = ?1;",
            [USER_LIBRARY_ID],
        )?;
        info!(
            "event=collections_clear module=repo status=ok collections={} links={}",
            collections, links
        );
        Ok(())
    }

    fn set_paper_collections(
        &self,
        paper_id: PaperId,
        collection_ids: &[CollectionId],
    ) -> StoreResult<()> {
        ensure_paper_exists(self.conn, paper_id)?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for collection_id in collection_ids {
            ensure_collection_exists(&tx, *collection_id)?;
        }

        tx.execute("DELETE FROM collectionItems WHERE itemID = ?1;", [paper_id])?;
        for (index, collection_id) in collection_ids.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO collectionItems (collectionID, itemID, orderIndex)
                 VALUES (?1, ?2, ?3);",
                params![collection_id, paper_id, index as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn merge_paper_keywords(
        &self,
        paper_id: PaperId,
        keywords: &[String],
    ) -> StoreResult<BTreeSet<String>> {
        ensure_paper_exists(self.conn, paper_id)?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for keyword in keywords {
            let keyword = keyword.trim();
            if keyword.is_empty() {
                continue;
            }
            link_keyword(&tx, paper_id, keyword)?;
        }
        tx.commit()?;
        load_keywords(self.conn, paper_id)
    }
}

fn load_paper(
    conn: &Connection,
    id: PaperId,
    title: String,
    abstract_text: Option<String>,
) -> StoreResult<Paper> {
    Ok(Paper {
        id,
        title,
        abstract_text: abstract_text.unwrap_or_default(),
        keywords: load_keywords(conn, id)?,
        collections: load_collection_names(conn, id)?,
    })
}

fn load_keywords(conn: &Connection, paper_id: PaperId) -> StoreResult<BTreeSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM itemTags it
         INNER JOIN tags t ON t.tagID = it.tagID
         WHERE it.itemID = ?1;",
    )?;
    let mut rows = stmt.query([paper_id])?;
    let mut keywords = BTreeSet::new();
    while let Some(row) = rows.next()? {
        keywords.insert(row.get::<_, String>(0)?);
    }
    Ok(keywords)
}

fn load_collection_names(conn: &Connection, paper_id: PaperId) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT c.collectionName
         FROM collectionItems ci
         INNER JOIN collections c ON c.collectionID = ci.collectionID
         WHERE ci.itemID = ?1
         ORDER BY ci.orderIndex ASC, c.collectionID ASC;",
    )?;
    let mut rows = stmt.query([paper_id])?;
    let mut names = Vec::new();
    while let Some(row) = rows.next()? {
        names.push(row.get(0)?);
    }
    Ok(names)
}

fn link_keyword(conn: &Connection, paper_id: PaperId, keyword: &str) -> StoreResult<()> {
    conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1);", [keyword])?;
    conn.execute(
        "INSERT OR IGNORE INTO itemTags (itemID, tagID, type)
         SELECT ?1, tagID, 0
         FROM tags
         WHERE name = ?2;",
        params![paper_id, keyword],
    )?;
    Ok(())
}

fn ensure_paper_exists(conn: &Connection, paper_id: PaperId) -> StoreResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE itemID = ?1);",
        [paper_id],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(StoreError::PaperNotFound(paper_id))
    }
}

fn ensure_collection_exists(conn: &Connection, collection_id: CollectionId) -> StoreResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM collections WHERE collectionID = ?1);",
        [collection_id],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(StoreError::CollectionNotFound(collection_id))
    }
}

/// Random 8-character uppercase alphanumeric object key.
fn new_object_key() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .to_ascii_uppercase()
        .chars()
        .take(COLLECTION_KEY_LEN)
        .collect()
}

fn ensure_library_connection_ready(conn: &Connection) -> StoreResult<()> {
    const REQUIRED: &[(&str, &[&str])] = &[
        ("items", &["itemID", "itemTypeID", "libraryID", "key"]),
        ("itemTypes", &["itemTypeID", "typeName"]),
        ("fields", &["fieldID", "fieldName"]),
        ("itemData", &["itemID", "fieldID", "valueID"]),
        ("itemDataValues", &["valueID", "value"]),
        ("tags", &["tagID", "name"]),
        ("itemTags", &["itemID", "tagID", "type"]),
        (
            "collections",
            &[
                "collectionID",
                "collectionName",
                "parentCollectionID",
                "libraryID",
                "key",
            ],
        ),
        ("collectionItems", &["collectionID", "itemID", "orderIndex"]),
    ];

    for &(table, columns) in REQUIRED {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(StoreError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
