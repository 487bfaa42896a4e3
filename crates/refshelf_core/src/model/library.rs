//! Library domain model.
//!
//! # Responsibility
//! - Define the paper and collection records read from the library store.
//!
//! # Invariants
//! - Records are transient copies; the library store stays the source of truth.
//! - Keyword sets are de-duplicated by exact string equality.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Library item identifier (Zotero `itemID`).
pub type PaperId = i64;

/// Library collection identifier (Zotero `collectionID`).
pub type CollectionId = i64;

/// Catalogued paper with its tags and current collection memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    pub title: String,
    /// Empty when the item has no abstract.
    pub abstract_text: String,
    pub keywords: BTreeSet<String>,
    /// Names of the collections holding this paper, in membership order.
    pub collections: Vec<String>,
}

impl Paper {
    /// Returns `true` when the paper belongs to no collection.
    pub fn is_unclassified(&self) -> bool {
        self.collections.is_empty()
    }

    /// Keywords in sorted order, ready for prompt rendering.
    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords.iter().cloned().collect()
    }
}

/// Named node of the library collection tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    /// `None` means a top-level collection.
    pub parent_id: Option<CollectionId>,
}

/// Merges `additions` into `existing`, returning the keywords that were new.
///
/// Blank entries are skipped and surrounding whitespace is trimmed. Prior
/// keywords are never removed.
pub fn merge_keywords<I, S>(existing: &mut BTreeSet<String>, additions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut added = Vec::new();
    for keyword in additions {
        let keyword = keyword.as_ref().trim();
        if keyword.is_empty() {
            continue;
        }
        if existing.insert(keyword.to_string()) {
            added.push(keyword.to_string());
        }
    }
    added
}
