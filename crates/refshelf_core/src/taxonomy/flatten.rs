//! Taxonomy flattening and path resolution.
//!
//! # Responsibility
//! - Walk a taxonomy depth-first into ordered [`CollectionPath`]s.
//! - Map those paths to live collection ids.
//!
//! # Invariants
//! - Flatten order is depth-first with children in their given order, and
//!   intermediate paths are included.
//! - A [`PathIndex`] is only valid until the next structural store mutation.
//! - Index entries exist only for resolved paths.
//!
//! Name-only resolution matches a path by its final name against the whole
//! library, so repeated names at different tree positions all resolve to the
//! first collection carrying that name. Path-scoped resolution avoids this.

use crate::model::library::{Collection, CollectionId};
use crate::model::taxonomy::{CollectionPath, TaxonomyNode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How flattened paths are matched against live collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolveStrategy {
    /// Final path segment against every collection name, first match wins.
    #[default]
    #[serde(rename = "name")]
    NameOnly,
    /// Whole path against each collection's full ancestry path.
    #[serde(rename = "path")]
    PathScoped,
}

/// Lists every path reachable in `root`, depth-first.
pub fn flatten(root: &TaxonomyNode) -> Vec<CollectionPath> {
    let mut paths = Vec::with_capacity(root.total_entries());
    walk(root, None, &mut paths);
    paths
}

fn walk(node: &TaxonomyNode, prefix: Option<&CollectionPath>, out: &mut Vec<CollectionPath>) {
    for entry in node.entries() {
        let path = match prefix {
            Some(prefix) => prefix.child(entry.name()),
            None => CollectionPath::top_level(entry.name()),
        };
        out.push(path.clone());
        walk(entry.children(), Some(&path), out);
    }
}

/// Path string to collection id lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathIndex {
    ids: HashMap<String, CollectionId>,
}

impl PathIndex {
    /// Resolves `paths` against `collections` (in store iteration order).
    pub fn resolve(
        paths: &[CollectionPath],
        collections: &[Collection],
        strategy: ResolveStrategy,
    ) -> Self {
        let mut ids = HashMap::new();
        match strategy {
            ResolveStrategy::NameOnly => {
                for path in paths {
                    let found = collections
                        .iter()
                        .find(|collection| collection.name == path.leaf_name());
                    if let Some(collection) = found {
                        ids.insert(path.to_string(), collection.id);
                    }
                }
            }
            ResolveStrategy::PathScoped => {
                let live = live_paths(collections);
                for path in paths {
                    let key = path.to_string();
                    if let Some(id) = live.get(&key) {
                        ids.insert(key, *id);
                    }
                }
            }
        }
        Self { ids }
    }

    pub fn get(&self, path: &str) -> Option<CollectionId> {
        self.ids.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Full `/`-joined path of every collection; first collection wins on clashes.
///
/// Collections with an unknown parent count as top-level; parent cycles stop
/// at the first repeated id.
pub fn live_paths(collections: &[Collection]) -> HashMap<String, CollectionId> {
    let by_id: HashMap<CollectionId, &Collection> =
        collections.iter().map(|c| (c.id, c)).collect();
    let mut paths = HashMap::new();

    for collection in collections {
        let mut names = vec![collection.name.as_str()];
        let mut seen = vec![collection.id];
        let mut cursor = collection.parent_id;
        while let Some(parent) = cursor.and_then(|id| by_id.get(&id)) {
            if seen.contains(&parent.id) {
                break;
            }
            seen.push(parent.id);
            names.push(parent.name.as_str());
            cursor = parent.parent_id;
        }
        names.reverse();
        paths.entry(names.join("/")).or_insert(collection.id);
    }
    paths
}

/// Ordered paths of a taxonomy plus their resolved ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedTaxonomy {
    pub paths: Vec<CollectionPath>,
    pub index: PathIndex,
}

impl FlattenedTaxonomy {
    /// Flattens `root` and resolves it against `collections`.
    pub fn build(
        root: &TaxonomyNode,
        collections: &[Collection],
        strategy: ResolveStrategy,
    ) -> Self {
        let paths = flatten(root);
        let index = PathIndex::resolve(&paths, collections, strategy);
        Self { paths, index }
    }

    /// Paths as strings, in flatten order.
    pub fn path_strings(&self) -> Vec<String> {
        self.paths.iter().map(ToString::to_string).collect()
    }

    pub fn lookup(&self, path: &str) -> Option<CollectionId> {
        self.index.get(path)
    }
}
