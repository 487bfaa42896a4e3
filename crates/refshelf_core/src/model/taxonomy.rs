//! Taxonomy proposal model.
//!
//! # Responsibility
//! - Represent a proposed collection hierarchy with a guaranteed child order.
//! - Convert between the nested JSON mapping format and the typed tree.
//!
//! # Invariants
//! - Entry order is the order of first appearance in the source mapping.
//! - Entry names are non-blank and never contain [`PATH_SEPARATOR`].
//! - A repeated sibling name keeps its first position and takes the last
//!   value, matching JSON object semantics.

use crate::model::library::{Collection, CollectionId};
use log::warn;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Sole separator between names in a serialized collection path.
pub const PATH_SEPARATOR: char = '/';

/// Errors raised while building a taxonomy tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    /// Name is blank after trim.
    BlankName,
    /// Name contains the path separator.
    NameContainsSeparator(String),
}

impl Display for TaxonomyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "collection name must not be blank"),
            Self::NameContainsSeparator(name) => write!(
                f,
                "collection name `{name}` must not contain `{PATH_SEPARATOR}`"
            ),
        }
    }
}

impl Error for TaxonomyError {}

/// One level of a proposed hierarchy.
///
/// The root of a proposal is an unnamed `TaxonomyNode`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonomyNode {
    entries: Vec<TaxonomyEntry>,
}

/// Named child of a [`TaxonomyNode`]; a leaf when it has no children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyEntry {
    name: String,
    children: TaxonomyNode,
}

impl TaxonomyEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &TaxonomyNode {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl TaxonomyNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct children in order.
    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of named entries across all depths.
    pub fn total_entries(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| 1 + entry.children.total_entries())
            .sum()
    }

    /// Looks up a direct child subtree by exact name.
    pub fn child(&self, name: &str) -> Option<&TaxonomyNode> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.children)
    }

    /// Appends a named child, or replaces the subtree of an existing sibling
    /// with the same name in place.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        children: TaxonomyNode,
    ) -> Result<(), TaxonomyError> {
        let name = name.into();
        validate_name(&name)?;
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(existing) => existing.children = children,
            None => self.entries.push(TaxonomyEntry { name, children }),
        }
        Ok(())
    }

    /// Builder form of [`TaxonomyNode::insert`].
    pub fn with_child(
        mut self,
        name: impl Into<String>,
        children: TaxonomyNode,
    ) -> Result<Self, TaxonomyError> {
        self.insert(name, children)?;
        Ok(self)
    }

    /// Rebuilds the hierarchy currently stored as collections.
    ///
    /// Children keep the order of `collections`. Collections whose parent is
    /// unknown are treated as top-level; parent cycles are cut. Same-named
    /// siblings are merged into one entry holding the children of both.
    /// A collection whose name is blank or contains [`PATH_SEPARATOR`] is
    /// skipped together with its subtree.
    pub fn from_collections(collections: &[Collection]) -> Self {
        let known: HashSet<CollectionId> = collections.iter().map(|c| c.id).collect();
        let mut children_by_parent: HashMap<Option<CollectionId>, Vec<&Collection>> =
            HashMap::new();
        for collection in collections {
            let parent = collection.parent_id.filter(|id| known.contains(id));
            children_by_parent.entry(parent).or_default().push(collection);
        }

        let mut visited = HashSet::new();
        build_from_parent(None, &children_by_parent, &mut visited)
    }

    /// Adds `children` under `name`, merging into an existing sibling.
    fn merge_child(&mut self, name: String, children: TaxonomyNode) {
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(existing) => {
                for entry in children.entries {
                    existing.children.merge_child(entry.name, entry.children);
                }
            }
            None => self.entries.push(TaxonomyEntry { name, children }),
        }
    }
}

fn build_from_parent(
    parent: Option<CollectionId>,
    children_by_parent: &HashMap<Option<CollectionId>, Vec<&Collection>>,
    visited: &mut HashSet<CollectionId>,
) -> TaxonomyNode {
    let mut node = TaxonomyNode::new();
    let Some(children) = children_by_parent.get(&parent) else {
        return node;
    };
    for collection in children {
        if !visited.insert(collection.id) {
            continue;
        }
        if let Err(err) = validate_name(&collection.name) {
            warn!(
                "event=taxonomy_from_collections module=model status=skip collection_id={} error={}",
                collection.id, err
            );
            continue;
        }
        let subtree = build_from_parent(Some(collection.id), children_by_parent, visited);
        node.merge_child(collection.name.clone(), subtree);
    }
    node
}

fn validate_name(name: &str) -> Result<(), TaxonomyError> {
    if name.trim().is_empty() {
        return Err(TaxonomyError::BlankName);
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(TaxonomyError::NameContainsSeparator(name.to_string()));
    }
    Ok(())
}

/// Ordered names from the root of a taxonomy to one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// Path of a top-level collection.
    pub fn top_level(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Path of a child of this path.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    /// Parses a `/`-joined path. Returns `None` for empty segments.
    pub fn parse(text: &str) -> Option<Self> {
        let segments: Vec<String> = text.split(PATH_SEPARATOR).map(str::to_string).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return None;
        }
        Some(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Final name component.
    pub fn leaf_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                write!(f, "{PATH_SEPARATOR}")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Serialize for TaxonomyNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, &entry.children)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TaxonomyNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = TaxonomyNode;

    fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("a mapping from collection name to sub-collections")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut node = TaxonomyNode::new();
        while let Some((name, ChildValue(children))) = map.next_entry::<String, ChildValue>()? {
            node.insert(name, children).map_err(de::Error::custom)?;
        }
        Ok(node)
    }
}

/// Value side of a taxonomy mapping: nested mappings recurse, anything else
/// is read as a leaf.
struct ChildValue(TaxonomyNode);

impl<'de> Deserialize<'de> for ChildValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ChildVisitor)
    }
}

struct ChildVisitor;

impl<'de> Visitor<'de> for ChildVisitor {
    type Value = ChildValue;

    fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("a sub-collection mapping or a leaf marker")
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        NodeVisitor.visit_map(map).map(ChildValue)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(ChildValue(TaxonomyNode::new()))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        ChildValue::deserialize(deserializer)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ChildValue(TaxonomyNode::new()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ChildValue(TaxonomyNode::new()))
    }

    fn visit_bool<E: de::Error>(self, _value: bool) -> Result<Self::Value, E> {
        Ok(ChildValue(TaxonomyNode::new()))
    }

    fn visit_i64<E: de::Error>(self, _value: i64) -> Result<Self::Value, E> {
        Ok(ChildValue(TaxonomyNode::new()))
    }

    fn visit_u64<E: de::Error>(self, _value: u64) -> Result<Self::Value, E> {
        Ok(ChildValue(TaxonomyNode::new()))
    }

    fn visit_f64<E: de::Error>(self, _value: f64) -> Result<Self::Value, E> {
        Ok(ChildValue(TaxonomyNode::new()))
    }

    fn visit_str<E: de::Error>(self, _value: &str) -> Result<Self::Value, E> {
        Ok(ChildValue(TaxonomyNode::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::{CollectionPath, TaxonomyError, TaxonomyNode};
    use crate::model::library::Collection;

    #[test]
    fn deserialize_keeps_source_order() {
        let node: TaxonomyNode =
            serde_json::from_str(r#"{"Zeta": {}, "Alpha": {"Beta": {}}, "Mid": {}}"#).unwrap();
        let names: Vec<&str> = node.entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(node.total_entries(), 4);
    }

    #[test]
    fn non_mapping_values_are_leaves() {
        let node: TaxonomyNode =
            serde_json::from_str(r#"{"A": null, "B": ["x", "y"], "C": "text", "D": 3}"#).unwrap();
        assert_eq!(node.len(), 4);
        assert!(node.entries().iter().all(|entry| entry.is_leaf()));
    }

    #[test]
    fn repeated_sibling_keeps_first_position_and_last_value() {
        let node: TaxonomyNode =
            serde_json::from_str(r#"{"A": {}, "B": {}, "A": {"C": {}}}"#).unwrap();
        let names: Vec<&str> = node.entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(node.child("A").unwrap().child("C").is_some());
    }

    #[test]
    fn names_with_separator_are_rejected() {
        let err = serde_json::from_str::<TaxonomyNode>(r#"{"A/B": {}}"#).unwrap_err();
        assert!(err.to_string().contains("must not contain"));

        let err = TaxonomyNode::new().with_child("  ", TaxonomyNode::new()).unwrap_err();
        assert_eq!(err, TaxonomyError::BlankName);
    }

    #[test]
    fn top_level_must_be_a_mapping() {
        assert!(serde_json::from_str::<TaxonomyNode>(r#"["A"]"#).is_err());
    }

    #[test]
    fn serialize_writes_empty_objects_for_leaves() {
        let node = TaxonomyNode::new()
            .with_child(
                "A",
                TaxonomyNode::new()
                    .with_child("B", TaxonomyNode::new())
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(serde_json::to_string(&node).unwrap(), r#"{"A":{"B":{}}}"#);
    }

    #[test]
    fn from_collections_rebuilds_tree_in_store_order() {
        let collections = vec![
            Collection {
                id: 10,
                name: "Energy".to_string(),
                parent_id: None,
            },
            Collection {
                id: 11,
                name: "Storage".to_string(),
                parent_id: Some(10),
            },
            Collection {
                id: 12,
                name: "Orphan".to_string(),
                parent_id: Some(99),
            },
            Collection {
                id: 13,
                name: "Grid".to_string(),
                parent_id: Some(10),
            },
        ];
        let node = TaxonomyNode::from_collections(&collections);
        assert_eq!(
            serde_json::to_string(&node).unwrap(),
            r#"{"Energy":{"Storage":{},"Grid":{}},"Orphan":{}}"#
        );
    }

    fn collection(id: i64, name: &str, parent_id: Option<i64>) -> Collection {
        Collection {
            id,
            name: name.to_string(),
            parent_id,
        }
    }

    #[test]
    fn from_collections_merges_same_named_siblings() {
        let collections = vec![
            collection(1, "X", None),
            collection(2, "Child1", Some(1)),
            collection(3, "X", None),
            collection(4, "Child2", Some(3)),
            collection(5, "Child1", Some(3)),
            collection(6, "Deep", Some(5)),
        ];
        let node = TaxonomyNode::from_collections(&collections);
        assert_eq!(
            serde_json::to_string(&node).unwrap(),
            r#"{"X":{"Child1":{"Deep":{}},"Child2":{}}}"#
        );
        assert_eq!(node.total_entries(), 4);
    }

    #[test]
    fn from_collections_skips_invalid_names_with_their_subtree() {
        let collections = vec![
            collection(1, "Input/Output", None),
            collection(2, "Buffers", Some(1)),
            collection(3, "Energy", None),
            collection(4, "  ", Some(3)),
            collection(5, "Grid", Some(3)),
        ];
        let node = TaxonomyNode::from_collections(&collections);
        assert_eq!(
            serde_json::to_string(&node).unwrap(),
            r#"{"Energy":{"Grid":{}}}"#
        );
    }

    #[test]
    fn collection_path_display_and_parse() {
        let path = CollectionPath::top_level("A").child("B");
        assert_eq!(path.to_string(), "A/B");
        assert_eq!(path.leaf_name(), "B");
        assert_eq!(path.parent(), Some(CollectionPath::top_level("A")));
        assert_eq!(CollectionPath::parse("A/B"), Some(path));
        assert_eq!(CollectionPath::parse("A//B"), None);
    }
}
