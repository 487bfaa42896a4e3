//! Destructive rebuild of the library collection tree.
//!
//! # Responsibility
//! - Replace every collection with the hierarchy of one taxonomy.
//!
//! # Invariants
//! - Existing collections and memberships are deleted before creation starts.
//! - Creation order is depth-first in taxonomy order; parents precede children.
//! - The rebuild is not transactional. A failure mid-way leaves the store
//!   cleared and partially rebuilt; the error is returned as-is.

use crate::model::library::CollectionId;
use crate::model::taxonomy::{CollectionPath, TaxonomyNode};
use crate::repo::library_repo::{LibraryStore, StoreResult};
use log::{error, info, warn};
use std::collections::HashMap;
use std::time::Instant;

/// Outcome of one rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of collections created.
    pub created: usize,
    /// New collection id for every `/`-joined taxonomy path.
    pub ids_by_path: HashMap<String, CollectionId>,
}

/// Wipes all collections and recreates them from `taxonomy`.
pub fn synchronize_structure<S: LibraryStore + ?Sized>(
    store: &S,
    taxonomy: &TaxonomyNode,
) -> StoreResult<SyncReport> {
    let started = Instant::now();
    let planned = taxonomy.total_entries();
    if taxonomy.is_empty() {
        warn!("event=structure_sync module=service status=warn reason=empty_taxonomy");
    }

    if let Err(err) = store.delete_all_collections() {
        error!(
            "event=structure_sync module=service status=error phase=clear error={}",
            err
        );
        return Err(err);
    }

    let mut report = SyncReport::default();
    if let Err(err) = create_level(store, taxonomy, None, None, &mut report) {
        error!(
            "event=structure_sync module=service status=error phase=create created={} planned={} error={}",
            report.created, planned, err
        );
        return Err(err);
    }

    info!(
        "event=structure_sync module=service status=ok created={} duration_ms={}",
        report.created,
        started.elapsed().as_millis()
    );
    Ok(report)
}

fn create_level<S: LibraryStore + ?Sized>(
    store: &S,
    node: &TaxonomyNode,
    parent_id: Option<CollectionId>,
    parent_path: Option<&CollectionPath>,
    report: &mut SyncReport,
) -> StoreResult<()> {
    for entry in node.entries() {
        let path = match parent_path {
            Some(parent) => parent.child(entry.name()),
            None => CollectionPath::top_level(entry.name()),
        };
        let id = store.create_collection(entry.name(), parent_id)?;
        report.created += 1;
        report.ids_by_path.insert(path.to_string(), id);
        create_level(store, entry.children(), Some(id), Some(&path), report)?;
    }
    Ok(())
}
