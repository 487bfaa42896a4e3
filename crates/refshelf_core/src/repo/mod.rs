//! Repository layer over the library database.
//!
//! # Responsibility
//! - Define the store contract used by organizer workflows.
//! - Isolate Zotero SQL details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`PaperNotFound`,
//!   `CollectionNotFound`) in addition to DB transport errors.

pub mod library_repo;
