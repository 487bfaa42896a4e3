//! Core logic for organizing a Zotero paper library with a text generator.
//! This crate owns the taxonomy, store, and classification invariants.

pub mod config;
pub mod db;
pub mod llm;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod taxonomy;

pub use config::{ConfigError, OrganizerConfig};
pub use db::{create_db, open_db, open_db_in_memory, DbError, DbResult};
pub use llm::anthropic::AnthropicClient;
pub use llm::extract::{extract_object, ExtractError};
pub use llm::{GenerationError, GenerationRequest, GenerationResult, TextGenerator};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::library::{Collection, CollectionId, Paper, PaperId};
pub use model::taxonomy::{CollectionPath, TaxonomyError, TaxonomyNode};
pub use repo::library_repo::{LibraryStore, SqliteLibraryStore, StoreError, StoreResult};
pub use service::classifier::ClassificationOutcome;
pub use service::organizer::{
    ClassificationReport, Organizer, OrganizerError, OrganizerSettings,
};
pub use service::structure_sync::SyncReport;
pub use service::tagger::TaggingReport;
pub use taxonomy::flatten::{FlattenedTaxonomy, ResolveStrategy};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
