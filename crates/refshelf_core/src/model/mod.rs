//! Domain model for papers, collections, and taxonomies.
//!
//! # Responsibility
//! - Define the data structures shared by store, prompts, and services.
//!
//! # Invariants
//! - Collection names in a taxonomy are non-blank and contain no `/`.

pub mod library;
pub mod taxonomy;
