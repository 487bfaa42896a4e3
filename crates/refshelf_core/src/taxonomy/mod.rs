//! Taxonomy processing outside the store.
//!
//! # Responsibility
//! - Flatten proposals into ordered collection paths and resolve them to ids.
//! - Read and write the taxonomy proposal file.

pub mod flatten;
pub mod proposal;
