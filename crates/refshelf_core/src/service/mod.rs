//! Organizer workflows.
//!
//! # Responsibility
//! - Orchestrate store, generator, and taxonomy calls into use-case APIs.
//! - Keep the CLI decoupled from storage and provider details.

pub mod classifier;
pub mod organizer;
pub mod structure_sync;
pub mod tagger;
