//! Library organizer facade.
//!
//! # Responsibility
//! - Expose the tag, propose, implement, and classify workflows over one
//!   store and one generator.
//! - Convert lower-level failures into [`OrganizerError`].
//!
//! # Invariants
//! - No store state is cached between calls; every workflow reads fresh.
//! - Batch workflows stop at the first failing paper. Papers already
//!   processed keep their changes.

use crate::llm::extract::{extract_object, ExtractError};
use crate::llm::prompt::PromptRequest;
use crate::llm::{run_prompt, GenerationError, TextGenerator};
use crate::logging::sanitize_message;
use crate::model::library::PaperId;
use crate::model::taxonomy::TaxonomyNode;
use crate::repo::library_repo::{LibraryStore, StoreError};
use crate::service::classifier::{self, ClassificationOutcome};
use crate::service::structure_sync::{synchronize_structure, SyncReport};
use crate::service::tagger::{self, TaggingReport};
use crate::taxonomy::flatten::{FlattenedTaxonomy, ResolveStrategy};
use crate::taxonomy::proposal::{save_proposal, save_raw_reply, ProposalError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const MAX_LOG_ERROR_CHARS: usize = 400;

/// Errors from organizer workflows.
#[derive(Debug)]
pub enum OrganizerError {
    Store(StoreError),
    Generation(GenerationError),
    /// Reply held no usable taxonomy object; the full reply is kept.
    Extract {
        source: ExtractError,
        raw_response: String,
    },
    Proposal(ProposalError),
}

impl OrganizerError {
    /// Unparsed reply text of a failed proposal, if any.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Extract { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

impl Display for OrganizerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Generation(err) => write!(f, "{err}"),
            Self::Extract { source, .. } => write!(f, "{source}"),
            Self::Proposal(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OrganizerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Generation(err) => Some(err),
            Self::Extract { source, .. } => Some(source),
            Self::Proposal(err) => Some(err),
        }
    }
}

impl From<StoreError> for OrganizerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<GenerationError> for OrganizerError {
    fn from(value: GenerationError) -> Self {
        Self::Generation(value)
    }
}

impl From<ProposalError> for OrganizerError {
    fn from(value: ProposalError) -> Self {
        Self::Proposal(value)
    }
}

/// Knobs shared by every workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizerSettings {
    /// Model identifier passed with every generation request.
    pub model: String,
    /// Optional domain paragraph added to proposal prompts.
    pub field_context: Option<String>,
    pub resolution: ResolveStrategy,
}

impl OrganizerSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            field_context: None,
            resolution: ResolveStrategy::default(),
        }
    }
}

/// Classification result for one paper of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationReport {
    pub paper_id: PaperId,
    pub title: String,
    pub outcome: ClassificationOutcome,
}

/// Organizer facade over a library store and a text generator.
pub struct Organizer<S: LibraryStore, G: TextGenerator> {
    store: S,
    generator: G,
    settings: OrganizerSettings,
}

impl<S: LibraryStore, G: TextGenerator> Organizer<S, G> {
    pub fn new(store: S, generator: G, settings: OrganizerSettings) -> Self {
        Self {
            store,
            generator,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &OrganizerSettings {
        &self.settings
    }

    /// Suggests and stores keywords for one paper.
    pub fn improve_paper_keywords(
        &self,
        paper_id: PaperId,
    ) -> Result<TaggingReport, OrganizerError> {
        tagger::improve_paper_keywords(
            &self.store,
            &self.generator,
            &self.settings.model,
            paper_id,
        )
    }

    /// Runs keyword enrichment over every unclassified paper, in store order.
    pub fn tag_unclassified_papers(&self) -> Result<Vec<TaggingReport>, OrganizerError> {
        let papers = self.store.list_unclassified_papers()?;
        info!(
            "event=tag_batch module=service status=start papers={}",
            papers.len()
        );
        let mut reports = Vec::with_capacity(papers.len());
        for paper in &papers {
            match self.improve_paper_keywords(paper.id) {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(
                        "event=tag_batch module=service status=error paper_id={} done={} error={}",
                        paper.id,
                        reports.len(),
                        err
                    );
                    return Err(err);
                }
            }
        }
        info!(
            "event=tag_batch module=service status=ok papers={}",
            reports.len()
        );
        Ok(reports)
    }

    /// Asks the generator for a hierarchy covering every library keyword.
    ///
    /// On an unparseable reply the raw text travels in
    /// [`OrganizerError::Extract`] so callers can persist it.
    pub fn propose_structure(&self) -> Result<TaxonomyNode, OrganizerError> {
        let keywords: Vec<String> = self.store.list_all_keywords()?.into_iter().collect();
        if keywords.is_empty() {
            warn!("event=propose_structure module=service status=warn reason=no_keywords");
        }
        let request = PromptRequest::TaxonomyProposal {
            keywords: &keywords,
            domain_context: self.settings.field_context.as_deref(),
        };
        let reply = run_prompt(&self.generator, &self.settings.model, &request)?;

        match extract_object::<TaxonomyNode>(&reply) {
            Ok(taxonomy) => {
                info!(
                    "event=propose_structure module=service status=ok keywords={} entries={}",
                    keywords.len(),
                    taxonomy.total_entries()
                );
                Ok(taxonomy)
            }
            Err(source) => {
                error!(
                    "event=propose_structure module=service status=error error={}",
                    sanitize_message(&source.to_string(), MAX_LOG_ERROR_CHARS)
                );
                Err(OrganizerError::Extract {
                    source,
                    raw_response: reply,
                })
            }
        }
    }

    /// Proposes a hierarchy and writes it to `path` for review.
    ///
    /// When the reply cannot be parsed, it is written to the sibling
    /// `.raw.txt` file and the extraction error is returned.
    pub fn propose_structure_to(&self, path: &Path) -> Result<TaxonomyNode, OrganizerError> {
        match self.propose_structure() {
            Ok(taxonomy) => {
                save_proposal(path, &taxonomy)?;
                Ok(taxonomy)
            }
            Err(err) => {
                if let Some(raw) = err.raw_response() {
                    save_raw_reply(path, raw)?;
                }
                Err(err)
            }
        }
    }

    /// Replaces the library's collections with `taxonomy`.
    pub fn implement_structure(
        &self,
        taxonomy: &TaxonomyNode,
    ) -> Result<SyncReport, OrganizerError> {
        Ok(synchronize_structure(&self.store, taxonomy)?)
    }

    /// Reads the collection tree currently stored in the library.
    pub fn live_taxonomy(&self) -> Result<TaxonomyNode, OrganizerError> {
        let collections = self.store.list_collections()?;
        Ok(TaxonomyNode::from_collections(&collections))
    }

    /// Flattens `taxonomy` and resolves its paths against live collections.
    pub fn flatten_taxonomy(
        &self,
        taxonomy: &TaxonomyNode,
    ) -> Result<FlattenedTaxonomy, OrganizerError> {
        let collections = self.store.list_collections()?;
        let flattened =
            FlattenedTaxonomy::build(taxonomy, &collections, self.settings.resolution);
        if flattened.index.len() < flattened.paths.len() {
            warn!(
                "event=flatten_taxonomy module=service status=warn paths={} resolved={}",
                flattened.paths.len(),
                flattened.index.len()
            );
        }
        Ok(flattened)
    }

    /// Classifies one paper against an already flattened taxonomy.
    pub fn classify_paper(
        &self,
        paper_id: PaperId,
        taxonomy: &FlattenedTaxonomy,
    ) -> Result<ClassificationOutcome, OrganizerError> {
        classifier::classify_paper(
            &self.store,
            &self.generator,
            &self.settings.model,
            paper_id,
            taxonomy,
        )
    }

    /// Classifies every unclassified paper.
    ///
    /// Candidates come from `taxonomy`, or from the live collection tree when
    /// `None`. Paths are resolved once before the batch starts.
    pub fn classify_unclassified_papers(
        &self,
        taxonomy: Option<&TaxonomyNode>,
    ) -> Result<Vec<ClassificationReport>, OrganizerError> {
        let live;
        let taxonomy = match taxonomy {
            Some(taxonomy) => taxonomy,
            None => {
                live = self.live_taxonomy()?;
                &live
            }
        };
        let flattened = self.flatten_taxonomy(taxonomy)?;
        let papers = self.store.list_unclassified_papers()?;
        info!(
            "event=classify_batch module=service status=start papers={} paths={}",
            papers.len(),
            flattened.paths.len()
        );

        let mut reports = Vec::with_capacity(papers.len());
        for paper in papers {
            match self.classify_paper(paper.id, &flattened) {
                Ok(outcome) => reports.push(ClassificationReport {
                    paper_id: paper.id,
                    title: paper.title,
                    outcome,
                }),
                Err(err) => {
                    error!(
                        "event=classify_batch module=service status=error paper_id={} done={} error={}",
                        paper.id,
                        reports.len(),
                        err
                    );
                    return Err(err);
                }
            }
        }
        let assigned = reports
            .iter()
            .filter(|report| report.outcome.is_assigned())
            .count();
        info!(
            "event=classify_batch module=service status=ok papers={} assigned={}",
            reports.len(),
            assigned
        );
        Ok(reports)
    }
}
