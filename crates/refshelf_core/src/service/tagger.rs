//! Keyword enrichment for single papers.
//!
//! # Responsibility
//! - Request keyword suggestions from title and abstract.
//! - Merge suggestions into the paper's stored tags.
//!
//! # Invariants
//! - Merging only adds tags; repeated runs never shrink a keyword set.

use crate::llm::extract::extract_lines;
use crate::llm::prompt::PromptRequest;
use crate::llm::{run_prompt, TextGenerator};
use crate::model::library::{merge_keywords, PaperId};
use crate::repo::library_repo::LibraryStore;
use crate::service::organizer::OrganizerError;
use log::info;
use std::collections::BTreeSet;

/// Keyword changes applied to one paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggingReport {
    pub paper_id: PaperId,
    pub title: String,
    /// Reply lines, in reply order.
    pub suggested: Vec<String>,
    /// Suggestions the paper did not carry before.
    pub added: Vec<String>,
    /// Full keyword set after the merge.
    pub keywords: BTreeSet<String>,
}

/// Suggests keywords for `paper_id` and stores them.
pub fn improve_paper_keywords<S, G>(
    store: &S,
    generator: &G,
    model: &str,
    paper_id: PaperId,
) -> Result<TaggingReport, OrganizerError>
where
    S: LibraryStore + ?Sized,
    G: TextGenerator + ?Sized,
{
    let paper = store.get_paper(paper_id)?;
    let request = PromptRequest::Tagging {
        title: &paper.title,
        abstract_text: &paper.abstract_text,
    };
    let reply = run_prompt(generator, model, &request)?;
    let suggested = extract_lines(&reply);

    let mut expected = paper.keywords.clone();
    let added = merge_keywords(&mut expected, &suggested);
    let keywords = store.merge_paper_keywords(paper_id, &suggested)?;

    info!(
        "event=tag_paper module=service status=ok paper_id={} suggested={} added={} total={}",
        paper_id,
        suggested.len(),
        added.len(),
        keywords.len()
    );
    Ok(TaggingReport {
        paper_id,
        title: paper.title,
        suggested,
        added,
        keywords,
    })
}
