//! Paper classification into existing collections.
//!
//! # Responsibility
//! - Ask the generator for the best-fitting paths of one paper.
//! - Keep only paths that resolve and replace the paper's membership with them.
//!
//! # Invariants
//! - Unresolvable reply lines are ignored, never created.
//! - A reply without any resolvable path leaves membership untouched.
//! - Assigned ids are distinct and keep reply order.

use crate::llm::extract::extract_lines;
use crate::llm::prompt::PromptRequest;
use crate::llm::{run_prompt, TextGenerator};
use crate::model::library::{CollectionId, PaperId};
use crate::repo::library_repo::LibraryStore;
use crate::service::organizer::OrganizerError;
use crate::taxonomy::flatten::FlattenedTaxonomy;
use log::info;

/// Result of classifying one paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationOutcome {
    /// Membership was replaced with these collections.
    Assigned {
        paths: Vec<String>,
        collection_ids: Vec<CollectionId>,
    },
    /// Nothing in the reply resolved; `candidates` holds the reply lines.
    NoMatch { candidates: Vec<String> },
}

impl ClassificationOutcome {
    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned { .. })
    }
}

/// Classifies `paper_id` against the paths of `taxonomy`.
pub fn classify_paper<S, G>(
    store: &S,
    generator: &G,
    model: &str,
    paper_id: PaperId,
    taxonomy: &FlattenedTaxonomy,
) -> Result<ClassificationOutcome, OrganizerError>
where
    S: LibraryStore + ?Sized,
    G: TextGenerator + ?Sized,
{
    let paper = store.get_paper(paper_id)?;
    let keywords = paper.keyword_list();
    let candidate_paths = taxonomy.path_strings();
    let request = PromptRequest::Classification {
        title: &paper.title,
        abstract_text: &paper.abstract_text,
        keywords: &keywords,
        candidate_paths: &candidate_paths,
    };
    let reply = run_prompt(generator, model, &request)?;
    let candidates = extract_lines(&reply);

    let (paths, collection_ids) = resolve_candidates(&candidates, taxonomy);
    if collection_ids.is_empty() {
        info!(
            "event=classify_paper module=service status=skip reason=no_match paper_id={} candidates={}",
            paper_id,
            candidates.len()
        );
        return Ok(ClassificationOutcome::NoMatch { candidates });
    }

    store.set_paper_collections(paper_id, &collection_ids)?;
    info!(
        "event=classify_paper module=service status=ok paper_id={} assigned={} candidates={}",
        paper_id,
        collection_ids.len(),
        candidates.len()
    );
    Ok(ClassificationOutcome::Assigned {
        paths,
        collection_ids,
    })
}

fn resolve_candidates(
    candidates: &[String],
    taxonomy: &FlattenedTaxonomy,
) -> (Vec<String>, Vec<CollectionId>) {
    let mut paths = Vec::new();
    let mut ids = Vec::new();
    for candidate in candidates {
        let Some(id) = taxonomy.lookup(candidate) else {
            continue;
        };
        if !ids.contains(&id) {
            ids.push(id);
            paths.push(candidate.clone());
        }
    }
    (paths, ids)
}

#[cfg(test)]
mod tests {
    use super::resolve_candidates;
    use crate::model::library::Collection;
    use crate::model::taxonomy::TaxonomyNode;
    use crate::taxonomy::flatten::{FlattenedTaxonomy, ResolveStrategy};

    #[test]
    fn resolve_candidates_skips_unknown_and_duplicate_ids() {
        let root: TaxonomyNode =
            serde_json::from_str(r#"{"Foo": {"Bar": {}}, "Bar": {}}"#).unwrap();
        let collections = vec![
            Collection {
                id: 1,
                name: "Foo".to_string(),
                parent_id: None,
            },
            Collection {
                id: 2,
                name: "Bar".to_string(),
                parent_id: Some(1),
            },
        ];
        let flattened = FlattenedTaxonomy::build(&root, &collections, ResolveStrategy::NameOnly);
        let candidates = vec![
            "Foo/Bar".to_string(),
            "Nope".to_string(),
            "Bar".to_string(),
            "Foo".to_string(),
        ];

        let (paths, ids) = resolve_candidates(&candidates, &flattened);
        assert_eq!(paths, vec!["Foo/Bar", "Foo"]);
        assert_eq!(ids, vec![2, 1]);
    }
}
