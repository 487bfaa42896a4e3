//! Prompt templates for tagging, taxonomy proposal, and classification.
//!
//! # Responsibility
//! - Render one user prompt per purpose from its inputs.
//! - Pair every purpose with its generation settings.
//!
//! # Invariants
//! - Pure: no I/O, no store or network access.
//! - Size and depth guidance inside prompts is advisory only.

use super::GenerationRequest;

/// Upper bound on total collections suggested to the model.
pub const MAX_PROPOSED_COLLECTIONS: usize = 100;

/// Inputs for one prompt purpose.
#[derive(Debug, Clone, Copy)]
pub enum PromptRequest<'a> {
    /// Suggest keywords for one paper.
    Tagging {
        title: &'a str,
        abstract_text: &'a str,
    },
    /// Propose a collection hierarchy from the library's keywords.
    TaxonomyProposal {
        /// Sorted keyword list.
        keywords: &'a [String],
        domain_context: Option<&'a str>,
    },
    /// Pick the best collection paths for one paper.
    Classification {
        title: &'a str,
        abstract_text: &'a str,
        keywords: &'a [String],
        candidate_paths: &'a [String],
    },
}

/// Output size and determinism for one purpose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl PromptRequest<'_> {
    pub fn settings(&self) -> GenerationSettings {
        match self {
            Self::Tagging { .. } => GenerationSettings {
                max_tokens: 500,
                temperature: None,
            },
            Self::TaxonomyProposal { .. } => GenerationSettings {
                max_tokens: 4000,
                temperature: Some(0.0),
            },
            Self::Classification { .. } => GenerationSettings {
                max_tokens: 500,
                temperature: Some(0.0),
            },
        }
    }

    /// Rendered prompt plus settings, ready for a [`super::TextGenerator`].
    pub fn to_generation_request(&self, model: &str) -> GenerationRequest {
        let settings = self.settings();
        GenerationRequest {
            model: model.to_string(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            prompt: build_prompt(self),
        }
    }

    /// Short purpose label for logs.
    pub fn purpose(&self) -> &'static str {
        match self {
            Self::Tagging { .. } => "tagging",
            Self::TaxonomyProposal { .. } => "taxonomy_proposal",
            Self::Classification { .. } => "classification",
        }
    }
}

/// Renders the prompt text for `request`.
pub fn build_prompt(request: &PromptRequest<'_>) -> String {
    match request {
        PromptRequest::Tagging {
            title,
            abstract_text,
        } => format!(
            "Suggest generic, reusable keywords for this paper. Terms should focus on the main \
             process, technique, or concept; avoid overly broad terms. Include only the most \
             relevant keywords.\n\
             Title: {title}\n\
             Abstract: {abstract_text}\n\
             List only keywords, one per line."
        ),
        PromptRequest::TaxonomyProposal {
            keywords,
            domain_context,
        } => {
            let mut prompt = format!(
                "Given these keywords from a research paper library:\n{}\n\n",
                keywords.join("\n")
            );
            if let Some(context) = domain_context.map(str::trim).filter(|c| !c.is_empty()) {
                prompt.push_str(context);
                prompt.push_str("\n\n");
            }
            prompt.push_str(&format!(
                "Create a hierarchical collection structure as JSON to organize papers with these \
                 topics. Every level is an object mapping a collection name to an object of its \
                 sub-collections; use an empty object for collections without sub-collections. \
                 Collection names must not contain the character \"/\".\n\
                 Return ONLY valid JSON, with no trailing commas. Limit the proposal to a maximum \
                 of {MAX_PROPOSED_COLLECTIONS} total collections.\n\
                 Do not repeat the parent collection's name in a sub-collection name. For example, \
                 under a parent collection called Battery Aging, name sub-collections Aging \
                 Mechanisms or Black Box Modelling rather than repeating Battery Aging."
            ));
            prompt
        }
        PromptRequest::Classification {
            title,
            abstract_text,
            keywords,
            candidate_paths,
        } => format!(
            "Given this paper:\n\
             Title: {title}\n\
             Abstract: {abstract_text}\n\
             Keywords: {}\n\n\
             And these available collections:\n\
             {}\n\n\
             List the most appropriate collections for this paper. Output only the exact \
             collection paths, one per line.\n\
             Choose between 1-3 most relevant collections.",
            keywords.join(", "),
            candidate_paths.join("\n")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{build_prompt, PromptRequest};

    #[test]
    fn tagging_prompt_embeds_title_and_abstract() {
        let prompt = build_prompt(&PromptRequest::Tagging {
            title: "Lithium plating",
            abstract_text: "We study plating at low temperature.",
        });
        assert!(prompt.contains("Title: Lithium plating"));
        assert!(prompt.contains("Abstract: We study plating at low temperature."));
        assert!(prompt.ends_with("one per line."));
    }

    #[test]
    fn taxonomy_prompt_lists_keywords_and_optional_context() {
        let keywords = vec!["aging".to_string(), "impedance".to_string()];
        let with_context = build_prompt(&PromptRequest::TaxonomyProposal {
            keywords: &keywords,
            domain_context: Some("The library covers battery research."),
        });
        assert!(with_context.contains("aging\nimpedance"));
        assert!(with_context.contains("The library covers battery research."));
        assert!(with_context.contains("maximum of 100 total collections"));

        let without_context = build_prompt(&PromptRequest::TaxonomyProposal {
            keywords: &keywords,
            domain_context: Some("   "),
        });
        assert!(!without_context.contains("battery research"));
    }

    #[test]
    fn classification_prompt_lists_candidate_paths_in_order() {
        let keywords = vec!["aging".to_string()];
        let paths = vec!["Foo".to_string(), "Foo/Bar".to_string()];
        let prompt = build_prompt(&PromptRequest::Classification {
            title: "T",
            abstract_text: "A",
            keywords: &keywords,
            candidate_paths: &paths,
        });
        assert!(prompt.contains("Keywords: aging"));
        assert!(prompt.contains("Foo\nFoo/Bar"));
        assert!(prompt.contains("1-3"));
    }

    #[test]
    fn settings_follow_purpose() {
        let keywords: Vec<String> = Vec::new();
        let proposal = PromptRequest::TaxonomyProposal {
            keywords: &keywords,
            domain_context: None,
        };
        assert_eq!(proposal.settings().max_tokens, 4000);
        assert_eq!(proposal.settings().temperature, Some(0.0));

        let tagging = PromptRequest::Tagging {
            title: "",
            abstract_text: "",
        };
        assert_eq!(tagging.settings().temperature, None);
        assert_eq!(tagging.purpose(), "tagging");

        let request = proposal.to_generation_request("model-x");
        assert_eq!(request.model, "model-x");
        assert_eq!(request.max_tokens, 4000);
        assert!(request.prompt.starts_with("Given these keywords"));
    }
}
