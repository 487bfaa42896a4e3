//! Generative text service boundary.
//!
//! # Responsibility
//! - Define the text-in/text-out contract consumed by the organizer.
//! - Host prompt assembly and reply extraction helpers.
//!
//! # Invariants
//! - Callers never depend on a concrete provider; they use [`TextGenerator`].
//! - Every request carries exactly one user-role prompt.

use crate::llm::prompt::PromptRequest;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub mod anthropic;
pub mod extract;
pub mod prompt;

pub type GenerationResult<T> = Result<T, GenerationError>;

/// One completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub max_tokens: u32,
    /// `None` keeps the provider default.
    pub temperature: Option<f32>,
    pub prompt: String,
}

/// Errors from the generative service.
#[derive(Debug)]
pub enum GenerationError {
    /// Transport-level failure.
    Http(reqwest::Error),
    /// Provider answered with a non-success status.
    Api { status: u16, body_excerpt: String },
    /// Provider answered without any text content.
    EmptyResponse,
    /// Client configuration is unusable (missing key, bad header value).
    InvalidConfig(String),
    /// Provider-independent failure, used by alternative generators.
    Other(String),
}

impl Display for GenerationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "generation request failed: {err}"),
            Self::Api {
                status,
                body_excerpt,
            } => write!(f, "generation service returned {status}: {body_excerpt}"),
            Self::EmptyResponse => write!(f, "generation service returned no text"),
            Self::InvalidConfig(message) => write!(f, "invalid generation config: {message}"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for GenerationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Opaque text generator.
pub trait TextGenerator {
    /// Sends one prompt and returns the reply text.
    fn generate(&self, request: &GenerationRequest) -> GenerationResult<String>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, request: &GenerationRequest) -> GenerationResult<String> {
        (**self).generate(request)
    }
}

/// Renders `request` for `model`, sends it, and logs the round trip.
pub fn run_prompt<G: TextGenerator + ?Sized>(
    generator: &G,
    model: &str,
    request: &PromptRequest<'_>,
) -> GenerationResult<String> {
    let started = Instant::now();
    let generation = request.to_generation_request(model);
    match generator.generate(&generation) {
        Ok(reply) => {
            info!(
                "event=prompt_run module=llm status=ok purpose={} prompt_chars={} reply_chars={} duration_ms={}",
                request.purpose(),
                generation.prompt.chars().count(),
                reply.chars().count(),
                started.elapsed().as_millis()
            );
            Ok(reply)
        }
        Err(err) => {
            error!(
                "event=prompt_run module=llm status=error purpose={} duration_ms={} error={}",
                request.purpose(),
                started.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}
