//! Structured-object recovery from free-form model replies.
//!
//! # Responsibility
//! - Locate the first balanced JSON object in noisy text and deserialize it.
//! - Split line-oriented replies into trimmed entries.
//!
//! # Invariants
//! - Malformed input yields an [`ExtractError`], never a panic.
//! - Braces inside JSON string literals do not affect nesting depth.
//! - Error excerpts are capped at [`EXCERPT_CHARS`] characters and keep the
//!   reply's line breaks.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const EXCERPT_CHARS: usize = 200;
const FENCE: &str = "```";

static LANGUAGE_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_+.-]*[ \t]*(\r?\n|$)").expect("valid language tag regex")
});

static LIST_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*\u{2022}]|\d+[.)])\s+").expect("valid list marker regex"));

/// Why no object could be recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The text holds no `{` at all.
    NoObjectFound { excerpt: String },
    /// An object starts but its closing brace never arrives.
    Unbalanced { excerpt: String },
    /// The candidate span is not a valid object of the requested shape.
    Parse { message: String, excerpt: String },
}

impl ExtractError {
    /// Leading part of the original reply, for diagnostics.
    pub fn excerpt(&self) -> &str {
        match self {
            Self::NoObjectFound { excerpt }
            | Self::Unbalanced { excerpt }
            | Self::Parse { excerpt, .. } => excerpt,
        }
    }
}

impl Display for ExtractError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoObjectFound { excerpt } => write!(f, "no object found in reply: {excerpt}"),
            Self::Unbalanced { excerpt } => {
                write!(f, "could not find complete object in reply: {excerpt}")
            }
            Self::Parse { message, excerpt } => {
                write!(f, "failed to parse object ({message}): {excerpt}")
            }
        }
    }
}

impl Error for ExtractError {}

/// Recovers the first JSON object from `text` and deserializes it as `T`.
pub fn extract_object<T: DeserializeOwned>(text: &str) -> Result<T, ExtractError> {
    let excerpt = || excerpt_of(text.trim());
    let body = strip_fence(text.trim());

    let Some(start) = body.find('{') else {
        warn!("event=extract_object module=llm status=error error_code=no_object");
        return Err(ExtractError::NoObjectFound { excerpt: excerpt() });
    };
    let Some(end) = matching_brace(body, start) else {
        warn!("event=extract_object module=llm status=error error_code=unbalanced");
        return Err(ExtractError::Unbalanced { excerpt: excerpt() });
    };

    serde_json::from_str(&body[start..=end]).map_err(|err| {
        warn!(
            "event=extract_object module=llm status=error error_code=parse_failed line={} column={}",
            err.line(),
            err.column()
        );
        ExtractError::Parse {
            message: err.to_string(),
            excerpt: excerpt(),
        }
    })
}

/// First [`EXCERPT_CHARS`] characters of `text`, with `...` appended when cut.
fn excerpt_of(text: &str) -> String {
    let mut excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().nth(EXCERPT_CHARS).is_some() {
        excerpt.push_str("...");
    }
    excerpt
}

/// Splits a one-entry-per-line reply, dropping blank lines and list markers.
pub fn extract_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .map(|line| LIST_MARKER_RE.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Content of the first fenced block without its language tag, or the whole
/// text when there is no fence.
fn strip_fence(text: &str) -> &str {
    let Some(open) = text.find(FENCE) else {
        return text;
    };
    let after_open = &text[open + FENCE.len()..];
    let block = match after_open.find(FENCE) {
        Some(close) => &after_open[..close],
        None => after_open,
    };
    match LANGUAGE_TAG_RE.find(block) {
        Some(tag) => block[tag.end()..].trim(),
        None => block.trim(),
    }
}

/// Byte index of the `}` closing the object that opens at `start`.
fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
