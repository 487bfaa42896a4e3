//! Taxonomy proposal file I/O.
//!
//! # Responsibility
//! - Persist proposals as pretty-printed JSON for manual review and editing.
//! - Load reviewed proposals back with entry order preserved.
//!
//! # Invariants
//! - Files are UTF-8 JSON; every level is an object, leaves are `{}`.

use crate::model::taxonomy::TaxonomyNode;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

/// Default output file of the `propose` command.
pub const DEFAULT_PROPOSAL_FILE: &str = "proposed_collections.json";

#[derive(Debug)]
pub enum ProposalError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for ProposalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "proposal file `{}`: {source}", path.display())
            }
            Self::Format { path, source } => {
                write!(f, "invalid proposal file `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ProposalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Format { source, .. } => Some(source),
        }
    }
}

/// Writes `taxonomy` to `path` as pretty-printed JSON.
pub fn save_proposal(path: &Path, taxonomy: &TaxonomyNode) -> Result<(), ProposalError> {
    let mut text = serde_json::to_string_pretty(taxonomy).map_err(|source| {
        ProposalError::Format {
            path: path.to_path_buf(),
            source,
        }
    })?;
    text.push('\n');
    write_file(path, &text)?;
    info!(
        "event=proposal_save module=taxonomy status=ok entries={} path={}",
        taxonomy.total_entries(),
        path.display()
    );
    Ok(())
}

/// Reads a proposal file written by [`save_proposal`] or edited by hand.
pub fn load_proposal(path: &Path) -> Result<TaxonomyNode, ProposalError> {
    let text = fs::read_to_string(path).map_err(|source| ProposalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let taxonomy: TaxonomyNode = serde_json::from_str(&text).map_err(|source| {
        error!(
            "event=proposal_load module=taxonomy status=error error_code=invalid_json path={}",
            path.display()
        );
        ProposalError::Format {
            path: path.to_path_buf(),
            source,
        }
    })?;
    info!(
        "event=proposal_load module=taxonomy status=ok entries={} path={}",
        taxonomy.total_entries(),
        path.display()
    );
    Ok(taxonomy)
}

/// Sibling file that receives the raw reply when a proposal cannot be parsed.
pub fn raw_reply_path(proposal_path: &Path) -> PathBuf {
    let mut name = proposal_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| DEFAULT_PROPOSAL_FILE.into());
    name.push(".raw.txt");
    proposal_path.with_file_name(name)
}

/// Stores an unparseable reply next to the intended proposal file.
pub fn save_raw_reply(proposal_path: &Path, reply: &str) -> Result<PathBuf, ProposalError> {
    let path = raw_reply_path(proposal_path);
    write_file(&path, reply)?;
    info!(
        "event=raw_reply_save module=taxonomy status=ok path={}",
        path.display()
    );
    Ok(path)
}

fn write_file(path: &Path, contents: &str) -> Result<(), ProposalError> {
    fs::write(path, contents).map_err(|source| {
        error!(
            "event=file_write module=taxonomy status=error path={} error={}",
            path.display(),
            source
        );
        ProposalError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{load_proposal, raw_reply_path, save_proposal, save_raw_reply, ProposalError};
    use crate::model::taxonomy::TaxonomyNode;
    use std::path::Path;

    #[test]
    fn save_and_load_preserve_order_and_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proposal.json");
        let taxonomy: TaxonomyNode = serde_json::from_str(
            r#"{"Zustandsschätzung": {"Kalman": {}, "Beobachter": {}}, "Alterung": {}}"#,
        )
        .unwrap();

        save_proposal(&path, &taxonomy).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Zustandsschätzung"));
        assert!(text.find("Kalman").unwrap() < text.find("Beobachter").unwrap());

        let loaded = load_proposal(&path).unwrap();
        assert_eq!(loaded, taxonomy);
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            load_proposal(&missing).unwrap_err(),
            ProposalError::Io { .. }
        ));

        let malformed = dir.path().join("bad.json");
        std::fs::write(&malformed, "{\"A\": ").unwrap();
        assert!(matches!(
            load_proposal(&malformed).unwrap_err(),
            ProposalError::Format { .. }
        ));
    }

    #[test]
    fn raw_reply_is_written_next_to_proposal() {
        let dir = tempfile::tempdir().unwrap();
        let proposal = dir.path().join("out.json");
        assert_eq!(
            raw_reply_path(&proposal),
            dir.path().join("out.json.raw.txt")
        );

        let written = save_raw_reply(&proposal, "not json").unwrap();
        assert_eq!(std::fs::read_to_string(written).unwrap(), "not json");
        assert_eq!(
            raw_reply_path(Path::new("p.json")),
            Path::new("p.json.raw.txt")
        );
    }
}
