//! Organizer configuration file.
//!
//! # Responsibility
//! - Load the JSON settings file used by the command-line tool.
//! - Resolve the API key, the Zotero database, and the log directory.
//!
//! # Invariants
//! - Unknown keys are ignored.
//! - An empty configured API key counts as missing.
//! - The API key never appears in `Debug` output.

use crate::logging::default_log_level;
use crate::service::organizer::OrganizerSettings;
use crate::taxonomy::flatten::ResolveStrategy;
use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";
/// Environment variable consulted when the file holds no API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const ZOTERO_DB_FILE: &str = "zotero.sqlite";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// `model` is blank.
    MissingModel,
    /// Neither the file nor the environment provides an API key.
    MissingApiKey,
    /// No Zotero database at the configured or default locations.
    DatabaseNotFound { searched: Vec<PathBuf> },
    /// No home directory to derive default paths from.
    NoHomeDirectory,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
            Self::MissingModel => write!(f, "config key `model` must not be empty"),
            Self::MissingApiKey => write!(
                f,
                "no API key: set `anthropic_api_key` in the config or {API_KEY_ENV}"
            ),
            Self::DatabaseNotFound { searched } => {
                let searched: Vec<String> = searched
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                write!(
                    f,
                    "Zotero database not found; searched: {}",
                    searched.join(", ")
                )
            }
            Self::NoHomeDirectory => write!(f, "cannot determine the home directory"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Settings read from the config file.
#[derive(Clone, Deserialize)]
pub struct OrganizerConfig {
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    pub model: String,
    #[serde(default)]
    pub zotero_db_path: Option<PathBuf>,
    #[serde(default)]
    pub field_context: Option<String>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub path_resolution: ResolveStrategy,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Debug for OrganizerConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrganizerConfig")
            .field(
                "anthropic_api_key",
                &self.anthropic_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("model", &self.model)
            .field("zotero_db_path", &self.zotero_db_path)
            .field("field_context", &self.field_context)
            .field("api_base_url", &self.api_base_url)
            .field("path_resolution", &self.path_resolution)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl OrganizerConfig {
    /// Reads and validates the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parses config text; `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        if config.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        Ok(config)
    }

    /// Configured key, or the `ANTHROPIC_API_KEY` environment variable.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        resolve_api_key(
            self.anthropic_api_key.as_deref(),
            std::env::var(API_KEY_ENV).ok().as_deref(),
        )
    }

    /// Configured database when it exists, otherwise the first default
    /// Zotero location that does.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        let mut searched = Vec::new();
        if let Some(configured) = &self.zotero_db_path {
            if configured.is_file() {
                return Ok(configured.clone());
            }
            searched.push(configured.clone());
        }

        let home = BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or(ConfigError::NoHomeDirectory)?;
        for candidate in default_database_candidates(&home) {
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }
        Err(ConfigError::DatabaseNotFound { searched })
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    /// Configured log directory, or `<data-local>/refshelf/logs`.
    pub fn log_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.log_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("", "", "refshelf")
            .map(|dirs| dirs.data_local_dir().join("logs"))
            .ok_or(ConfigError::NoHomeDirectory)
    }

    pub fn organizer_settings(&self) -> OrganizerSettings {
        OrganizerSettings {
            model: self.model.clone(),
            field_context: self
                .field_context
                .as_deref()
                .map(str::trim)
                .filter(|context| !context.is_empty())
                .map(str::to_string),
            resolution: self.path_resolution,
        }
    }
}

fn resolve_api_key(configured: Option<&str>, from_env: Option<&str>) -> Result<String, ConfigError> {
    [configured, from_env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::MissingApiKey)
}

/// Default Zotero database locations under `home`, in search order.
///
/// `~/Zotero/zotero.sqlite` comes first, then every
/// `~/.zotero/zotero/*.default/zotero.sqlite` in name order.
pub fn default_database_candidates(home: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![home.join("Zotero").join(ZOTERO_DB_FILE)];

    let profiles_dir = home.join(".zotero").join("zotero");
    let mut profiles: Vec<PathBuf> = fs::read_dir(&profiles_dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| {
                    path.extension().is_some_and(|ext| ext == "default") && path.is_dir()
                })
                .collect()
        })
        .unwrap_or_default();
    profiles.sort();
    candidates.extend(profiles.into_iter().map(|dir| dir.join(ZOTERO_DB_FILE)));
    candidates
}
