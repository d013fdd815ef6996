//! Error types for configuration validation and loading.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Filesystem validation errors (for CLI use)
    #[error("entry path not found: {}", path.display())]
    EntryNotFound { path: PathBuf },

    #[error("HTML template not found: {}", path.display())]
    TemplateNotFound { path: PathBuf },

    // Config parsing/loading errors
    #[error("config not found")]
    NotFound,

    #[error(
        "invalid config value for '{field}'{}",
        hint.as_ref().map(|h| format!(": {h}")).unwrap_or_default()
    )]
    InvalidValue { field: String, hint: Option<String> },

    #[error("unknown transform '{0}'")]
    UnknownTransform(String),

    // Schema validation errors (no filesystem checks)
    #[error("no entries specified")]
    NoEntries,

    #[error("schema validation failed: {message}")]
    SchemaValidation {
        message: String,
        hint: Option<String>,
    },

    #[error("failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Actionable hint for the user, when one is known.
    pub fn hint(&self) -> Option<&str> {
        match self {
            ConfigError::InvalidValue { hint, .. } | ConfigError::SchemaValidation { hint, .. } => {
                hint.as_deref()
            }
            ConfigError::NoEntries => {
                Some("Add at least one entry under [entries] in sitepack.toml")
            }
            ConfigError::UnknownTransform(_) => Some(
                "Known transforms: style, sass, script, typescript, file, raw, json, html, \
                 command:<program>",
            ),
            ConfigError::EntryNotFound { .. } => Some("Check the entry paths in sitepack.toml"),
            ConfigError::TemplateNotFound { .. } => Some("Check [html].template in sitepack.toml"),
            _ => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Extract(Box::new(err))
    }
}
