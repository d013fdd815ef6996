//! Error handling for the sitepack CLI.
//!
//! Library errors ([`ConfigError`], [`BuildError`]) are wrapped in
//! [`CliError`], which commands return. `main` turns the final error into a
//! `miette` report so hints and diagnostic codes reach the terminal.
//!
//! # Example
//!
//! ```rust,no_run
//! use sitepack_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_template(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Check [html].template in sitepack.toml")
//! }
//! ```

use std::path::PathBuf;

use miette::Report;
use sitepack_bundler::BuildError;
use sitepack_config::ConfigError;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binding or serving failed.
    #[error("Server error: {0}")]
    Server(String),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// `check` found problems; each has already been reported.
    #[error("{0} problem(s) found")]
    CheckFailed(usize),

    #[error("{0}")]
    Custom(String),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Adds context to any error convertible into [`CliError`].
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{err}\n\nHint: {hint}"))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{msg}: {err}"))
        })
    }
}

/// Convert a CLI error into a `miette` report for display.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        // Build errors carry codes and help text of their own.
        CliError::Build(build) => Report::new(build),
        CliError::Config(config) => match config.hint() {
            Some(hint) => miette::miette!(help = hint.to_string(), "Configuration error: {config}"),
            None => miette::miette!("Configuration error: {config}"),
        },
        other => miette::miette!("{other}"),
    }
}
