//! Error types for transformation, emission and whole builds.

use std::path::PathBuf;

use miette::Diagnostic;
use sitepack_config::ConfigError;
use sitepack_graph::PlanError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildError>;

/// A transform step failed.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{transform} (step {} of the chain) failed on {}: {cause}", position + 1, path.display())]
#[diagnostic(code(sitepack::transform))]
pub struct TransformError {
    /// Source file, relative to the project root.
    pub path: PathBuf,
    /// Zero-based index of the failing step in the chain.
    pub position: usize,
    pub transform: String,
    pub cause: String,
}

/// Writing output failed.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum EmitError {
    #[error("output path '{path}' escapes the output directory")]
    #[diagnostic(code(sitepack::emit), help("Filename templates must stay inside out_dir"))]
    InvalidPath { path: String },

    #[error("failed to write {}: {message}", path.display())]
    #[diagnostic(code(sitepack::emit))]
    Write { path: PathBuf, message: String },

    #[error("failed to clean {}: {message}", path.display())]
    #[diagnostic(code(sitepack::emit))]
    Clean { path: PathBuf, message: String },
}

/// Any failure that ends a build run.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    #[diagnostic(code(sitepack::config))]
    Config(#[from] ConfigError),

    #[error("{0}")]
    #[diagnostic(
        code(sitepack::plan::unresolved),
        help("Check the import path and the resolve.modules roots")
    )]
    Unresolved(PlanError),

    #[error("{0}")]
    #[diagnostic(
        code(sitepack::plan::cycle),
        help(
            "Only script modules may import each other in a cycle; \
             break the loop between these files"
        )
    )]
    Cycle(PlanError),

    #[error("{0}")]
    #[diagnostic(code(sitepack::plan))]
    Plan(PlanError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Emit(#[from] EmitError),

    #[error("I/O error: {0}")]
    #[diagnostic(code(sitepack::io))]
    Io(#[from] std::io::Error),

    #[error("build cancelled")]
    #[diagnostic(code(sitepack::cancelled))]
    Cancelled,

    #[error("invalid pipeline transition from {from} to {to}")]
    #[diagnostic(code(sitepack::pipeline))]
    InvalidTransition {
        from: crate::pipeline::PipelineState,
        to: crate::pipeline::PipelineState,
    },

    #[error("build task failed: {0}")]
    #[diagnostic(code(sitepack::internal))]
    Internal(String),
}

impl From<PlanError> for BuildError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::UnresolvedReference { .. } => BuildError::Unresolved(err),
            PlanError::CyclicReference { .. } => BuildError::Cycle(err),
            other => BuildError::Plan(other),
        }
    }
}

impl BuildError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled)
    }
}
