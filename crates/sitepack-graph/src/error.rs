use std::path::PathBuf;

use thiserror::Error;

use crate::runtime::RuntimeError;

pub type Result<T> = std::result::Result<T, PlanError>;

#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("no entry points to plan")]
    NoEntries,

    #[error("cannot resolve '{specifier}' imported from {}", importer.display())]
    UnresolvedReference { specifier: String, importer: PathBuf },

    #[error("illegal reference cycle: {}", format_cycle(cycle))]
    CyclicReference { cycle: Vec<PathBuf> },

    #[error("{} is not valid UTF-8", path.display())]
    InvalidEncoding { path: PathBuf },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Render a cycle as `a -> b -> a`.
pub fn format_cycle(cycle: &[PathBuf]) -> String {
    let mut parts: Vec<String> = cycle.iter().map(|p| p.display().to_string()).collect();
    if let Some(first) = parts.first().cloned() {
        parts.push(first);
    }
    parts.join(" -> ")
}
