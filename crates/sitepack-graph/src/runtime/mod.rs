//! File access abstraction for the planner.
//!
//! The planner never touches `std::fs` directly. [`NativeRuntime`] reads the
//! real filesystem through tokio; [`MemoryRuntime`] serves a virtual tree for
//! tests and in-memory builds.

mod memory;
mod native;

pub use memory::MemoryRuntime;
pub use native::NativeRuntime;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl RuntimeError {
    pub(crate) fn from_io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            RuntimeError::FileNotFound(path.to_path_buf())
        } else {
            RuntimeError::Io {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
        }
    }
}

/// Platform runtime trait
///
/// Paths handed to a runtime are always absolute and normalized.
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file's bytes
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Check if a regular file exists
    fn is_file(&self, path: &Path) -> bool;

    /// Check if a directory exists
    fn is_dir(&self, path: &Path) -> bool;
}
