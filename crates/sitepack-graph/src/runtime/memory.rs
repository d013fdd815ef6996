use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Runtime, RuntimeError, RuntimeResult};

/// Virtual filesystem keyed by absolute path.
///
/// ```
/// use sitepack_graph::runtime::MemoryRuntime;
///
/// let fs = MemoryRuntime::new("/project")
///     .with_file("src/index.ts", "import './style.css';")
///     .with_file("src/style.css", "body { margin: 0 }");
/// assert_eq!(fs.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MemoryRuntime {
    root: PathBuf,
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryRuntime {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Builder form of [`MemoryRuntime::insert`].
    pub fn with_file(self, relative: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(relative, content);
        self
    }

    /// Add or replace a file, relative to the root.
    pub fn insert(&self, relative: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path_clean::clean(self.root.join(relative));
        self.files.write().insert(path, content.into());
    }

    pub fn remove(&self, relative: impl AsRef<Path>) -> bool {
        let path = path_clean::clean(self.root.join(relative));
        self.files.write().remove(&path).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| RuntimeError::FileNotFound(path.to_path_buf()))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .read()
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }
}
