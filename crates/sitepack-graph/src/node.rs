use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sitepack_config::TransformId;

use crate::reference::ReferenceKind;

/// Stable identifier of a source file: its path relative to the project
/// root, with `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Build an id for `path` relative to `root`.
    ///
    /// Paths outside the root keep their `..` components.
    pub fn from_path(root: &Path, path: &Path) -> Self {
        let relative = relative_path(root, path);
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Self::new(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id without its final extension (`src/docs/App.ts` -> `src/docs/App`).
    pub fn stem(&self) -> &str {
        let file_start = self.0.rfind('/').map_or(0, |i| i + 1);
        match self.0[file_start..].rfind('.') {
            Some(dot) if dot > 0 => &self.0[..file_start + dot],
            _ => &self.0,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broad language family of a source file, used for reference extraction
/// and for classifying edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Script,
    Style,
    Sass,
    Document,
    Data,
    Text,
    File,
}

impl SourceKind {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "mts" | "cts" => SourceKind::Script,
            "css" => SourceKind::Style,
            "scss" | "sass" => SourceKind::Sass,
            "html" | "htm" => SourceKind::Document,
            "json" => SourceKind::Data,
            "txt" => SourceKind::Text,
            _ => SourceKind::File,
        }
    }

    /// Whether the transformed output of this kind is a JavaScript module.
    pub fn is_module(self) -> bool {
        matches!(self, SourceKind::Script | SourceKind::Data | SourceKind::Text)
    }

    /// Whether references are extracted from this kind.
    pub fn is_textual(self) -> bool {
        !matches!(self, SourceKind::File | SourceKind::Data | SourceKind::Text)
    }
}

/// A resolved outgoing reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Specifier as written in the source, query and fragment removed.
    pub specifier: String,
    pub kind: ReferenceKind,
    pub target: NodeId,
}

/// One discovered file.
///
/// Immutable once planned; a rebuild plans fresh nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNode {
    pub id: NodeId,
    pub path: PathBuf,
    /// Lowercased extension without the dot; empty when the file has none.
    pub extension: String,
    pub kind: SourceKind,
    pub raw: Arc<[u8]>,
    /// Transforms selected for this file, in application order.
    pub transforms: Vec<TransformId>,
    /// Resolved references in source order.
    pub dependencies: Vec<Dependency>,
}

impl SourceNode {
    pub fn raw_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.raw).ok()
    }

    pub fn depends_on(&self, target: &NodeId) -> bool {
        self.dependencies.iter().any(|d| &d.target == target)
    }
}

pub(crate) fn relative_path(root: &Path, path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix(root) {
        return stripped.to_path_buf();
    }

    let root_parts: Vec<_> = root.components().collect();
    let path_parts: Vec<_> = path.components().collect();
    let common = root_parts
        .iter()
        .zip(&path_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..root_parts.len() {
        out.push("..");
    }
    for part in &path_parts[common..] {
        out.push(part.as_os_str());
    }
    out
}
