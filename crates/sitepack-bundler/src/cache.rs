//! Per-node transform cache for incremental rebuilds.
//!
//! A node's output depends on its own bytes, the bytes of everything inlined
//! into it (Sass partials, HTML includes), its transform chain and the mode.
//! The cache key is a BLAKE3 hash over exactly those inputs, so a rebuild
//! re-runs only nodes whose key changed.

use blake3::Hasher;
use rustc_hash::{FxHashMap, FxHashSet};
use sitepack_config::ModeFlags;
use sitepack_graph::{NodeId, SourceGraph, SourceNode};

use crate::content::Content;

/// Increment when the meaning of cached content changes.
const CACHE_FORMAT_VERSION: u32 = 1;

/// Content-addressed key of one node's transform inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransformKey(blake3::Hash);

impl TransformKey {
    pub fn compute(graph: &SourceGraph, node: &SourceNode, flags: ModeFlags) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(&CACHE_FORMAT_VERSION.to_le_bytes());
        hasher.update(format!("{flags:?}").as_bytes());

        for id in &node.transforms {
            hasher.update(id.to_string().as_bytes());
            hasher.update(b"\0");
        }
        hash_source(&mut hasher, node);

        let mut inlined = graph.inline_dependencies(&node.id);
        inlined.sort();
        for id in inlined {
            if let Some(dep) = graph.node(&id) {
                hash_source(&mut hasher, dep);
            }
        }
        Self(hasher.finalize())
    }

    pub fn as_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

fn hash_source(hasher: &mut Hasher, node: &SourceNode) {
    hasher.update(node.id.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(blake3::hash(&node.raw).as_bytes());
}

#[derive(Debug, Clone)]
struct CachedTransform {
    key: TransformKey,
    content: Content,
}

/// Transformed content of the previous build, per node.
#[derive(Debug, Clone, Default)]
pub struct TransformCache {
    entries: FxHashMap<NodeId, CachedTransform>,
}

impl TransformCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content for `id` if it was produced from the same inputs.
    pub fn get(&self, id: &NodeId, key: TransformKey) -> Option<&Content> {
        self.entries
            .get(id)
            .filter(|cached| cached.key == key)
            .map(|cached| &cached.content)
    }

    /// Last good content for `id`, whatever its inputs were.
    pub fn stale(&self, id: &NodeId) -> Option<&Content> {
        self.entries.get(id).map(|cached| &cached.content)
    }

    pub fn insert(&mut self, id: NodeId, key: TransformKey, content: Content) {
        self.entries.insert(id, CachedTransform { key, content });
    }

    /// Drop nodes that are no longer part of the graph.
    pub fn retain_graph(&mut self, graph: &SourceGraph) {
        self.entries.retain(|id, _| graph.contains(id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Nodes whose transform inputs changed between two builds.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Present before, different key now.
    pub modified: FxHashSet<NodeId>,
    /// Not present in the previous build.
    pub added: FxHashSet<NodeId>,
    /// Present before, gone now.
    pub removed: FxHashSet<NodeId>,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        !self.modified.is_empty() || !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Modified and added nodes.
    pub fn changed(&self) -> FxHashSet<NodeId> {
        self.modified.union(&self.added).cloned().collect()
    }
}

/// Compare the keys of the current graph with the previous build's.
pub fn detect_changes(
    previous: &FxHashMap<NodeId, TransformKey>,
    current: &FxHashMap<NodeId, TransformKey>,
) -> ChangeSet {
    let mut changes = ChangeSet::default();
    for (id, key) in current {
        match previous.get(id) {
            Some(old) if old == key => {}
            Some(_) => {
                changes.modified.insert(id.clone());
            }
            None => {
                changes.added.insert(id.clone());
            }
        }
    }
    for id in previous.keys() {
        if !current.contains_key(id) {
            changes.removed.insert(id.clone());
        }
    }
    changes
}
