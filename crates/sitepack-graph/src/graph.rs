//! The planned source graph.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::node::{NodeId, SourceNode};
use crate::reference::ReferenceKind;

/// A named entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub id: NodeId,
}

/// Directed graph of source files. Edges point from importer to dependency.
///
/// Node order is discovery order, which is deterministic for a given tree.
#[derive(Debug, Clone)]
pub struct SourceGraph {
    root: PathBuf,
    graph: DiGraph<SourceNode, ReferenceKind>,
    index: FxHashMap<NodeId, NodeIndex>,
    entries: Vec<Entry>,
    document: Option<NodeId>,
}

impl SourceGraph {
    /// Assemble a graph from planned nodes. Dependencies on ids that are not
    /// part of `nodes` are dropped.
    pub fn from_nodes(
        root: impl Into<PathBuf>,
        nodes: Vec<SourceNode>,
        entries: Vec<Entry>,
        document: Option<NodeId>,
    ) -> Self {
        let mut graph = DiGraph::with_capacity(nodes.len(), nodes.len() * 2);
        let mut index = FxHashMap::default();
        for node in nodes {
            let id = node.id.clone();
            let ix = graph.add_node(node);
            index.insert(id, ix);
        }

        let indices: Vec<NodeIndex> = graph.node_indices().collect();
        for from in indices {
            let edges: Vec<(NodeIndex, ReferenceKind)> = graph[from]
                .dependencies
                .iter()
                .filter_map(|dep| index.get(&dep.target).map(|&to| (to, dep.kind)))
                .collect();
            for (to, kind) in edges {
                graph.add_edge(from, to, kind);
            }
        }

        Self {
            root: root.into(),
            graph,
            index,
            entries,
            document,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&SourceNode> {
        self.index.get(id).map(|&ix| &self.graph[ix])
    }

    /// Nodes in discovery order.
    pub fn nodes(&self) -> impl Iterator<Item = &SourceNode> {
        self.graph.node_indices().map(|ix| &self.graph[ix])
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entry name of a script entry node, if it is one.
    pub fn entry_name(&self, id: &NodeId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| &e.id == id)
            .map(|e| e.name.as_str())
    }

    /// The HTML template node, when one was planned.
    pub fn document(&self) -> Option<&SourceNode> {
        self.document.as_ref().and_then(|id| self.node(id))
    }

    /// Direct importers of `id`, in discovery order, with the edge kind.
    pub fn importers(&self, id: &NodeId) -> Vec<(&NodeId, ReferenceKind)> {
        let Some(&ix) = self.index.get(id) else {
            return Vec::new();
        };
        let mut importers: Vec<(NodeIndex, ReferenceKind)> = self
            .graph
            .edges_directed(ix, Direction::Incoming)
            .map(|edge| (edge.source(), *edge.weight()))
            .collect();
        importers.sort_by_key(|(source, _)| *source);
        importers.dedup_by_key(|(source, _)| *source);
        importers
            .into_iter()
            .map(|(source, kind)| (&self.graph[source].id, kind))
            .collect()
    }

    /// Everything that reaches `id` through one or more edges.
    pub fn transitive_importers(&self, id: &NodeId) -> Vec<NodeId> {
        self.walk(id, Direction::Incoming, |_| true)
    }

    /// Everything `id` reaches through one or more edges.
    pub fn transitive_dependencies(&self, id: &NodeId) -> Vec<NodeId> {
        self.walk(id, Direction::Outgoing, |_| true)
    }

    /// Nodes inlined into `id`, directly or through other inlined nodes.
    pub fn inline_dependencies(&self, id: &NodeId) -> Vec<NodeId> {
        self.walk(id, Direction::Outgoing, ReferenceKind::is_inline)
    }

    /// Nodes that inline `id`, directly or transitively.
    pub fn inline_owners(&self, id: &NodeId) -> Vec<NodeId> {
        self.walk(id, Direction::Incoming, ReferenceKind::is_inline)
    }

    /// A node is only ever inlined when it has importers and all of them
    /// inline it. Such nodes produce no output file of their own.
    pub fn is_inline_only(&self, id: &NodeId) -> bool {
        let Some(&ix) = self.index.get(id) else {
            return false;
        };
        let mut incoming = self.graph.edges_directed(ix, Direction::Incoming).peekable();
        incoming.peek().is_some() && incoming.all(|edge| edge.weight().is_inline())
    }

    /// Strongly connected components, dependencies before their importers.
    /// Members of each component are in discovery order.
    pub fn components(&self) -> Vec<Vec<NodeId>> {
        petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .map(|mut component| {
                component.sort();
                component
                    .into_iter()
                    .map(|ix| self.graph[ix].id.clone())
                    .collect()
            })
            .collect()
    }

    /// Edges as `(from, to, kind)` in discovery order.
    pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId, ReferenceKind)> {
        self.graph.edge_references().map(|edge| {
            (
                &self.graph[edge.source()].id,
                &self.graph[edge.target()].id,
                *edge.weight(),
            )
        })
    }

    /// Shortest path from `from` to `to` following outgoing edges.
    pub fn path_between(&self, from: &NodeId, to: &NodeId) -> Option<Vec<NodeId>> {
        let (&start, &goal) = (self.index.get(from)?, self.index.get(to)?);
        let mut parent: FxHashMap<NodeIndex, NodeIndex> = FxHashMap::default();
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([start]);
        seen.insert(start);

        while let Some(current) = queue.pop_front() {
            if current == goal {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(&prev) = parent.get(&cursor) {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                return Some(path.into_iter().map(|ix| self.graph[ix].id.clone()).collect());
            }
            let mut next: Vec<NodeIndex> = self.graph.neighbors(current).collect();
            next.sort();
            for n in next {
                if seen.insert(n) {
                    parent.insert(n, current);
                    queue.push_back(n);
                }
            }
        }
        None
    }

    fn walk(
        &self,
        id: &NodeId,
        direction: Direction,
        follow: impl Fn(ReferenceKind) -> bool,
    ) -> Vec<NodeId> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };
        let mut seen = FxHashSet::default();
        seen.insert(start);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();

        while let Some(current) = queue.pop_front() {
            let mut next: Vec<NodeIndex> = self
                .graph
                .edges_directed(current, direction)
                .filter(|edge| follow(*edge.weight()))
                .map(|edge| match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                })
                .collect();
            next.sort();
            for n in next {
                if seen.insert(n) {
                    out.push(self.graph[n].id.clone());
                    queue.push_back(n);
                }
            }
        }
        out
    }
}
