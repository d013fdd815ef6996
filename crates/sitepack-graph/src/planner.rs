//! Pipeline planner: walks references from the entry points into a graph.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use sitepack_config::{RuleTable, SitepackConfig};
use tracing::{debug, instrument};

use crate::cycles::check_cycles;
use crate::error::{PlanError, Result};
use crate::graph::{Entry, SourceGraph};
use crate::node::{Dependency, NodeId, SourceNode, relative_path};
use crate::reference::extract;
use crate::resolve::{Resolver, kind_of};
use crate::runtime::Runtime;

/// Discovers the source graph of a project.
#[derive(Debug, Clone)]
pub struct Planner {
    root: PathBuf,
    resolver: Resolver,
    rules: RuleTable,
    runtime: Arc<dyn Runtime>,
}

impl Planner {
    pub fn new(
        root: impl Into<PathBuf>,
        config: &SitepackConfig,
        runtime: Arc<dyn Runtime>,
    ) -> Self {
        let root = path_clean::clean(root.into());
        let resolver = Resolver::new(
            root.clone(),
            &config.resolve.modules,
            &config.resolve.extensions,
            Arc::clone(&runtime),
        );
        Self {
            root,
            resolver,
            rules: config.rules.clone(),
            runtime,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Plan the entries and HTML template named by a configuration.
    pub async fn plan_config(&self, config: &SitepackConfig) -> Result<SourceGraph> {
        let entries: Vec<(String, PathBuf)> = config
            .entry_files()
            .map(|(name, path)| (name.to_string(), path.to_path_buf()))
            .collect();
        self.plan(&entries, config.html.template.as_deref()).await
    }

    /// Walk every reference reachable from `entries` (and the optional HTML
    /// template) and return the checked graph.
    ///
    /// Entry paths are relative to the project root. Fails on the first
    /// unresolvable specifier or illegal cycle.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub async fn plan(
        &self,
        entries: &[(String, PathBuf)],
        document: Option<&Path>,
    ) -> Result<SourceGraph> {
        if entries.is_empty() {
            return Err(PlanError::NoEntries);
        }

        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        let mut seen: FxHashSet<PathBuf> = FxHashSet::default();
        let mut planned_entries = Vec::with_capacity(entries.len());

        for (name, path) in entries {
            let absolute = path_clean::clean(self.root.join(path));
            planned_entries.push(Entry {
                name: name.clone(),
                id: NodeId::from_path(&self.root, &absolute),
            });
            if seen.insert(absolute.clone()) {
                queue.push_back(absolute);
            }
        }

        let document_id = document.map(|template| {
            let absolute = path_clean::clean(self.root.join(template));
            let id = NodeId::from_path(&self.root, &absolute);
            if seen.insert(absolute.clone()) {
                queue.push_back(absolute);
            }
            id
        });

        let mut nodes = Vec::new();
        while let Some(path) = queue.pop_front() {
            let node = self.load(&path).await?;
            for dep in &node.dependencies {
                let target = path_clean::clean(self.root.join(dep.target.as_str()));
                if seen.insert(target.clone()) {
                    queue.push_back(target);
                }
            }
            nodes.push(node);
        }

        let graph = SourceGraph::from_nodes(self.root.clone(), nodes, planned_entries, document_id);
        check_cycles(&graph)?;
        debug!(nodes = graph.len(), "planned source graph");
        Ok(graph)
    }

    async fn load(&self, path: &Path) -> Result<SourceNode> {
        let raw = self.runtime.read_file(path).await?;
        let id = NodeId::from_path(&self.root, path);
        let kind = kind_of(path);
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let mut dependencies = Vec::new();
        if kind.is_textual() {
            let text = std::str::from_utf8(&raw).map_err(|_| PlanError::InvalidEncoding {
                path: relative_path(&self.root, path),
            })?;
            for reference in extract(kind, text) {
                let resolved = self.resolver.resolve(&reference.specifier, path, reference.syntax);
                let Some(target) = resolved else {
                    return Err(PlanError::UnresolvedReference {
                        specifier: reference.specifier,
                        importer: relative_path(&self.root, path),
                    });
                };
                dependencies.push(Dependency {
                    kind: reference.syntax.classify(kind_of(&target)),
                    target: NodeId::from_path(&self.root, &target),
                    specifier: reference.specifier,
                });
            }
        }

        let transforms = self
            .rules
            .select(path)
            .map(|rule| rule.chain.clone())
            .unwrap_or_default();

        debug!(node = %id, deps = dependencies.len(), "discovered");
        Ok(SourceNode {
            id,
            path: path.to_path_buf(),
            extension,
            kind,
            raw: Arc::from(raw),
            transforms,
            dependencies,
        })
    }
}
