//! Asset Emitter.
//!
//! Turns transformed node contents into output files:
//!
//! 1. Nodes are named component by component, dependencies first, so every
//!    reference can be rewritten to its target's final name before the
//!    importer's own bytes (and therefore its hash) are fixed.
//! 2. Members of a module cycle cannot see each other's final bytes; they
//!    share a digest over their transformed contents and outward names.
//! 3. The entry document is assembled last, with links to entry styles,
//!    styles imported by entry scripts, and the entry scripts themselves.
//!
//! The emitter is pure: writing is done by [`OutputWriter`] or kept in
//! memory by the dev server.

pub mod html;
pub mod naming;
pub mod rewrite;
pub mod writer;

pub use writer::{OutputWriter, normalize_output_name, validate_output_path};

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use sitepack_config::{HtmlOptions, ModeFlags, OutputOptions, SitepackConfig, SourceMapMode};
use sitepack_graph::{NodeId, ReferenceKind, ReferenceSyntax, SourceGraph, SourceKind, SourceNode};
use tracing::{debug, instrument, warn};

use crate::content::{Content, ContentKind};
use crate::error::EmitError;
use naming::{content_hash, file_stem, parent_dir, relative_url, render};
use rewrite::{Rewrite, rewrite_references};

/// One output file, path relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedAsset {
    pub path: String,
    pub bytes: Vec<u8>,
    pub kind: ContentKind,
    /// Node this file was produced from. `None` for a generated document.
    pub source: Option<NodeId>,
}

impl EmittedAsset {
    /// URL path under which the dev server serves this asset.
    pub fn url(&self) -> String {
        format!("/{}", self.path)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What the previous emit produced; input to the next incremental emit.
#[derive(Debug, Clone, Default)]
pub struct EmitState {
    names: FxHashMap<NodeId, String>,
    digests: BTreeMap<String, blake3::Hash>,
}

impl EmitState {
    pub fn name_of(&self, id: &NodeId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.digests.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

/// Which nodes changed since the previous emit.
#[derive(Debug, Clone, Copy)]
pub enum EmitScope<'a> {
    /// First build: everything is emitted.
    All,
    /// Changed nodes. They and their direct importers are re-emitted, plus
    /// any output whose bytes differ from the previous emit.
    Changed(&'a FxHashSet<NodeId>),
}

#[derive(Debug, Clone)]
pub struct EmitOutcome {
    /// Every current output, sorted by path.
    pub assets: Vec<EmittedAsset>,
    /// Paths (re)emitted by this run.
    pub emitted: Vec<String>,
    /// Emitted paths whose bytes differ from the previous emit.
    pub changed: FxHashSet<String>,
    /// Paths of the previous emit that no longer exist.
    pub removed: Vec<String>,
    pub state: EmitState,
}

impl EmitOutcome {
    pub fn emitted_assets(&self) -> impl Iterator<Item = &EmittedAsset> {
        let emitted: FxHashSet<&str> = self.emitted.iter().map(String::as_str).collect();
        self.assets
            .iter()
            .filter(move |asset| emitted.contains(asset.path.as_str()))
    }

    pub fn asset(&self, path: &str) -> Option<&EmittedAsset> {
        self.assets.iter().find(|asset| asset.path == path)
    }

    /// Whether `path` was emitted with new bytes rather than re-emitted as is.
    pub fn is_changed(&self, path: &str) -> bool {
        self.changed.contains(path)
    }
}

#[derive(Debug, Clone)]
pub struct Emitter {
    output: OutputOptions,
    html: HtmlOptions,
    flags: ModeFlags,
    document_path: String,
}

impl Emitter {
    pub fn new(config: &SitepackConfig, flags: ModeFlags) -> Result<Self, EmitError> {
        let document_path = normalize_output_name(&config.html.filename.to_string_lossy())?;
        Ok(Self {
            output: config.output.clone(),
            html: config.html.clone(),
            flags,
            document_path,
        })
    }

    pub fn document_path(&self) -> &str {
        &self.document_path
    }

    /// Produce the outputs for `graph` from transformed `contents`.
    ///
    /// Nodes without content (failed with nothing to fall back to) and nodes
    /// that are only ever inlined produce no file.
    #[instrument(skip_all, fields(nodes = graph.len()))]
    pub fn emit(
        &self,
        graph: &SourceGraph,
        contents: &FxHashMap<NodeId, Content>,
        previous: &EmitState,
        scope: EmitScope<'_>,
    ) -> Result<EmitOutcome, EmitError> {
        let document = graph.document();
        let mut run = EmitRun::new(self, graph, contents);

        for component in graph.components() {
            let members: Vec<&SourceNode> = component
                .iter()
                .filter_map(|id| graph.node(id))
                .filter(|node| {
                    document.is_none_or(|doc| doc.id != node.id)
                        && contents.contains_key(&node.id)
                        && !graph.is_inline_only(&node.id)
                })
                .collect();
            if !members.is_empty() {
                run.emit_component(&members)?;
            }
        }
        let document_asset = run.document(document);
        run.assets.push(document_asset);

        let EmitRun { assets, names, .. } = run;
        let mut by_path: BTreeMap<String, EmittedAsset> = BTreeMap::new();
        for asset in assets {
            let path = asset.path.clone();
            if let Some(replaced) = by_path.insert(path.clone(), asset) {
                warn!(
                    path = %path,
                    replaced = ?replaced.source.as_ref().map(NodeId::as_str),
                    "two outputs share a path; keeping the last one"
                );
            }
        }

        let in_scope: Option<FxHashSet<&NodeId>> = match scope {
            EmitScope::All => None,
            EmitScope::Changed(changed) => Some(
                changed
                    .iter()
                    .flat_map(|id| {
                        let importers = graph.importers(id).into_iter();
                        std::iter::once(id).chain(importers.map(|(importer, _)| importer))
                    })
                    .collect(),
            ),
        };

        let mut digests = BTreeMap::new();
        let mut emitted = Vec::new();
        let mut changed = FxHashSet::default();
        for (path, asset) in &by_path {
            let digest = blake3::hash(&asset.bytes);
            let scoped = match &in_scope {
                None => true,
                Some(set) => asset.source.as_ref().is_some_and(|id| set.contains(id)),
            };
            let differs = previous.digests.get(path) != Some(&digest);
            if differs {
                changed.insert(path.clone());
            }
            if scoped || differs {
                emitted.push(path.clone());
            }
            digests.insert(path.clone(), digest);
        }
        let removed: Vec<String> = previous
            .digests
            .keys()
            .filter(|path| !by_path.contains_key(*path))
            .cloned()
            .collect();

        debug!(
            assets = by_path.len(),
            emitted = emitted.len(),
            changed = changed.len(),
            removed = removed.len(),
            "emitted"
        );
        Ok(EmitOutcome {
            assets: by_path.into_values().collect(),
            emitted,
            changed,
            removed,
            state: EmitState { names, digests },
        })
    }
}

struct EmitRun<'a> {
    emitter: &'a Emitter,
    graph: &'a SourceGraph,
    contents: &'a FxHashMap<NodeId, Content>,
    entry_names: FxHashMap<NodeId, String>,
    names: FxHashMap<NodeId, String>,
    assets: Vec<EmittedAsset>,
}

impl<'a> EmitRun<'a> {
    fn new(
        emitter: &'a Emitter,
        graph: &'a SourceGraph,
        contents: &'a FxHashMap<NodeId, Content>,
    ) -> Self {
        // Two files of one entry that end up with the same template get the
        // file stem appended to keep their names apart.
        let mut taken: FxHashSet<(String, ContentKind)> = FxHashSet::default();
        let mut entry_names = FxHashMap::default();
        for entry in graph.entries() {
            let Some(content) = contents.get(&entry.id) else {
                continue;
            };
            let name = if taken.insert((entry.name.clone(), content.kind)) {
                entry.name.clone()
            } else {
                format!("{}-{}", entry.name, file_stem(entry.id.as_str()))
            };
            entry_names.entry(entry.id.clone()).or_insert(name);
        }

        Self {
            emitter,
            graph,
            contents,
            entry_names,
            names: FxHashMap::default(),
            assets: Vec::new(),
        }
    }

    fn flags(&self) -> ModeFlags {
        self.emitter.flags
    }

    fn kind_of(&self, id: &NodeId) -> Option<ContentKind> {
        self.contents.get(id).map(|content| content.kind)
    }

    fn output_name(
        &self,
        node: &SourceNode,
        kind: ContentKind,
        hash: Option<&str>,
    ) -> Result<String, EmitError> {
        let output = &self.emitter.output;
        let module_name = || {
            self.entry_names
                .get(&node.id)
                .cloned()
                .unwrap_or_else(|| node.id.stem().to_string())
        };
        let (template, name) = match kind {
            ContentKind::Script => (&output.script, module_name()),
            ContentKind::Style => (&output.style, module_name()),
            ContentKind::File | ContentKind::Document => {
                (&output.asset, file_stem(node.id.as_str()).to_string())
            }
        };
        let hash = hash.filter(|_| self.flags().hash_filenames);
        normalize_output_name(&render(template, &name, &node.extension, hash))
    }

    fn emit_component(&mut self, members: &[&'a SourceNode]) -> Result<(), EmitError> {
        let hashing = self.flags().hash_filenames;
        let cyclic = members.len() > 1 || members[0].depends_on(&members[0].id);

        if hashing && !cyclic {
            let node = members[0];
            let kind = self.contents[&node.id].kind;
            // The hash only ever appears in the file name, so the provisional
            // name has the final directory.
            let provisional = self.output_name(node, kind, None)?;
            let bytes = self.render(node, parent_dir(&provisional));
            let hash = content_hash(&bytes, self.emitter.output.hash_length);
            let path = self.output_name(node, kind, Some(&hash))?;
            self.names.insert(node.id.clone(), path.clone());
            self.push(node, path, bytes);
            return Ok(());
        }

        let digest = hashing.then(|| self.component_digest(members));
        for node in members {
            let kind = self.contents[&node.id].kind;
            let path = self.output_name(node, kind, digest.as_deref())?;
            self.names.insert(node.id.clone(), path);
        }
        for node in members {
            let path = self.names[&node.id].clone();
            let bytes = self.render(node, parent_dir(&path));
            self.push(node, path, bytes);
        }
        Ok(())
    }

    fn component_digest(&self, members: &[&SourceNode]) -> String {
        let inside: FxHashSet<&NodeId> = members.iter().map(|node| &node.id).collect();
        let mut hasher = blake3::Hasher::new();
        let mut outward: Vec<&str> = Vec::new();
        for node in members {
            hasher.update(node.id.as_str().as_bytes());
            hasher.update(b"\0");
            hasher.update(&self.contents[&node.id].bytes);
            hasher.update(b"\0");
            for dep in &node.dependencies {
                if !inside.contains(&dep.target) {
                    if let Some(name) = self.names.get(&dep.target) {
                        outward.push(name);
                    }
                }
            }
        }
        outward.sort_unstable();
        outward.dedup();
        for name in outward {
            hasher.update(name.as_bytes());
            hasher.update(b"\0");
        }
        let hex = hasher.finalize().to_hex();
        hex[..self.emitter.output.hash_length.min(hex.len())].to_string()
    }

    fn push(&mut self, node: &SourceNode, path: String, mut bytes: Vec<u8>) {
        let contents = self.contents;
        let content = &contents[&node.id];
        if content.kind == ContentKind::Script && self.flags().source_map {
            if let Some(map) = &content.source_map {
                match self.emitter.output.source_map {
                    SourceMapMode::Inline => {
                        let comment = format!("\n//# sourceMappingURL={}\n", map.data_url);
                        bytes.extend_from_slice(comment.as_bytes());
                    }
                    SourceMapMode::External => {
                        let map_path = format!("{path}.map");
                        let file_name = map_path.rsplit('/').next().unwrap_or(&map_path);
                        let comment = format!("\n//# sourceMappingURL={file_name}\n");
                        bytes.extend_from_slice(comment.as_bytes());
                        self.assets.push(EmittedAsset {
                            path: map_path.clone(),
                            bytes: map.json.clone().into_bytes(),
                            kind: ContentKind::File,
                            source: Some(node.id.clone()),
                        });
                    }
                }
            }
        }
        self.assets.push(EmittedAsset {
            path,
            bytes,
            kind: content.kind,
            source: Some(node.id.clone()),
        });
    }

    /// Specifier -> target for a node and everything inlined into it.
    fn lookup(&self, node: &'a SourceNode) -> FxHashMap<&'a str, &'a NodeId> {
        let mut map = FxHashMap::default();
        for dep in &node.dependencies {
            map.entry(dep.specifier.as_str()).or_insert(&dep.target);
        }
        for inlined in self.graph.inline_dependencies(&node.id) {
            if let Some(inlined) = self.graph.node(&inlined) {
                for dep in &inlined.dependencies {
                    map.entry(dep.specifier.as_str()).or_insert(&dep.target);
                }
            }
        }
        map
    }

    fn render(&self, node: &'a SourceNode, own_dir: &str) -> Vec<u8> {
        let content = &self.contents[&node.id];
        let Ok(text) = std::str::from_utf8(&content.bytes) else {
            return content.bytes.clone();
        };
        match content.kind {
            ContentKind::File => content.bytes.clone(),
            ContentKind::Script => self.rewrite_script(node, text, own_dir).into_bytes(),
            ContentKind::Style => self
                .rewrite_urls(node, SourceKind::Style, text, own_dir)
                .into_bytes(),
            ContentKind::Document => {
                let expanded = self.expand_includes(node, text);
                self.rewrite_urls(node, SourceKind::Document, &expanded, own_dir)
                    .into_bytes()
            }
        }
    }

    fn rewrite_script(&self, node: &'a SourceNode, text: &str, own_dir: &str) -> String {
        let lookup = self.lookup(node);
        let document_dir = parent_dir(&self.emitter.document_path);
        rewrite_references(SourceKind::Script, text, |reference| {
            let target = *lookup.get(reference.specifier.as_str())?;
            let dynamic = reference.syntax == ReferenceSyntax::DynamicImport;
            match self.kind_of(target)? {
                ContentKind::Script => {
                    let name = self.names.get(target)?;
                    Some(Rewrite::Specifier(relative_url(own_dir, name)))
                }
                // Linked from the document instead.
                ContentKind::Style => Some(Rewrite::Statement(if dynamic {
                    "Promise.resolve({})".to_string()
                } else {
                    String::new()
                })),
                ContentKind::File | ContentKind::Document => {
                    let name = self.names.get(target)?;
                    // Files are referenced from the page, so the URL is
                    // relative to the document.
                    let url = serde_json::to_string(&relative_url(document_dir, name)).ok()?;
                    Some(Rewrite::Statement(match &reference.binding {
                        _ if dynamic => format!("Promise.resolve({{ default: {url} }})"),
                        Some(binding) => format!("const {binding} = {url};"),
                        None => String::new(),
                    }))
                }
            }
        })
    }

    fn rewrite_urls(
        &self,
        node: &'a SourceNode,
        kind: SourceKind,
        text: &str,
        own_dir: &str,
    ) -> String {
        let lookup = self.lookup(node);
        rewrite_references(kind, text, |reference| {
            if reference.syntax == ReferenceSyntax::HtmlInclude {
                return None;
            }
            let target = lookup.get(reference.specifier.as_str())?;
            let name = self.names.get(*target)?;
            Some(Rewrite::Specifier(relative_url(own_dir, name)))
        })
    }

    /// Replace `<!--#include file="..." -->` directives with the included
    /// file's text, recursively.
    fn expand_includes(&self, node: &SourceNode, text: &str) -> String {
        rewrite_references(SourceKind::Document, text, |reference| {
            if reference.syntax != ReferenceSyntax::HtmlInclude {
                return None;
            }
            let dep = node.dependencies.iter().find(|dep| {
                dep.specifier == reference.specifier && dep.kind == ReferenceKind::TemplateInclude
            })?;
            let included = self.graph.node(&dep.target)?;
            let raw = included.raw_str()?;
            Some(Rewrite::Statement(self.expand_includes(included, raw)))
        })
    }

    fn document(&self, template: Option<&'a SourceNode>) -> EmittedAsset {
        let path = self.emitter.document_path.clone();
        let own_dir = parent_dir(&path);

        let base = match template {
            Some(node) => {
                let text = self
                    .contents
                    .get(&node.id)
                    .and_then(|content| std::str::from_utf8(&content.bytes).ok())
                    .or_else(|| node.raw_str())
                    .unwrap_or_default();
                let expanded = self.expand_includes(node, text);
                self.rewrite_urls(node, SourceKind::Document, &expanded, own_dir)
            }
            None => html::default_document(&self.emitter.html.title),
        };

        let (styles, scripts) = self.injected(own_dir);
        let already_linked = |url: &String| base.contains(&format!("\"{url}\""));
        let styles: Vec<String> = styles.into_iter().filter(|url| !already_linked(url)).collect();
        let scripts: Vec<String> = scripts.into_iter().filter(|url| !already_linked(url)).collect();

        let mut document = html::inject_tags(&base, &styles, &scripts);
        if self.flags().minimize {
            document = html::minify(&document);
        }

        EmittedAsset {
            path,
            bytes: document.into_bytes(),
            kind: ContentKind::Document,
            source: template.map(|node| node.id.clone()),
        }
    }

    /// Stylesheet and script URLs the document must load, in entry order.
    fn injected(&self, own_dir: &str) -> (Vec<String>, Vec<String>) {
        let mut styles: Vec<String> = Vec::new();
        let mut scripts: Vec<String> = Vec::new();
        let push_unique = |list: &mut Vec<String>, url: String| {
            if !list.contains(&url) {
                list.push(url);
            }
        };

        for entry in self.graph.entries() {
            let Some(name) = self.names.get(&entry.id) else {
                continue;
            };
            match self.kind_of(&entry.id) {
                Some(ContentKind::Script) => {
                    let reachable = std::iter::once(entry.id.clone())
                        .chain(self.graph.transitive_dependencies(&entry.id));
                    for id in reachable {
                        if self.kind_of(&id) != Some(ContentKind::Script) {
                            continue;
                        }
                        let Some(node) = self.graph.node(&id) else {
                            continue;
                        };
                        for dep in &node.dependencies {
                            if dep.kind != ReferenceKind::AssetImport
                                || self.kind_of(&dep.target) != Some(ContentKind::Style)
                            {
                                continue;
                            }
                            if let Some(style) = self.names.get(&dep.target) {
                                push_unique(&mut styles, relative_url(own_dir, style));
                            }
                        }
                    }
                    push_unique(&mut scripts, relative_url(own_dir, name));
                }
                Some(ContentKind::Style) => push_unique(&mut styles, relative_url(own_dir, name)),
                _ => {}
            }
        }
        (styles, scripts)
    }
}
