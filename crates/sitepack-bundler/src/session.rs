//! Build sessions: one-shot builds and the incremental state kept across
//! watch rebuilds.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use sitepack_config::{BuildMode, ConfigError, ModeFlags, SitepackConfig};
use sitepack_graph::runtime::{NativeRuntime, Runtime};
use sitepack_graph::{NodeId, Planner, SourceGraph, SourceNode};
use tracing::{debug, info, instrument, warn};

use crate::cache::{TransformCache, TransformKey, detect_changes};
use crate::content::{Content, ContentKind};
use crate::dispatcher::Dispatcher;
use crate::emit::{EmitScope, EmitState, EmittedAsset, Emitter, OutputWriter};
use crate::error::{BuildError, Result, TransformError};
use crate::hot::HotUpdate;
use crate::pipeline::{CancelToken, Lifecycle, PipelineState};

/// Where emitted assets go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputTarget {
    /// Written under `out_dir`.
    #[default]
    Disk,
    /// Kept in the session only (served by the dev server).
    Memory,
}

/// One output as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub path: String,
    pub size: usize,
    pub kind: ContentKind,
}

/// Result of one build run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Sequence number, starting at 1.
    pub build: u64,
    pub mode: BuildMode,
    pub state: PipelineState,
    pub assets: Vec<AssetSummary>,
    pub emitted: Vec<String>,
    pub removed: Vec<String>,
    /// Nodes transformed by this run.
    pub transformed: usize,
    /// Nodes whose previous output was reused.
    pub reused: usize,
    /// Transform failures tolerated in development mode.
    pub diagnostics: Vec<TransformError>,
    pub duration: Duration,
    /// Present on rebuilds when hot reload is on.
    pub hot: Option<HotUpdate>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn total_size(&self) -> usize {
        self.assets.iter().map(|asset| asset.size).sum()
    }
}

/// Planner, dispatcher and emitter wired to one project, plus everything
/// remembered from the previous successful build.
///
/// State is committed only when a run succeeds: a failed or cancelled run
/// leaves the previous graph, cache and outputs in place.
#[derive(Debug)]
pub struct BuildSession {
    root: PathBuf,
    mode: BuildMode,
    flags: ModeFlags,
    planner: Planner,
    config: SitepackConfig,
    dispatcher: Arc<Dispatcher>,
    emitter: Emitter,
    writer: Option<OutputWriter>,
    lifecycle: Lifecycle,

    graph: Option<SourceGraph>,
    cache: TransformCache,
    keys: FxHashMap<NodeId, TransformKey>,
    emit_state: EmitState,
    assets: Vec<EmittedAsset>,
    builds: u64,
}

impl BuildSession {
    /// Session reading from disk and writing to `out_dir`.
    pub fn new(root: impl Into<PathBuf>, config: SitepackConfig, mode: BuildMode) -> Result<Self> {
        Self::with_runtime(root, config, mode, Arc::new(NativeRuntime), OutputTarget::Disk)
    }

    pub fn with_runtime(
        root: impl Into<PathBuf>,
        config: SitepackConfig,
        mode: BuildMode,
        runtime: Arc<dyn Runtime>,
        target: OutputTarget,
    ) -> Result<Self> {
        let root = path_clean::clean(root.into());
        let flags = mode.flags();
        sitepack_config::validate_schema(&config)?;

        let writer = match target {
            OutputTarget::Memory => None,
            OutputTarget::Disk => {
                let out_dir = path_clean::clean(root.join(&config.out_dir));
                if root.starts_with(&out_dir) {
                    return Err(ConfigError::InvalidValue {
                        field: "out_dir".to_string(),
                        hint: Some(format!(
                            "'{}' contains the project itself; \
                             choose a subdirectory such as \"dist\"",
                            config.out_dir.display()
                        )),
                    }
                    .into());
                }
                Some(OutputWriter::new(out_dir)?)
            }
        };

        Ok(Self {
            planner: Planner::new(root.clone(), &config, runtime),
            dispatcher: Arc::new(Dispatcher::new(&config, flags, root.clone())),
            emitter: Emitter::new(&config, flags)?,
            lifecycle: Lifecycle::new(flags.watch),
            root,
            mode,
            flags,
            config,
            writer,
            graph: None,
            cache: TransformCache::new(),
            keys: FxHashMap::default(),
            emit_state: EmitState::default(),
            assets: Vec::new(),
            builds: 0,
        })
    }

    /// Keep rebuilding after the first run, whatever the mode.
    pub fn watching(mut self) -> Self {
        self.flags = self.flags.watching();
        self.lifecycle = Lifecycle::new(true);
        self
    }

    /// Replace the transform dispatcher (custom transforms, tests).
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Arc::new(dispatcher);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn flags(&self) -> ModeFlags {
        self.flags
    }

    pub fn config(&self) -> &SitepackConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.lifecycle.state()
    }

    /// Graph of the last successful build.
    pub fn graph(&self) -> Option<&SourceGraph> {
        self.graph.as_ref()
    }

    /// Outputs of the last successful build, sorted by path.
    pub fn assets(&self) -> &[EmittedAsset] {
        &self.assets
    }

    pub fn asset(&self, path: &str) -> Option<&EmittedAsset> {
        self.assets.iter().find(|asset| asset.path == path)
    }

    pub fn document_path(&self) -> &str {
        self.emitter.document_path()
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.writer.as_ref().map(OutputWriter::dir)
    }

    /// Files whose change should trigger a rebuild.
    pub fn watched_files(&self) -> Vec<PathBuf> {
        self.graph
            .as_ref()
            .map(|graph| graph.nodes().map(|node| node.path.clone()).collect())
            .unwrap_or_default()
    }

    /// Run planning, dispatch and emission once.
    #[instrument(skip_all, fields(mode = %self.mode, build = self.builds + 1))]
    pub async fn build(&mut self, cancel: &CancelToken) -> Result<BuildReport> {
        let started = Instant::now();
        // A run whose future was dropped never reached a final state.
        self.lifecycle.fail();
        self.lifecycle.advance(PipelineState::Planning)?;
        match self.run(cancel, started).await {
            Ok(report) => Ok(report),
            Err(err) => {
                self.lifecycle.fail();
                if err.is_cancelled() {
                    debug!("build cancelled");
                } else {
                    warn!(error = %err, "build failed");
                }
                Err(err)
            }
        }
    }

    async fn run(&mut self, cancel: &CancelToken, started: Instant) -> Result<BuildReport> {
        cancel.check()?;
        let graph = self.planner.plan_config(&self.config).await?;
        debug!(nodes = graph.len(), "planned");
        cancel.check()?;

        self.lifecycle.advance(PipelineState::Dispatching)?;
        let keys: FxHashMap<NodeId, TransformKey> = graph
            .nodes()
            .filter(|node| !graph.is_inline_only(&node.id))
            .map(|node| (node.id.clone(), TransformKey::compute(&graph, node, self.flags)))
            .collect();
        let changes = detect_changes(&self.keys, &keys);

        let mut contents: FxHashMap<NodeId, Content> = FxHashMap::default();
        let mut pending: Vec<SourceNode> = Vec::new();
        for node in graph.nodes() {
            let Some(key) = keys.get(&node.id) else {
                continue;
            };
            match self.cache.get(&node.id, *key) {
                Some(content) => {
                    contents.insert(node.id.clone(), content.clone());
                }
                None => pending.push(node.clone()),
            }
        }
        let reused = contents.len();
        let transformed = pending.len();

        let dispatcher = Arc::clone(&self.dispatcher);
        let token = cancel.clone();
        let dispatched =
            tokio::task::spawn_blocking(move || dispatcher.dispatch_many(&pending, &token))
                .await
                .map_err(|err| BuildError::Internal(err.to_string()))??;

        let mut fresh = Vec::new();
        let mut diagnostics = Vec::new();
        for (id, result) in dispatched {
            match result {
                Ok(content) => {
                    contents.insert(id.clone(), content.clone());
                    fresh.push((id, content));
                }
                Err(err) if self.flags.fail_fast => return Err(err.into()),
                Err(err) => {
                    warn!(error = %err, "transform failed");
                    if let Some(previous) = self.cache.stale(&id) {
                        contents.insert(id, previous.clone());
                    }
                    diagnostics.push(err);
                }
            }
        }
        cancel.check()?;

        self.lifecycle.advance(PipelineState::Emitting)?;
        let changed: FxHashSet<NodeId> = changes.changed();
        let scope = if self.emit_state.is_empty() {
            EmitScope::All
        } else {
            EmitScope::Changed(&changed)
        };
        let outcome = self.emitter.emit(&graph, &contents, &self.emit_state, scope)?;

        if let Some(writer) = self.writer.clone() {
            let clean = self.mode.is_production() && self.emit_state.is_empty();
            let to_write: Vec<EmittedAsset> = if clean {
                outcome.assets.clone()
            } else {
                outcome.emitted_assets().cloned().collect()
            };
            let removed = outcome.removed.clone();
            let token = cancel.clone();
            // Once files are touched the run commits, so a cancel is only
            // honoured before the first write.
            tokio::task::spawn_blocking(move || -> Result<()> {
                token.check()?;
                if clean {
                    writer.clean()?;
                }
                let refs: Vec<&EmittedAsset> = to_write.iter().collect();
                writer.write(&refs)?;
                writer.remove(&removed)?;
                Ok(())
            })
            .await
            .map_err(|err| BuildError::Internal(err.to_string()))??;
        }

        // Commit.
        let first = self.emit_state.is_empty();
        for (id, content) in fresh {
            if let Some(key) = keys.get(&id) {
                self.cache.insert(id, *key, content);
            }
        }
        self.cache.retain_graph(&graph);
        self.keys = keys;
        self.graph = Some(graph);
        self.emit_state = outcome.state.clone();
        self.builds += 1;

        let hot = (self.flags.hot_reload && !first)
            .then(|| HotUpdate::from_outcome(self.builds, &outcome));
        self.assets = outcome.assets;
        self.lifecycle.advance(PipelineState::Done)?;

        let report = BuildReport {
            build: self.builds,
            mode: self.mode,
            state: self.lifecycle.state(),
            assets: self
                .assets
                .iter()
                .map(|asset| AssetSummary {
                    path: asset.path.clone(),
                    size: asset.len(),
                    kind: asset.kind,
                })
                .collect(),
            emitted: outcome.emitted,
            removed: outcome.removed,
            transformed,
            reused,
            diagnostics,
            duration: started.elapsed(),
            hot,
        };
        info!(
            assets = report.assets.len(),
            emitted = report.emitted.len(),
            transformed,
            reused,
            elapsed_ms = report.duration.as_millis() as u64,
            "build finished"
        );
        Ok(report)
    }
}

/// One-shot build of a project on disk.
#[derive(Debug)]
pub struct Pipeline {
    session: BuildSession,
}

impl Pipeline {
    pub fn new(root: impl Into<PathBuf>, config: SitepackConfig, mode: BuildMode) -> Result<Self> {
        Ok(Self {
            session: BuildSession::new(root, config, mode)?,
        })
    }

    pub fn from_session(session: BuildSession) -> Self {
        Self { session }
    }

    /// Build once and return the report together with the outputs.
    pub async fn build(mut self) -> Result<(BuildReport, Vec<EmittedAsset>)> {
        let report = self.session.build(&CancelToken::new()).await?;
        Ok((report, std::mem::take(&mut self.session.assets)))
    }
}
