//! Transform Dispatcher: selects a node's chain and runs it.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use sitepack_config::{ModeFlags, RuleTable, SitepackConfig, TransformRule};
use sitepack_graph::{NodeId, SourceNode};
use tracing::{debug, instrument};

use crate::content::{Content, ContentKind};
use crate::error::{BuildError, TransformError};
use crate::pipeline::CancelToken;
use crate::transform::{TransformContext, TransformRegistry};

/// Outcome of transforming one node.
pub type Dispatched = (NodeId, Result<Content, TransformError>);

#[derive(Debug, Clone)]
pub struct Dispatcher {
    rules: RuleTable,
    registry: TransformRegistry,
    flags: ModeFlags,
    root: PathBuf,
}

impl Dispatcher {
    pub fn new(config: &SitepackConfig, flags: ModeFlags, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            rules: config.rules.clone(),
            registry: TransformRegistry::from_config(config, &root),
            flags,
            root,
        }
    }

    pub fn with_registry(mut self, registry: TransformRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn flags(&self) -> ModeFlags {
        self.flags
    }

    /// The rule applying to `path`: longest matching extension pattern,
    /// declaration order on ties.
    pub fn select_rule(&self, path: &Path) -> Option<&TransformRule> {
        self.rules.select(path)
    }

    /// Run the node's chain, feeding each step the previous step's output.
    ///
    /// A rule with an empty chain passes the source through unchanged. A
    /// file no rule matches is copied as an opaque asset.
    pub fn dispatch(&self, node: &SourceNode) -> Result<Content, TransformError> {
        let fail = |position: usize, transform: String, cause: String| TransformError {
            path: PathBuf::from(node.id.as_str()),
            position,
            transform,
            cause,
        };

        let Some(rule) = self.select_rule(&node.path) else {
            debug!(node = %node.id, extension = %node.extension, "no rule matches, copying as is");
            return Ok(Content::new(node.raw.to_vec(), ContentKind::File));
        };

        let ctx = TransformContext {
            id: &node.id,
            path: &node.path,
            root: &self.root,
            flags: self.flags,
        };

        let mut content = Content::new(node.raw.to_vec(), ContentKind::initial(node.kind));
        for (position, id) in rule.chain.iter().enumerate() {
            let transform = self.registry.get(id).ok_or_else(|| {
                fail(position, id.to_string(), "transform is not registered".into())
            })?;
            content = transform
                .apply(content, &ctx)
                .map_err(|e| fail(position, id.to_string(), format!("{e:#}")))?;
        }

        debug!(
            node = %node.id,
            steps = rule.chain.len(),
            kind = content.kind.as_str(),
            "dispatched"
        );
        Ok(content)
    }

    /// Transform independent nodes in parallel.
    ///
    /// Results keep the order of `nodes`. The token is checked before each
    /// node starts; a cancelled run returns [`BuildError::Cancelled`].
    #[instrument(skip_all, fields(nodes = nodes.len()))]
    pub fn dispatch_many(
        &self,
        nodes: &[SourceNode],
        cancel: &CancelToken,
    ) -> Result<Vec<Dispatched>, BuildError> {
        let results: Vec<Option<Dispatched>> = nodes
            .par_iter()
            .map(|node| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some((node.id.clone(), self.dispatch(node)))
            })
            .collect();

        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }
        Ok(results.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sitepack_config::{BuildMode, TransformId};
    use sitepack_graph::SourceKind;

    use crate::transform::Transform;

    #[derive(Debug)]
    struct Append(&'static str, TransformId);

    impl Transform for Append {
        fn id(&self) -> TransformId {
            self.1.clone()
        }

        fn apply(
            &self,
            mut input: Content,
            _ctx: &TransformContext<'_>,
        ) -> anyhow::Result<Content> {
            input.bytes.extend_from_slice(self.0.as_bytes());
            Ok(input)
        }
    }

    #[derive(Debug)]
    struct Fail;

    impl Transform for Fail {
        fn id(&self) -> TransformId {
            TransformId::Style
        }

        fn apply(&self, _input: Content, _ctx: &TransformContext<'_>) -> anyhow::Result<Content> {
            anyhow::bail!("unexpected token")
        }
    }

    fn node(id: &str, raw: &str) -> SourceNode {
        let extension = id.rsplit('.').next().unwrap_or_default().to_string();
        SourceNode {
            id: NodeId::new(id),
            path: PathBuf::from("/p").join(id),
            kind: SourceKind::from_extension(&extension),
            extension,
            raw: Arc::from(raw.as_bytes()),
            transforms: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    fn dispatcher(rules: Vec<TransformRule>, registry: TransformRegistry) -> Dispatcher {
        let config = SitepackConfig {
            rules: RuleTable::new(rules),
            ..SitepackConfig::default()
        };
        Dispatcher::new(&config, BuildMode::Development.flags(), "/p").with_registry(registry)
    }

    fn registry() -> TransformRegistry {
        TransformRegistry::from_config(&SitepackConfig::default(), Path::new("/p"))
    }

    #[test]
    fn chain_runs_in_declared_order() {
        let registry = registry()
            .with_transform(Arc::new(Append("1", TransformId::Sass)))
            .with_transform(Arc::new(Append("2", TransformId::Style)));
        let d = dispatcher(
            vec![TransformRule::new(["scss"], vec![TransformId::Sass, TransformId::Style])],
            registry,
        );
        let out = d.dispatch(&node("a.scss", "x")).unwrap();
        assert_eq!(out.bytes, b"x12");
    }

    #[test]
    fn failure_reports_chain_position() {
        let registry = registry()
            .with_transform(Arc::new(Append("1", TransformId::Sass)))
            .with_transform(Arc::new(Fail));
        let d = dispatcher(
            vec![TransformRule::new(["scss"], vec![TransformId::Sass, TransformId::Style])],
            registry,
        );
        let err = d.dispatch(&node("src/main.scss", "x")).unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(err.transform, "style");
        assert_eq!(err.path, PathBuf::from("src/main.scss"));
        assert!(err.cause.contains("unexpected token"));
    }

    #[test]
    fn unmatched_file_is_copied_as_is() {
        let d = dispatcher(Vec::new(), registry());
        let out = d.dispatch(&node("fonts/brand.otf", "OTTO")).unwrap();
        assert_eq!(out.bytes, b"OTTO");
        assert_eq!(out.kind, ContentKind::File);
    }

    #[test]
    fn empty_chain_is_identity() {
        let d = dispatcher(vec![TransformRule::new(["md"], Vec::new())], registry());
        let out = d.dispatch(&node("README.md", "# hi")).unwrap();
        assert_eq!(out.bytes, b"# hi");
        assert_eq!(out.kind, ContentKind::File);
    }

    #[test]
    fn select_rule_prefers_longest_pattern() {
        let d = dispatcher(
            vec![
                TransformRule::new(["js"], vec![TransformId::Script]),
                TransformRule::new(["min.js"], vec![TransformId::File]),
            ],
            registry(),
        );
        let rule = d.select_rule(Path::new("vendor/lib.min.js")).unwrap();
        assert_eq!(rule.chain, vec![TransformId::File]);
    }

    #[test]
    fn dispatch_many_keeps_order_and_honours_cancellation() {
        let d = dispatcher(vec![TransformRule::new(["txt"], vec![TransformId::Raw])], registry());
        let nodes = vec![node("a.txt", "a"), node("b.txt", "b"), node("c.txt", "c")];

        let results = d.dispatch_many(&nodes, &CancelToken::new()).unwrap();
        let ids: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["a.txt", "b.txt", "c.txt"]);
        assert!(results.iter().all(|(_, r)| r.is_ok()));

        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(d.dispatch_many(&nodes, &cancel), Err(BuildError::Cancelled)));
    }
}
