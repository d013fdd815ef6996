//! Transform contract and the built-in transforms.
//!
//! A transform takes [`Content`] and returns new [`Content`]. Chains are
//! declared in the rule table and applied in order, each step receiving the
//! previous step's output. Transforms are synchronous and run on the rayon
//! pool; external programs are spawned as blocking child processes.

mod command;
mod sass;
mod script;
mod style;
mod text;

pub use command::CommandTransform;
pub use sass::SassTransform;
pub use script::ScriptTransform;
pub use style::StyleTransform;
pub use text::{FileTransform, HtmlTransform, JsonTransform, RawTransform};

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use sitepack_config::{ModeFlags, SitepackConfig, TransformId};
use sitepack_graph::NodeId;

use crate::content::Content;

/// Everything a transform may know about the file it is working on.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub id: &'a NodeId,
    /// Absolute path of the source file.
    pub path: &'a Path,
    pub root: &'a Path,
    pub flags: ModeFlags,
}

pub trait Transform: Send + Sync + fmt::Debug {
    fn id(&self) -> TransformId;

    fn apply(&self, input: Content, ctx: &TransformContext<'_>) -> anyhow::Result<Content>;
}

/// Lookup from transform ids to implementations.
///
/// Built-ins are created from the configuration; `command:` ids are
/// instantiated on demand. Any id can be overridden with
/// [`with_transform`](Self::with_transform).
#[derive(Debug, Clone)]
pub struct TransformRegistry {
    transforms: FxHashMap<TransformId, Arc<dyn Transform>>,
}

impl TransformRegistry {
    pub fn from_config(config: &SitepackConfig, root: &Path) -> Self {
        let module_roots = config
            .resolve
            .modules
            .iter()
            .map(|m| root.join(m))
            .collect::<Vec<_>>();

        let builtins: [Arc<dyn Transform>; 8] = [
            Arc::new(StyleTransform::new(config.style.targets.clone())),
            Arc::new(SassTransform::new(
                config.sass.program.clone(),
                config.sass.args.clone(),
                module_roots,
            )),
            Arc::new(ScriptTransform::javascript(config.script.target.clone())),
            Arc::new(ScriptTransform::typescript(config.script.target.clone())),
            Arc::new(FileTransform),
            Arc::new(RawTransform),
            Arc::new(JsonTransform),
            Arc::new(HtmlTransform),
        ];

        let transforms = builtins
            .into_iter()
            .map(|transform| (transform.id(), transform))
            .collect();
        Self { transforms }
    }

    /// Replace or add the implementation behind an id.
    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transforms.insert(transform.id(), transform);
        self
    }

    pub fn get(&self, id: &TransformId) -> Option<Arc<dyn Transform>> {
        if let Some(transform) = self.transforms.get(id) {
            return Some(Arc::clone(transform));
        }
        match id {
            TransformId::Command { program, args } => {
                Some(Arc::new(CommandTransform::new(program.clone(), args.clone())))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::path::PathBuf;

    pub(crate) struct Fixture {
        pub id: NodeId,
        pub path: PathBuf,
        pub root: PathBuf,
    }

    impl Fixture {
        pub fn new(id: &str) -> Self {
            Self {
                id: NodeId::new(id),
                path: PathBuf::from("/project").join(id),
                root: PathBuf::from("/project"),
            }
        }

        pub fn ctx(&self, flags: ModeFlags) -> TransformContext<'_> {
            TransformContext {
                id: &self.id,
                path: &self.path,
                root: &self.root,
                flags,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_every_builtin() {
        let registry = TransformRegistry::from_config(&SitepackConfig::default(), Path::new("/p"));
        for id in [
            TransformId::Style,
            TransformId::Sass,
            TransformId::Script,
            TransformId::TypeScript,
            TransformId::File,
            TransformId::Raw,
            TransformId::Json,
            TransformId::Html,
        ] {
            let transform = registry.get(&id).expect("builtin registered");
            assert_eq!(transform.id(), id);
        }
    }

    #[test]
    fn command_ids_are_created_on_demand() {
        let registry = TransformRegistry::from_config(&SitepackConfig::default(), Path::new("/p"));
        let id: TransformId = "command:cat".parse().unwrap();
        assert_eq!(registry.get(&id).unwrap().id(), id);
    }
}
