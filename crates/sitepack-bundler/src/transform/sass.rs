//! Sass/SCSS through an external compiler.

use std::path::PathBuf;

use sitepack_config::TransformId;
use tracing::debug;

use super::command::run_filter;
use super::{Transform, TransformContext};
use crate::content::{Content, ContentKind};

/// Runs `<program> <args> --stdin --load-path <dir>... [--indented]` and
/// returns the compiled CSS. The file's own directory comes first on the
/// load path, followed by the configured module roots.
#[derive(Debug, Clone)]
pub struct SassTransform {
    program: String,
    args: Vec<String>,
    load_paths: Vec<PathBuf>,
}

impl SassTransform {
    pub fn new(program: impl Into<String>, args: Vec<String>, load_paths: Vec<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            load_paths,
        }
    }

    fn arguments(&self, ctx: &TransformContext<'_>) -> Vec<String> {
        let mut args = self.args.clone();
        args.push("--stdin".into());
        args.push("--no-source-map".into());
        let own_dir = ctx.path.parent().map(|p| p.to_path_buf());
        for dir in own_dir.iter().chain(&self.load_paths) {
            args.push("--load-path".into());
            args.push(dir.to_string_lossy().into_owned());
        }
        let indented = ctx
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sass"));
        if indented {
            args.push("--indented".into());
        }
        args
    }
}

impl Transform for SassTransform {
    fn id(&self) -> TransformId {
        TransformId::Sass
    }

    fn apply(&self, input: Content, ctx: &TransformContext<'_>) -> anyhow::Result<Content> {
        if input.text()?.trim().is_empty() {
            return Ok(Content::style(""));
        }
        let args = self.arguments(ctx);
        let css = run_filter(&self.program, &args, &input.bytes, ctx.root)?;
        debug!(node = %ctx.id, bytes = css.len(), "sass compiled");
        Ok(Content::new(css, ContentKind::Style))
    }
}
