//! JavaScript and TypeScript through oxc.

use std::path::PathBuf;

use anyhow::{Context, bail};
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};
use sitepack_config::TransformId;
use tracing::debug;

use super::{Transform, TransformContext};
use crate::content::{Content, ContentKind, SourceMap};

/// Parse, lower to the configured target, optionally minify, print.
///
/// The TypeScript flavour forces TypeScript parsing regardless of the file
/// extension, so it also works after a `command:` step that emits `.ts` code.
#[derive(Debug, Clone)]
pub struct ScriptTransform {
    typescript: bool,
    target: String,
}

impl ScriptTransform {
    pub fn javascript(target: impl Into<String>) -> Self {
        Self {
            typescript: false,
            target: target.into(),
        }
    }

    pub fn typescript(target: impl Into<String>) -> Self {
        Self {
            typescript: true,
            target: target.into(),
        }
    }

    fn source_type(&self, ctx: &TransformContext<'_>) -> SourceType {
        let detected = SourceType::from_path(ctx.path).unwrap_or_else(|_| SourceType::mjs());
        if self.typescript {
            detected.with_typescript(true).with_module(true)
        } else {
            detected.with_module(true)
        }
    }
}

impl Transform for ScriptTransform {
    fn id(&self) -> TransformId {
        if self.typescript {
            TransformId::TypeScript
        } else {
            TransformId::Script
        }
    }

    fn apply(&self, input: Content, ctx: &TransformContext<'_>) -> anyhow::Result<Content> {
        let source = input.text()?;
        if source.trim().is_empty() {
            return Ok(Content::script(""));
        }

        let allocator = Allocator::default();
        let source_type = self.source_type(ctx);
        let parsed = Parser::new(&allocator, source, source_type).parse();
        if !parsed.errors.is_empty() {
            bail!("{}", join_diagnostics(&parsed.errors));
        }
        let mut program = parsed.program;

        let semantic = SemanticBuilder::new().build(&program);
        if !semantic.errors.is_empty() {
            bail!("{}", join_diagnostics(&semantic.errors));
        }
        let scoping = semantic.semantic.into_scoping();

        let options = TransformOptions::from_target(&self.target)
            .map_err(|e| anyhow::anyhow!(e))
            .with_context(|| format!("invalid script target '{}'", self.target))?;
        let transformed = Transformer::new(&allocator, ctx.path, &options)
            .build_with_scoping(scoping, &mut program);
        if !transformed.errors.is_empty() {
            bail!("{}", join_diagnostics(&transformed.errors));
        }

        let mut scoping = None;
        if ctx.flags.minimize {
            let minified =
                Minifier::new(MinifierOptions::default()).minify(&allocator, &mut program);
            scoping = minified.scoping;
        }

        let mut codegen_options = if ctx.flags.minimize {
            CodegenOptions::minify()
        } else {
            CodegenOptions::default()
        };
        if ctx.flags.source_map {
            codegen_options.source_map_path = Some(PathBuf::from(ctx.id.as_str()));
        }

        let printed = Codegen::new()
            .with_options(codegen_options)
            .with_scoping(scoping)
            .build(&program);

        let source_map = printed.map.map(|map| SourceMap {
            json: map.to_json_string(),
            data_url: map.to_data_url(),
        });
        debug!(node = %ctx.id, bytes = printed.code.len(), "script transformed");
        Ok(Content::new(printed.code, ContentKind::Script).with_source_map(source_map))
    }
}

fn join_diagnostics<D: std::fmt::Display>(errors: &[D]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
