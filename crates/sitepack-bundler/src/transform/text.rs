//! Small built-ins: passthrough, text and JSON modules, HTML documents.

use anyhow::Context;
use sitepack_config::TransformId;

use super::{Transform, TransformContext};
use crate::content::{Content, ContentKind};

/// Copies bytes unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransform;

impl Transform for FileTransform {
    fn id(&self) -> TransformId {
        TransformId::File
    }

    fn apply(&self, input: Content, _ctx: &TransformContext<'_>) -> anyhow::Result<Content> {
        Ok(Content::new(input.bytes, ContentKind::File))
    }
}

/// Wraps text as `export default "<text>";`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTransform;

impl Transform for RawTransform {
    fn id(&self) -> TransformId {
        TransformId::Raw
    }

    fn apply(&self, input: Content, _ctx: &TransformContext<'_>) -> anyhow::Result<Content> {
        let literal = serde_json::to_string(input.text()?)?;
        Ok(Content::script(format!("export default {literal};\n")))
    }
}

/// Validates JSON and wraps it as `export default <value>;`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTransform;

impl Transform for JsonTransform {
    fn id(&self) -> TransformId {
        TransformId::Json
    }

    fn apply(&self, input: Content, _ctx: &TransformContext<'_>) -> anyhow::Result<Content> {
        let text = input.text()?;
        if text.trim().is_empty() {
            return Ok(Content::script("export default null;\n"));
        }
        let value: serde_json::Value = serde_json::from_str(text).context("invalid JSON")?;
        Ok(Content::script(format!("export default {value};\n")))
    }
}

/// Marks UTF-8 text as an HTML document.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTransform;

impl Transform for HtmlTransform {
    fn id(&self) -> TransformId {
        TransformId::Html
    }

    fn apply(&self, input: Content, _ctx: &TransformContext<'_>) -> anyhow::Result<Content> {
        input.text()?;
        Ok(Content::new(input.bytes, ContentKind::Document))
    }
}
