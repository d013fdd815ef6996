//! CSS through lightningcss.

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use sitepack_config::TransformId;
use tracing::debug;

use super::{Transform, TransformContext};
use crate::content::Content;

/// Parses CSS, adds vendor prefixes for the configured browser targets and
/// prints it back, minified when the mode asks for it.
///
/// `@import` rules and `url()` values are kept as written; the emitter
/// rewrites them once output names are known.
#[derive(Debug, Clone)]
pub struct StyleTransform {
    targets: Vec<String>,
}

impl StyleTransform {
    pub fn new(targets: Vec<String>) -> Self {
        Self { targets }
    }

    fn targets(&self) -> anyhow::Result<Targets> {
        if self.targets.is_empty() {
            return Ok(Targets::default());
        }
        let browsers = Browsers::from_browserslist(self.targets.iter().map(String::as_str))
            .map_err(|e| anyhow::anyhow!("invalid browser targets {:?}: {e}", self.targets))?;
        Ok(browsers.map(Targets::from).unwrap_or_default())
    }
}

impl Transform for StyleTransform {
    fn id(&self) -> TransformId {
        TransformId::Style
    }

    fn apply(&self, input: Content, ctx: &TransformContext<'_>) -> anyhow::Result<Content> {
        let source = input.text()?;
        if source.trim().is_empty() {
            return Ok(Content::style(""));
        }

        let targets = self.targets()?;
        let mut stylesheet = StyleSheet::parse(
            source,
            ParserOptions {
                filename: ctx.id.to_string(),
                ..ParserOptions::default()
            },
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?;

        stylesheet
            .minify(MinifyOptions {
                targets,
                ..MinifyOptions::default()
            })
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        let printed = stylesheet
            .to_css(PrinterOptions {
                minify: ctx.flags.minimize,
                targets,
                ..PrinterOptions::default()
            })
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        debug!(node = %ctx.id, bytes = printed.code.len(), "style transformed");
        Ok(Content::style(printed.code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;
    use crate::transform::testing::Fixture;
    use sitepack_config::BuildMode;

    fn run(css: &str, mode: BuildMode) -> anyhow::Result<Content> {
        let fixture = Fixture::new("src/main.css");
        StyleTransform::new(vec!["last 2 versions".into()])
            .apply(Content::style(css), &fixture.ctx(mode.flags()))
    }

    #[test]
    fn production_output_is_minified() {
        let css = "body {\n  color: red;\n  /* note */\n  background: blue;\n}\n";
        let out = run(css, BuildMode::Production).unwrap();
        let text = out.text().unwrap();
        assert!(text.len() < css.len());
        assert!(!text.contains("note"));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn keeps_urls_and_imports() {
        let css = "@import \"./reset.css\";\n.logo { background: url(../img/logo.png); }\n";
        let out = run(css, BuildMode::Development).unwrap();
        let text = out.text().unwrap();
        assert!(text.contains("reset.css"));
        assert!(text.contains("logo.png"));
    }

    #[test]
    fn empty_input_is_empty_css() {
        let out = run("", BuildMode::Production).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.kind, ContentKind::Style);
    }

    #[test]
    fn unknown_browser_query_fails() {
        let fixture = Fixture::new("src/main.css");
        let result = StyleTransform::new(vec!["definitely not a browser".into()])
            .apply(Content::style("a { color: red }"), &fixture.ctx(BuildMode::Production.flags()));
        assert!(result.is_err());
    }
}
