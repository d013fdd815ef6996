//! Reference extraction.
//!
//! References are found with regular expressions over a copy of the source in
//! which comments have been blanked out, so byte offsets stay valid for the
//! original text. The same extraction runs again on transformed output when
//! the emitter rewrites specifiers, which is why every reference carries the
//! span of its specifier and of its whole statement.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::node::SourceKind;

/// Kind of a resolved edge in the source graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Script importing something that becomes a JavaScript module.
    ModuleImport,
    /// Script importing a stylesheet or binary file.
    AssetImport,
    /// CSS `@import` kept as a separate stylesheet.
    StyleImport,
    /// Sass `@import`/`@use`/`@forward` inlined by the compiler.
    StyleInclude,
    /// `url(...)` in styles, `src`/`href` in documents.
    UrlReference,
    /// Server-side include expanded into the including document.
    TemplateInclude,
}

impl ReferenceKind {
    /// Inlined edges do not produce a separate output file.
    pub fn is_inline(self) -> bool {
        matches!(self, ReferenceKind::StyleInclude | ReferenceKind::TemplateInclude)
    }

    /// Module edges may form cycles; every other kind may not.
    pub fn allows_cycles(self) -> bool {
        matches!(self, ReferenceKind::ModuleImport)
    }
}

/// Syntactic form a reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceSyntax {
    /// `import ... from "x"`, `import "x"`, `export ... from "x"`
    StaticImport,
    /// `import("x")`
    DynamicImport,
    /// CSS `@import`
    CssImport,
    /// Sass `@import`/`@use`/`@forward` of a Sass source
    SassInclude,
    /// `url(x)`
    CssUrl,
    /// `<!--#include file="x" -->`
    HtmlInclude,
    /// `src="x"` / `href="x"`
    HtmlAttribute,
}

impl ReferenceSyntax {
    /// Classify once the target's kind is known.
    pub fn classify(self, target: SourceKind) -> ReferenceKind {
        match self {
            ReferenceSyntax::StaticImport | ReferenceSyntax::DynamicImport => {
                if target.is_module() {
                    ReferenceKind::ModuleImport
                } else {
                    ReferenceKind::AssetImport
                }
            }
            ReferenceSyntax::CssImport => ReferenceKind::StyleImport,
            ReferenceSyntax::SassInclude => ReferenceKind::StyleInclude,
            ReferenceSyntax::CssUrl | ReferenceSyntax::HtmlAttribute => ReferenceKind::UrlReference,
            ReferenceSyntax::HtmlInclude => ReferenceKind::TemplateInclude,
        }
    }
}

/// A reference found in source text, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReference {
    /// Specifier with query string and fragment removed.
    pub specifier: String,
    pub syntax: ReferenceSyntax,
    /// Byte range of the specifier as written (including any query/fragment).
    pub span: Range<usize>,
    /// Byte range of the whole statement or attribute.
    pub statement: Range<usize>,
    /// Local name for `import name from "x"`.
    pub binding: Option<String>,
}

static STATIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        concat!(
            r#"\b(?P<kw>import|export)(?P<type>\s+type\b)?\s*(?P<clause>[\w$*{}\s,]+?)"#,
            r#"\s*\bfrom\s*['"](?P<spec>[^'"\r\n]+)['"]\s*;?"#,
        ),
    )
    .expect("valid regex")
});

static BARE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*['"](?P<spec>[^'"\r\n]+)['"]\s*;?"#).expect("valid regex")
});

static DYNAMIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*\(\s*['"](?P<spec>[^'"\r\n]+)['"]\s*\)"#).expect("valid regex")
});

static DEFAULT_BINDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").expect("valid regex"));

static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        concat!(
            r#"@import\s+(?:url\(\s*(?:'(?P<u1>[^']*)'|"(?P<u2>[^"]*)"|(?P<u3>[^'")\s]+))\s*\)"#,
            r#"|'(?P<q1>[^']*)'|"(?P<q2>[^"]*)")[^;]*;?"#,
        ),
    )
    .expect("valid regex")
});

static SASS_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@(?P<rule>import|use|forward)\s+(?P<args>[^;\n]+);?"#).expect("valid regex")
});

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'(?P<s1>[^']*)'|"(?P<s2>[^"]*)""#).expect("valid regex")
});

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\burl\(\s*(?:'(?P<s1>[^']*)'|"(?P<s2>[^"]*)"|(?P<s3>[^'")\s]+))\s*\)"#)
        .expect("valid regex")
});

static HTML_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<!--\s*#include\s+file\s*=\s*"(?P<spec>[^"]+)"\s*-->"#).expect("valid regex")
});

/// `src`/`href` of elements that load an asset. Anchors and forms link to
/// pages, not dependencies.
static HTML_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        concat!(
            r#"(?i)<(?:link|script|img|source|video|audio)\b[^>]*?"#,
            r#"\s(?:src|href)\s*=\s*(?:"(?P<s1>[^"]*)"|'(?P<s2>[^']*)')"#,
        ),
    )
    .expect("valid regex")
});

/// Extract references from source text of the given kind.
///
/// Results are in source order. External specifiers (`http:`, `data:`,
/// protocol-relative, fragments) are skipped.
pub fn extract(kind: SourceKind, source: &str) -> Vec<RawReference> {
    let mut refs = match kind {
        SourceKind::Script => extract_script(source),
        SourceKind::Style => extract_style(source, false),
        SourceKind::Sass => extract_style(source, true),
        SourceKind::Document => extract_document(source),
        SourceKind::Data | SourceKind::Text | SourceKind::File => Vec::new(),
    };
    refs.sort_by_key(|r| r.span.start);
    refs
}

fn extract_script(source: &str) -> Vec<RawReference> {
    let masked = mask_comments(source, CommentStyle::Script);
    let mut refs = Vec::new();
    let mut taken: Vec<Range<usize>> = Vec::new();

    for caps in STATIC_IMPORT.captures_iter(&masked) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        // Type-only imports are erased by the compiler.
        if caps.name("type").is_some() {
            taken.push(whole);
            continue;
        }
        let Some(spec) = caps.name("spec") else { continue };
        let binding = (caps.name("kw").map(|m| m.as_str()) == Some("import"))
            .then(|| caps.name("clause").map(|m| m.as_str().trim()))
            .flatten()
            .filter(|clause| DEFAULT_BINDING.is_match(clause))
            .map(str::to_string);
        taken.push(whole.clone());
        push_reference(
            &mut refs,
            source,
            spec.range(),
            whole,
            ReferenceSyntax::StaticImport,
            binding,
        );
    }

    for caps in BARE_IMPORT.captures_iter(&masked) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        if overlaps(&taken, &whole) {
            continue;
        }
        if let Some(spec) = caps.name("spec") {
            push_reference(
                &mut refs,
                source,
                spec.range(),
                whole,
                ReferenceSyntax::StaticImport,
                None,
            );
        }
    }

    for caps in DYNAMIC_IMPORT.captures_iter(&masked) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        if let Some(spec) = caps.name("spec") {
            push_reference(
                &mut refs,
                source,
                spec.range(),
                whole,
                ReferenceSyntax::DynamicImport,
                None,
            );
        }
    }

    refs
}

fn extract_style(source: &str, sass: bool) -> Vec<RawReference> {
    let style = if sass { CommentStyle::Sass } else { CommentStyle::Css };
    let masked = mask_comments(source, style);
    let mut refs = Vec::new();
    let mut taken: Vec<Range<usize>> = Vec::new();

    if sass {
        for caps in SASS_DIRECTIVE.captures_iter(&masked) {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let Some(args) = caps.name("args") else { continue };
            let is_import = caps.name("rule").map(|m| m.as_str()) == Some("import");
            taken.push(whole.clone());

            for quoted in QUOTED.captures_iter(args.as_str()) {
                let Some(m) = quoted.name("s1").or_else(|| quoted.name("s2")) else {
                    continue;
                };
                let span = args.start() + m.start()..args.start() + m.end();
                let spec = &source[span.clone()];
                if spec.starts_with("sass:") {
                    // Built-in module.
                } else if is_import && is_plain_css_import(spec) {
                    push_reference(
                        &mut refs,
                        source,
                        span,
                        whole.clone(),
                        ReferenceSyntax::CssImport,
                        None,
                    );
                } else {
                    push_reference(
                        &mut refs,
                        source,
                        span,
                        whole.clone(),
                        ReferenceSyntax::SassInclude,
                        None,
                    );
                }
                // `@use "x" as y` and `@forward "x" show a` take a single URL.
                if !is_import {
                    break;
                }
            }
        }
    } else {
        for caps in CSS_IMPORT.captures_iter(&masked) {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            taken.push(whole.clone());
            let spec = ["u1", "u2", "u3", "q1", "q2"]
                .iter()
                .find_map(|name| caps.name(name));
            if let Some(spec) = spec {
                push_reference(
                    &mut refs,
                    source,
                    spec.range(),
                    whole,
                    ReferenceSyntax::CssImport,
                    None,
                );
            }
        }
    }

    for caps in CSS_URL.captures_iter(&masked) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        if overlaps(&taken, &whole) {
            continue;
        }
        let spec = ["s1", "s2", "s3"].iter().find_map(|name| caps.name(name));
        if let Some(spec) = spec {
            push_reference(&mut refs, source, spec.range(), whole, ReferenceSyntax::CssUrl, None);
        }
    }

    refs
}

fn extract_document(source: &str) -> Vec<RawReference> {
    let masked = mask_comments(source, CommentStyle::Html);
    let mut refs = Vec::new();

    for caps in HTML_INCLUDE.captures_iter(&masked) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        if let Some(spec) = caps.name("spec") {
            push_reference(
                &mut refs,
                source,
                spec.range(),
                whole,
                ReferenceSyntax::HtmlInclude,
                None,
            );
        }
    }

    for caps in HTML_ATTRIBUTE.captures_iter(&masked) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let spec = caps.name("s1").or_else(|| caps.name("s2"));
        if let Some(spec) = spec {
            let text = spec.as_str();
            // Root-absolute links and template placeholders are left alone.
            if text.starts_with('/') || text.contains("<%") || text.contains("{{") {
                continue;
            }
            push_reference(
                &mut refs,
                source,
                spec.range(),
                whole,
                ReferenceSyntax::HtmlAttribute,
                None,
            );
        }
    }

    refs
}

fn push_reference(
    refs: &mut Vec<RawReference>,
    source: &str,
    span: Range<usize>,
    statement: Range<usize>,
    syntax: ReferenceSyntax,
    binding: Option<String>,
) {
    let written = source[span.clone()].trim();
    if written.is_empty() || is_external(written) {
        return;
    }
    let specifier = strip_query(written);
    if specifier.is_empty() {
        return;
    }
    refs.push(RawReference {
        specifier: specifier.to_string(),
        syntax,
        span,
        statement,
        binding,
    });
}

/// Specifiers that point outside the project.
pub fn is_external(specifier: &str) -> bool {
    let lower = specifier.to_ascii_lowercase();
    lower.starts_with("//")
        || lower.starts_with('#')
        || ["http:", "https:", "data:", "mailto:", "tel:", "javascript:", "blob:"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
}

/// Remove `?query` and `#fragment` suffixes.
pub fn strip_query(specifier: &str) -> &str {
    let end = specifier.find(['?', '#']).unwrap_or(specifier.len());
    &specifier[..end]
}

fn is_plain_css_import(spec: &str) -> bool {
    spec.ends_with(".css") || spec.starts_with("url(")
}

fn overlaps(taken: &[Range<usize>], range: &Range<usize>) -> bool {
    taken
        .iter()
        .any(|t| t.start < range.end && range.start < t.end)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CommentStyle {
    Script,
    Css,
    Sass,
    Html,
}

/// Replace comment bytes with spaces, keeping newlines and offsets.
///
/// HTML comments that are include directives are kept.
fn mask_comments(source: &str, style: CommentStyle) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;

    if style == CommentStyle::Html {
        while let Some(found) = source[i..].find("<!--") {
            let start = i + found;
            let end = source[start + 4..]
                .find("-->")
                .map_or(bytes.len(), |e| start + 4 + e + 3);
            if !source[start + 4..].trim_start().starts_with("#include") {
                blank(&mut out, start..end);
            }
            i = end;
        }
        return into_string(out, source);
    }

    let line_comments = matches!(style, CommentStyle::Script | CommentStyle::Sass);
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q || (b == b'\n' && q != b'`') {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'`' if style == CommentStyle::Script => quote = Some(b),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = source[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |e| i + 2 + e + 2);
                blank(&mut out, i..end);
                i = end;
                continue;
            }
            b'/' if line_comments && bytes.get(i + 1) == Some(&b'/') => {
                // `url(//cdn...)` in Sass is not a comment.
                let in_url = style == CommentStyle::Sass && source[..i].ends_with("url(");
                if !in_url {
                    let end = source[i..].find('\n').map_or(bytes.len(), |e| i + e);
                    blank(&mut out, i..end);
                    i = end;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    into_string(out, source)
}

fn blank(out: &mut [u8], range: Range<usize>) {
    for b in &mut out[range] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

fn into_string(bytes: Vec<u8>, original: &str) -> String {
    // Only whole ASCII-delimited comment ranges are blanked, so this cannot fail
    // unless a comment ended inside a multi-byte sequence.
    String::from_utf8(bytes).unwrap_or_else(|_| original.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(kind: SourceKind, source: &str) -> Vec<(String, ReferenceSyntax)> {
        extract(kind, source)
            .into_iter()
            .map(|r| (r.specifier, r.syntax))
            .collect()
    }

    #[test]
    fn script_imports_in_source_order() {
        let source = r#"
import { a } from "./a";
import "./style.scss";
export * from './b';
const lazy = () => import("./lazy");
import logo from "../img/logo.png";
"#;
        let refs = specs(SourceKind::Script, source);
        assert_eq!(
            refs,
            vec![
                ("./a".into(), ReferenceSyntax::StaticImport),
                ("./style.scss".into(), ReferenceSyntax::StaticImport),
                ("./b".into(), ReferenceSyntax::StaticImport),
                ("./lazy".into(), ReferenceSyntax::DynamicImport),
                ("../img/logo.png".into(), ReferenceSyntax::StaticImport),
            ]
        );
    }

    #[test]
    fn default_binding_is_captured() {
        let source = "import logo from './logo.svg';\nimport { x } from './x';";
        let refs = extract(SourceKind::Script, source);
        assert_eq!(refs[0].binding.as_deref(), Some("logo"));
        assert_eq!(refs[1].binding, None);
    }

    #[test]
    fn multiline_import_clause() {
        let refs = specs(SourceKind::Script, "import {\n  a,\n  b as c,\n} from \"./mod\";\n");
        assert_eq!(refs, vec![("./mod".into(), ReferenceSyntax::StaticImport)]);
    }

    #[test]
    fn minified_statements() {
        let source = concat!(
            r#"import{mount as e}from"./lib/mount";import"./a.css";"#,
            r#"export*from"./b";import t from"./logo.png";"#,
        );
        let refs = extract(SourceKind::Script, source);
        let specs: Vec<_> = refs.iter().map(|r| r.specifier.as_str()).collect();
        assert_eq!(specs, ["./lib/mount", "./a.css", "./b", "./logo.png"]);
        assert_eq!(refs[3].binding.as_deref(), Some("t"));
        assert_eq!(&source[refs[1].statement.clone()], r#"import"./a.css";"#);
    }

    #[test]
    fn type_only_and_commented_imports_are_ignored() {
        let source = r#"
import type { Props } from "./types";
// import "./old";
/* import x from "./gone"; */
const url = "http://example.com"; // trailing
import "./real";
"#;
        assert_eq!(
            specs(SourceKind::Script, source),
            vec![("./real".into(), ReferenceSyntax::StaticImport)]
        );
    }

    #[test]
    fn css_imports_and_urls() {
        let source = r#"
@import "base.css";
@import url('theme.css') screen;
/* url(ignored.png) */
.logo { background: url(../img/logo.png?v=2#frag); }
.font { src: url("data:font/woff2;base64,AAAA"); }
.cdn { background: url(//cdn.example.com/x.png); }
"#;
        assert_eq!(
            specs(SourceKind::Style, source),
            vec![
                ("base.css".into(), ReferenceSyntax::CssImport),
                ("theme.css".into(), ReferenceSyntax::CssImport),
                ("../img/logo.png".into(), ReferenceSyntax::CssUrl),
            ]
        );
    }

    #[test]
    fn sass_directives() {
        let source = r#"
@use "sass:math";
@use "variables" as vars;
@import "mixins", "reset.css";
// @import "commented";
.x { background: url(//cdn.example.com/a.png); }
"#;
        assert_eq!(
            specs(SourceKind::Sass, source),
            vec![
                ("variables".into(), ReferenceSyntax::SassInclude),
                ("mixins".into(), ReferenceSyntax::SassInclude),
                ("reset.css".into(), ReferenceSyntax::CssImport),
            ]
        );
    }

    #[test]
    fn html_includes_and_attributes() {
        let source = r##"<html><head>
<!--#include file="partials/head.html" -->
<!-- <script src="old.js"></script> -->
<link rel="icon" href="favicon.png">
</head><body>
<a href="#top">top</a><a href="/docs/">docs</a><a href="guide/">guide</a>
<IMG alt="hero" SRC='img/hero.jpg'>
<div data-src="lazy.png"></div>
<script src="https://cdn.example.com/lib.js"></script>
</body></html>"##;
        assert_eq!(
            specs(SourceKind::Document, source),
            vec![
                ("partials/head.html".into(), ReferenceSyntax::HtmlInclude),
                ("favicon.png".into(), ReferenceSyntax::HtmlAttribute),
                ("img/hero.jpg".into(), ReferenceSyntax::HtmlAttribute),
            ]
        );
    }

    #[test]
    fn spans_point_at_specifiers() {
        let source = "@import 'a.css';";
        let refs = extract(SourceKind::Style, source);
        assert_eq!(&source[refs[0].span.clone()], "a.css");
        assert_eq!(&source[refs[0].statement.clone()], source);
    }

    #[test]
    fn classification_depends_on_target() {
        assert_eq!(
            ReferenceSyntax::StaticImport.classify(SourceKind::Data),
            ReferenceKind::ModuleImport
        );
        assert_eq!(
            ReferenceSyntax::StaticImport.classify(SourceKind::Style),
            ReferenceKind::AssetImport
        );
        assert!(ReferenceSyntax::SassInclude.classify(SourceKind::Sass).is_inline());
    }

    #[test]
    fn empty_sources_have_no_references() {
        let kinds = [
            SourceKind::Script,
            SourceKind::Style,
            SourceKind::Sass,
            SourceKind::Document,
        ];
        for kind in kinds {
            assert!(extract(kind, "").is_empty());
        }
    }
}
