//! Span-based reference rewriting.
//!
//! References are extracted again from transformed output, so spans always
//! refer to the text being rewritten.

use std::ops::Range;

use sitepack_graph::{RawReference, SourceKind, extract};

/// What to do with one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// Replace the specifier, keeping the surrounding statement.
    Specifier(String),
    /// Replace the whole statement or attribute.
    Statement(String),
}

/// Rewrite every reference in `text` for which `decide` returns an action.
/// References it skips stay as written.
pub fn rewrite_references(
    kind: SourceKind,
    text: &str,
    mut decide: impl FnMut(&RawReference) -> Option<Rewrite>,
) -> String {
    let mut edits = Vec::new();
    for reference in extract(kind, text) {
        match decide(&reference) {
            Some(Rewrite::Specifier(replacement)) => {
                edits.push((reference.span.clone(), replacement))
            }
            Some(Rewrite::Statement(replacement)) => {
                edits.push((reference.statement.clone(), replacement))
            }
            None => {}
        }
    }
    apply_edits(text, edits)
}

/// Apply replacements in order of position. An edit overlapping an earlier
/// one is dropped.
pub fn apply_edits(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        if range.start < cursor || range.end > text.len() {
            continue;
        }
        out.push_str(&text[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_specifiers_and_statements() {
        let src = "import a from \"./a\";\nimport \"./s.css\";\n\
                   import logo from \"./logo.png\";\nrun(a, logo);\n";
        let out = rewrite_references(SourceKind::Script, src, |r| match r.specifier.as_str() {
            "./a" => Some(Rewrite::Specifier("./a.min.js".into())),
            "./s.css" => Some(Rewrite::Statement(String::new())),
            "./logo.png" => Some(Rewrite::Statement(format!(
                "const {} = \"./img/logo.png\";",
                r.binding.as_deref().unwrap_or("_")
            ))),
            _ => None,
        });
        assert_eq!(
            out,
            "import a from \"./a.min.js\";\n\nconst logo = \"./img/logo.png\";\nrun(a, logo);\n"
        );
    }

    #[test]
    fn css_urls_are_rewritten_in_place() {
        let src = ".a{background:url(img/x.png)}@import \"b.css\";";
        let out = rewrite_references(SourceKind::Style, src, |r| {
            Some(Rewrite::Specifier(format!("./out/{}", r.specifier)))
        });
        assert_eq!(out, ".a{background:url(./out/img/x.png)}@import \"./out/b.css\";");
    }

    #[test]
    fn overlapping_edits_keep_the_first() {
        let edits = vec![(1..4, "X".into()), (2..3, "Y".into()), (5..6, "Z".into())];
        let out = apply_edits("abcdef", edits);
        assert_eq!(out, "aXeZ");
    }
}
