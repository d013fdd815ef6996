//! The entry HTML document.

use std::sync::LazyLock;

use regex::Regex;

static BETWEEN_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("valid regex"));

/// Elements whose whitespace is rendered.
static PREFORMATTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>").expect("valid regex")
});

/// Minimal page used when no template is configured.
pub fn default_document(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body>\n</body>\n</html>\n",
        escape_text(title)
    )
}

/// Insert stylesheet links before `</head>` and module scripts before
/// `</body>`. Missing closing tags put the tags at the start and end of the
/// document respectively.
pub fn inject_tags(document: &str, styles: &[String], scripts: &[String]) -> String {
    let links: String = styles
        .iter()
        .map(|href| {
            format!(
                "<link rel=\"stylesheet\" href=\"{}\">\n",
                escape_attribute(href)
            )
        })
        .collect();
    let tags: String = scripts
        .iter()
        .map(|src| {
            format!(
                "<script type=\"module\" src=\"{}\"></script>\n",
                escape_attribute(src)
            )
        })
        .collect();

    let mut out = document.to_string();
    if !links.is_empty() {
        match find_ignore_case(&out, "</head>") {
            Some(at) => out.insert_str(at, &links),
            None => out.insert_str(0, &links),
        }
    }
    if !tags.is_empty() {
        match find_ignore_case(&out, "</body>") {
            Some(at) => out.insert_str(at, &tags),
            None => out.push_str(&tags),
        }
    }
    out
}

/// Collapse whitespace between tags, leaving `<pre>` and `<textarea>`
/// contents alone.
pub fn minify(document: &str) -> String {
    let document = document.trim();
    let mut out = String::with_capacity(document.len());
    let mut last = 0;
    for kept in PREFORMATTED.find_iter(document) {
        // Outer runs keep the element's first and last byte (`<` and `>`)
        // so whitespace next to it still collapses.
        out.push_str(&BETWEEN_TAGS.replace_all(&document[last..kept.start() + 1], "><"));
        out.push_str(&document[kept.start() + 1..kept.end() - 1]);
        last = kept.end() - 1;
    }
    out.push_str(&BETWEEN_TAGS.replace_all(&document[last..], "><"));
    out
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().rfind(needle)
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_before_closing_tags() {
        let doc = "<html><HEAD><title>x</title></HEAD><body><main></main></body></html>";
        let out = inject_tags(doc, &["./app.min.css".into()], &["./app.min.js".into()]);
        assert_eq!(
            out,
            "<html><HEAD><title>x</title>\
             <link rel=\"stylesheet\" href=\"./app.min.css\">\n</HEAD><body><main></main>\
             <script type=\"module\" src=\"./app.min.js\"></script>\n</body></html>"
        );
    }

    #[test]
    fn fragments_without_head_or_body_still_get_tags() {
        let out = inject_tags("<p>hi</p>", &["a.css".into()], &["a.js".into()]);
        assert!(out.starts_with("<link"));
        assert!(out.ends_with("</script>\n"));
    }

    #[test]
    fn default_document_is_injectable() {
        let doc = default_document("Docs & more");
        assert!(doc.contains("<title>Docs &amp; more</title>"));
        let out = minify(&inject_tags(&doc, &[], &["./app.js".into()]));
        assert!(out.contains("<body><script type=\"module\" src=\"./app.js\"></script></body>"));
        assert!(!out.contains('\n'));
    }

    #[test]
    fn minify_keeps_preformatted_whitespace() {
        let doc = "<main>\n  <PRE>line 1\n  <b>bold</b>\n</PRE>\n  \
                   <textarea>\n  a\n</textarea>\n</main>";
        assert_eq!(
            minify(doc),
            "<main><PRE>line 1\n  <b>bold</b>\n</PRE><textarea>\n  a\n</textarea></main>"
        );
    }
}
