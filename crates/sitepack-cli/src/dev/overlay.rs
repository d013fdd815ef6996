//! Error page served while no successful build exists.

/// HTML page showing `error`. It loads the reload client so the page
/// refreshes itself once a build succeeds.
pub fn error_page(error: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Build failed - sitepack</title>
<style>
body {{
  margin: 0; background: #1b1b1f; color: #e6e6e6;
  font: 14px/1.5 ui-monospace, Menlo, monospace;
}}
main {{ max-width: 960px; margin: 48px auto; padding: 0 24px; }}
h1 {{ color: #ff6b6b; font-size: 18px; }}
pre {{ white-space: pre-wrap; background: #26262c; padding: 16px; border-left: 3px solid #ff6b6b; }}
p {{ color: #9a9aa3; }}
</style>
</head>
<body>
<main>
<h1>Build failed</h1>
<pre>{}</pre>
<p>Fix the error and save; this page reloads on the next successful build.</p>
</main>
<script type="module" src="{}"></script>
</body>
</html>
"#,
        escape_html(error),
        super::CLIENT_PATH
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_in_errors() {
        let page = error_page("unexpected token `<script>` in \"a.ts\" & more");
        assert!(page.contains("unexpected token `&lt;script&gt;` in &quot;a.ts&quot; &amp; more"));
        assert!(!page.contains("<script>`"));
    }

    #[test]
    fn loads_the_reload_client() {
        let page = error_page("boom");
        assert!(page.contains(r#"src="/__sitepack/client.js""#));
    }
}
