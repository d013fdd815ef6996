//! Output filenames, content hashes and relative URLs.

/// Render a filename template.
///
/// `[name]` and `[ext]` are substituted as given. Without a hash every
/// `[hash]` segment is dropped together with one adjoining `.` or `-`, so
/// `[name].[hash].min.js` becomes `[name].min.js`.
pub fn render(template: &str, name: &str, ext: &str, hash: Option<&str>) -> String {
    let with_hash = match hash {
        Some(hash) => template.replace("[hash]", hash),
        None => strip_hash(template),
    };
    with_hash.replace("[name]", name).replace("[ext]", ext)
}

fn strip_hash(template: &str) -> String {
    let mut out = template.to_string();
    for pattern in [".[hash]", "-[hash]", "[hash].", "[hash]-", "[hash]"] {
        out = out.replace(pattern, "");
    }
    out
}

/// BLAKE3 digest of `bytes` as lowercase hex, truncated to `len` digits.
pub fn content_hash(bytes: &[u8], len: usize) -> String {
    let hex = blake3::hash(bytes).to_hex();
    hex[..len.min(hex.len())].to_string()
}

/// Directory part of an output path (`""` for files at the top level).
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

/// Last path component without its final extension.
pub fn file_stem(path: &str) -> &str {
    let name = path.rfind('/').map_or(path, |i| &path[i + 1..]);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// URL of `target` as seen from a file in `from_dir`. Both are paths
/// relative to the output directory. The result always starts with `./` or
/// `../`, which keeps it a valid relative module specifier.
pub fn relative_url(from_dir: &str, target: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let ups = from.len() - common;
    let rest = to[common..].join("/");
    if ups == 0 {
        format!("./{rest}")
    } else {
        format!("{}{rest}", "../".repeat(ups))
    }
}
