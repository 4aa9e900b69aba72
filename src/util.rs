use std::collections::HashSet;
use std::path::Path;

/// Drops repeated names, keeping the first occurrence of each.
pub fn uniq<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let name = name.as_ref();
        if seen.insert(name.to_string()) {
            out.push(name.to_string());
        }
    }
    out
}

/// Last component of a slash separated repository path.
pub fn basename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
}
