use chrono::{DateTime, Utc};
use std::path::{Component, Path};

pub fn from_unix(secs: u32) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(i64::from(secs), 0)
}

/// Appends `rel` to a remote `base` with exactly one separator between them.
pub fn join_remote(base: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches('/');
    if rel.is_empty() {
        return base.to_owned();
    }

    let base = base.trim_end_matches('/');
    format!("{base}/{rel}")
}

/// Last component of a remote path, ignoring trailing separators.
pub fn remote_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

pub fn remote_parent(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) if trimmed.len() > 1 => Some("/".to_owned()),
        Some(0) | None => None,
        Some(idx) => Some(trimmed[..idx].to_owned()),
    }
}

/// Every directory from the top of `path` down to `path` itself.
///
/// `/a/b/c` yields `/a`, `/a/b`, `/a/b/c`.
pub fn remote_ancestors(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let mut current = String::new();
    let mut dirs = vec![];

    for part in path.split('/').filter(|p| !p.is_empty() && *p != ".") {
        if absolute || !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        dirs.push(current.clone());
    }

    dirs
}

/// Relative local path rendered with `/` separators.
pub fn to_remote_relative(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether the path was written with a trailing separator (`dir/`).
pub fn has_trailing_separator(path: &str) -> bool {
    path.ends_with('/') || (cfg!(windows) && path.ends_with('\\'))
}
