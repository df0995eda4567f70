//! Structural decomposition of canonical paths.

use serde::{Deserialize, Serialize};

/// Structural record for one path: the path itself plus its parent
/// directory, trailing segment and stem/extension split.
///
/// The parent of a root-level path is the empty string, never `"."`; the
/// cache keys its per-directory state by that convention.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathInfo {
    /// The full path as given.
    pub path: String,
    /// Parent directory, `""` for root-level paths.
    pub dirname: String,
    /// Trailing path segment, with trailing separators trimmed.
    pub basename: String,
    /// Basename stem: everything before the last `.`.
    pub filename: String,
    /// Basename extension: everything after the last `.`, if any.
    pub extension: Option<String>,
}

/// Splits `path` into its structural parts. Pure and total: any string
/// yields a record.
pub fn parse(path: &str) -> PathInfo {
    let basename = basename(path);
    let (filename, extension) = split_extension(&basename);

    PathInfo {
        path: path.to_string(),
        dirname: dirname(path),
        basename,
        filename,
        extension,
    }
}

/// Returns the normalized parent directory of `path`.
///
/// OS-agnostic: only `/` separates segments. A parent equal to the path's
/// own root collapses to `""`.
pub fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    let parent = match trimmed.rfind('/') {
        Some(idx) => trimmed[..idx].trim_end_matches('/'),
        None => "",
    };
    normalize_dirname(parent).to_string()
}

/// Collapses the `"."` parent sentinel to the empty string.
pub fn normalize_dirname(dirname: &str) -> &str {
    if dirname == "." {
        ""
    } else {
        dirname
    }
}

fn basename(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

fn split_extension(basename: &str) -> (String, Option<String>) {
    match basename.rfind('.') {
        Some(idx) => (
            basename[..idx].to_string(),
            Some(basename[idx + 1..].to_string()),
        ),
        None => (basename.to_string(), None),
    }
}
