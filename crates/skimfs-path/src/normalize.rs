//! Canonicalization of raw caller-supplied paths.

use crate::error::{PathError, Result};

/// Canonicalizes a raw path into slash-separated segments with no
/// leading/trailing slash and no `.`/`..` segments.
///
/// Backslash separators are converted to forward slashes first. Empty and
/// `.` segments are dropped; a `..` segment pops the previously accepted
/// segment and fails with [`PathError::Traversal`] when there is nothing
/// left to pop, since the path would then escape the root. Input holding
/// control code points fails with [`PathError::CorruptedPath`].
///
/// The function is idempotent: normalizing an already-normalized path
/// returns it unchanged.
pub fn normalize(path: &str) -> Result<String> {
    let path = path.replace('\\', "/");
    reject_control_chars(&path)?;

    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(PathError::Traversal { path: path.clone() });
                }
            }
            segment => parts.push(segment),
        }
    }

    Ok(parts.join("/"))
}

/// Rejects paths carrying non-printable control code points.
fn reject_control_chars(path: &str) -> Result<()> {
    if path.chars().any(char::is_control) {
        return Err(PathError::CorruptedPath {
            path: path.to_string(),
        });
    }
    Ok(())
}
