//! Path normalization failures.

use thiserror::Error;

/// Errors raised while canonicalizing a raw path.
#[derive(Debug, Error)]
pub enum PathError {
    /// A `..` segment would escape the defined root.
    #[error("path is outside of the defined root: [{path}]")]
    Traversal {
        /// The offending input path.
        path: String,
    },

    /// The input contains non-printable control code points.
    #[error("corrupted path detected: [{path}]")]
    CorruptedPath {
        /// The offending input path.
        path: String,
    },
}

/// Convenience alias used throughout the path subsystem.
pub type Result<T> = std::result::Result<T, PathError>;
