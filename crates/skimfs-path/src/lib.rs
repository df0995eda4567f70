#![warn(missing_docs)]

//! SkimFS path subsystem: OS-agnostic path parsing and canonicalization.
//!
//! Paths handled by SkimFS are relative, slash-separated and free of
//! `.`/`..` segments; the root is the empty string. [`normalize`] brings
//! raw caller input into that form (rejecting traversal escapes and
//! corrupted input), [`parse`] splits a canonical path into its
//! structural parts.

pub mod error;
pub mod info;
pub mod normalize;

pub use error::{PathError, Result};
pub use info::{dirname, normalize_dirname, parse, PathInfo};
pub use normalize::normalize;
