//! Cached records describing filesystem objects.

use serde::{Deserialize, Serialize};
use skimfs_path::PathInfo;
use std::collections::BTreeMap;

/// Opaque provider-supplied metadata (size, timestamp, visibility, mime,
/// ...), keyed by attribute name.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Whether a cached object is a file or a directory.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory, observed directly or synthesized as an ancestor.
    Dir,
}

impl EntryKind {
    /// Returns true for [`EntryKind::Dir`].
    pub fn is_dir(self) -> bool {
        matches!(self, EntryKind::Dir)
    }
}

/// One file-or-directory object known to the cache.
///
/// The structural fields are derived from `path` via
/// [`skimfs_path::parse`]; `dirname == ""` means the object sits at the
/// root. Attributes merge additively across updates: new keys overwrite,
/// keys absent from an update are preserved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Canonical full path; unique key in the store.
    pub path: String,
    /// Canonical parent directory path, `""` at the root.
    pub dirname: String,
    /// Trailing path segment.
    pub basename: String,
    /// Basename stem (before the last `.`).
    pub filename: String,
    /// Basename extension (after the last `.`), if any.
    pub extension: Option<String>,
    /// File or directory.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Provider-supplied metadata, merged additively.
    pub attributes: Attributes,
}

impl Entry {
    /// Builds an entry from a parsed path with empty attributes.
    pub fn from_info(info: PathInfo, kind: EntryKind) -> Self {
        Entry {
            path: info.path,
            dirname: info.dirname,
            basename: info.basename,
            filename: info.filename,
            extension: info.extension,
            kind,
            attributes: Attributes::new(),
        }
    }

    /// Merges `attributes` over the existing set; new keys overwrite,
    /// absent keys are preserved.
    pub fn merge_attributes(&mut self, attributes: Attributes) {
        self.attributes.extend(attributes);
    }
}

/// Three-valued existence knowledge for one path.
///
/// Distinguishes "explicitly confirmed not to exist" from "never
/// queried", which a plain `Option` would conflate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Presence<'a> {
    /// The path exists; its cached entry is attached.
    Known(&'a Entry),
    /// The path is confirmed absent, either by a tombstone or because its
    /// parent directory was listed and the path was not in it.
    KnownAbsent,
    /// Nothing is known about the path.
    Unknown,
}

impl<'a> Presence<'a> {
    /// True iff the path is known to exist.
    pub fn exists(&self) -> bool {
        matches!(self, Presence::Known(_))
    }

    /// True unless the cache has no knowledge either way.
    pub fn is_known(&self) -> bool {
        !matches!(self, Presence::Unknown)
    }

    /// The cached entry, when the path is known to exist.
    pub fn entry(&self) -> Option<&'a Entry> {
        match self {
            Presence::Known(entry) => Some(entry),
            _ => None,
        }
    }
}

/// How completely a directory's children have been observed.
///
/// Absence from the completeness map is the third state: not listed at
/// all. [`Completeness::Recursive`] satisfies shallow queries; the
/// reverse does not hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Completeness {
    /// Only the immediate children have been enumerated.
    Shallow,
    /// The directory and all of its descendants have been enumerated.
    Recursive,
}

impl Completeness {
    /// Whether this level answers a query at the given depth.
    pub fn satisfies(self, recursive: bool) -> bool {
        !recursive || self == Completeness::Recursive
    }
}
