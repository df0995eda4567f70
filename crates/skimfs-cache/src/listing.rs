//! Provider-facing listing flow.
//!
//! The listing provider is the expensive collaborator (network call,
//! enumeration cost). [`CachedLister`] wraps it with a [`MetaCache`] so a
//! directory is fetched at most once per completeness level, and both
//! fresh and cached requests are answered through the same
//! [`MetaCache::list_contents`] path.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::MetaCache;
use crate::entry::{Attributes, Entry, EntryKind, Presence};

/// One object as handed back by the provider: a path, an optional type
/// tag, and whatever metadata the provider attaches.
///
/// Deserializes straight from provider JSON payloads: `path` and `type`
/// are picked out, every other key lands in `attributes`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawObject {
    /// Canonical path of the object.
    pub path: String,
    /// File or directory; providers that omit it get [`EntryKind::File`].
    #[serde(rename = "type", default = "default_kind")]
    pub kind: EntryKind,
    /// All remaining provider metadata.
    #[serde(flatten)]
    pub attributes: Attributes,
}

fn default_kind() -> EntryKind {
    EntryKind::File
}

impl RawObject {
    /// A file object with no attributes.
    pub fn file(path: impl Into<String>) -> Self {
        RawObject {
            path: path.into(),
            kind: EntryKind::File,
            attributes: Attributes::new(),
        }
    }

    /// A directory object with no attributes.
    pub fn dir(path: impl Into<String>) -> Self {
        RawObject {
            path: path.into(),
            kind: EntryKind::Dir,
            attributes: Attributes::new(),
        }
    }

    /// Attaches one metadata attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// The expensive listing collaborator.
///
/// `list` enumerates `path` (immediate children, or the whole subtree
/// when `deep`); it fails rather than silently truncating.
pub trait ListingProvider {
    /// Provider failure type, propagated unchanged to callers.
    type Error;

    /// Enumerates the objects under `path`.
    fn list(&mut self, path: &str, deep: bool) -> Result<Vec<RawObject>, Self::Error>;
}

/// A [`MetaCache`] in front of a [`ListingProvider`].
///
/// Owns both; one instance per logical session, like the cache itself.
pub struct CachedLister<P> {
    cache: MetaCache,
    provider: P,
}

impl<P: ListingProvider> CachedLister<P> {
    /// Wraps `provider` with an empty cache.
    pub fn new(provider: P) -> Self {
        CachedLister {
            cache: MetaCache::new(),
            provider,
        }
    }

    /// Wraps `provider` with a pre-populated cache, e.g. one restored
    /// from a snapshot.
    pub fn with_cache(cache: MetaCache, provider: P) -> Self {
        CachedLister { cache, provider }
    }

    /// Lists `location`, going to the provider only when the cache is not
    /// complete at the requested depth. The answer always comes from the
    /// cache, so fresh and cached results share one code path.
    pub fn contents(&mut self, location: &str, deep: bool) -> Result<Vec<Entry>, P::Error> {
        if !self.cache.is_complete(location, deep) {
            debug!(location, deep, "listing cache miss, fetching from provider");
            let raw = self.provider.list(location, deep)?;
            self.cache.store_contents(location, raw, deep);
        }
        Ok(self.cache.list_contents(location, deep))
    }

    /// Whether `path` exists, listing its parent shallowly first when the
    /// cache has no knowledge either way.
    pub fn exists(&mut self, path: &str) -> Result<bool, P::Error> {
        if !matches!(self.cache.lookup(path), Presence::Unknown) {
            return Ok(self.cache.file_exists(path));
        }
        let parent = skimfs_path::dirname(path);
        self.contents(&parent, false)?;
        Ok(self.cache.file_exists(path))
    }

    /// Read access to the underlying cache.
    pub fn cache(&self) -> &MetaCache {
        &self.cache
    }

    /// Mutable access to the underlying cache, e.g. for
    /// [`MetaCache::update_object`] after a write-through.
    pub fn cache_mut(&mut self) -> &mut MetaCache {
        &mut self.cache
    }

    /// Unwraps the cache, e.g. to snapshot it at end of session.
    pub fn into_cache(self) -> MetaCache {
        self.cache
    }
}
