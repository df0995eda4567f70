//! The metadata cache proper: path -> entry store plus per-directory
//! completeness tracking.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::entry::{Attributes, Completeness, Entry, EntryKind, Presence};
use crate::listing::RawObject;

/// Store value for one path: either a real entry or a tombstone recording
/// an explicitly confirmed miss. "Never queried" is no slot at all.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Slot {
    Present(Entry),
    Missing,
}

/// Counters for cache mutations. Query paths take `&self` and are not
/// counted.
#[derive(Clone, Debug, Default)]
pub struct CacheStats {
    /// Entries created on first sight (including tombstone replacements).
    pub inserts: u64,
    /// Attribute merges into existing entries.
    pub updates: u64,
    /// Placeholder directories created by ancestor synthesis.
    pub synthesized_dirs: u64,
    /// Tombstones recorded via [`MetaCache::store_miss`].
    pub tombstones: u64,
}

/// A malformed or undecodable cache snapshot.
#[derive(Debug, Error)]
#[error("cache snapshot error: {0}")]
pub struct SnapshotError(#[from] serde_json::Error);

/// In-memory metadata cache for one logical session.
///
/// Constructed empty, populated only through ingestion
/// ([`MetaCache::store_contents`]) or individual updates, never evicted;
/// the instance is discarded with its owning scope. Not synchronized:
/// callers sharing one instance across threads must serialize access
/// externally.
///
/// Two invariants hold after every public mutation:
///
/// * ancestor closure: every entry's non-empty `dirname` has a directory
///   entry of its own, synthesized if the provider never supplied one;
/// * `list_contents` iterates entries in first-seen insertion order.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MetaCache {
    entries: HashMap<String, Slot>,
    order: Vec<String>,
    complete: HashMap<String, Completeness>,
    #[serde(skip)]
    stats: CacheStats,
}

impl MetaCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests the result of listing `directory`.
    ///
    /// Every raw object is merged into the store (creating entries and
    /// synthesizing ancestors as needed). When `recursive` is set, each
    /// distinct parent directory seen among objects inside `directory` is
    /// marked recursively complete as well: one deep fetch of a subtree
    /// vouches for all the subdirectories it visited. `directory` itself
    /// is always marked at the requested depth.
    pub fn store_contents(&mut self, directory: &str, contents: Vec<RawObject>, recursive: bool) {
        let mut directories = vec![directory.to_string()];

        for object in contents {
            let dirname = skimfs_path::dirname(&object.path);
            self.apply(&object.path, Some(object.kind), object.attributes);

            if recursive
                && Self::path_is_in_directory(directory, &object.path)
                && !directories.contains(&dirname)
            {
                directories.push(dirname);
            }
        }

        debug!(
            directory,
            recursive,
            marked = directories.len(),
            "stored listing contents"
        );
        for dir in directories {
            self.set_complete(&dir, recursive);
        }
    }

    /// Merges `attributes` into the entry at `path`, creating it from
    /// [`skimfs_path::parse`] on first sight (a tombstone counts as first
    /// sight and is replaced). Idempotent for identical arguments.
    pub fn update_object(&mut self, path: &str, attributes: Attributes) {
        self.apply(path, None, attributes);
    }

    /// Records that `path` is confirmed not to exist, distinct from the
    /// path never having been queried.
    pub fn store_miss(&mut self, path: &str) {
        debug!(path, "recorded confirmed miss");
        self.insert_slot(path.to_string(), Slot::Missing);
        self.stats.tombstones += 1;
    }

    /// Walks upward from the entry at `path`, synthesizing minimal
    /// directory entries until an already-known ancestor or the root is
    /// reached. No-op when `path` has no real entry.
    ///
    /// The walk terminates because each parent is strictly shorter than
    /// its child and the root's parent is `""`.
    pub fn ensure_parent_directories(&mut self, path: &str) {
        let mut dirname = match self.entries.get(path) {
            Some(Slot::Present(entry)) => entry.dirname.clone(),
            _ => return,
        };

        while !dirname.is_empty() && !self.entries.contains_key(&dirname) {
            let info = skimfs_path::parse(&dirname);
            let parent = info.dirname.clone();
            debug!(dir = %dirname, "synthesized ancestor directory");
            self.insert_slot(dirname, Slot::Present(Entry::from_info(info, EntryKind::Dir)));
            self.stats.synthesized_dirs += 1;
            dirname = parent;
        }
    }

    /// Marks `dirname` complete at the given depth, unconditionally
    /// overwriting any prior level. A later shallow listing therefore
    /// downgrades an earlier recursive one; the cache trusts the most
    /// recent explicit assertion.
    pub fn set_complete(&mut self, dirname: &str, recursive: bool) {
        let level = if recursive {
            Completeness::Recursive
        } else {
            Completeness::Shallow
        };
        debug!(dirname, ?level, "marked directory complete");
        self.complete.insert(dirname.to_string(), level);
    }

    /// Whether `dirname` has been listed completely at the given depth.
    /// A recursive record satisfies a shallow query, not vice versa.
    pub fn is_complete(&self, dirname: &str, recursive: bool) -> bool {
        self.complete
            .get(dirname)
            .is_some_and(|level| level.satisfies(recursive))
    }

    /// Three-valued existence knowledge for `path`.
    ///
    /// With no slot stored, a shallow-complete parent upgrades the answer
    /// from [`Presence::Unknown`] to [`Presence::KnownAbsent`]: the parent
    /// was enumerated and `path` was not in it.
    pub fn lookup(&self, path: &str) -> Presence<'_> {
        match self.entries.get(path) {
            Some(Slot::Present(entry)) => Presence::Known(entry),
            Some(Slot::Missing) => Presence::KnownAbsent,
            None if self.is_complete(&skimfs_path::dirname(path), false) => Presence::KnownAbsent,
            None => Presence::Unknown,
        }
    }

    /// Whether `path` is known to exist. Both "confirmed absent" and
    /// "unknown" answer `false`; callers needing the distinction use
    /// [`MetaCache::lookup`].
    pub fn file_exists(&self, path: &str) -> bool {
        self.lookup(path).exists()
    }

    /// Materializes the cached listing of `location`: every entry whose
    /// `dirname` equals `location`, plus — when `deep` is set — every
    /// entry strictly under it. Tombstones are skipped. The result is a
    /// snapshot in first-seen insertion order; later mutations do not
    /// affect it.
    pub fn list_contents(&self, location: &str, deep: bool) -> Vec<Entry> {
        let mut result = Vec::new();
        for path in &self.order {
            let Some(Slot::Present(entry)) = self.entries.get(path) else {
                continue;
            };
            if entry.dirname == location
                || (deep && Self::path_is_in_directory(location, &entry.path))
            {
                result.push(entry.clone());
            }
        }
        result
    }

    /// Containment check used throughout: the empty directory contains
    /// every path; otherwise `path` must carry `directory + "/"` as a
    /// prefix. A bare string prefix is not containment (`"ab/c"` is not
    /// in `"a"`), and a directory does not contain itself.
    pub fn path_is_in_directory(directory: &str, path: &str) -> bool {
        directory.is_empty()
            || path
                .strip_prefix(directory)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Number of stored slots, tombstones included.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries, ordering and completeness knowledge.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.complete.clear();
    }

    /// Mutation counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Serializes the cache (entries, order, completeness) to JSON so an
    /// owner can park it in a session store between requests. Statistics
    /// are not part of the snapshot.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores a cache from a [`MetaCache::to_json`] snapshot.
    pub fn from_json(snapshot: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(snapshot)?)
    }

    /// The single mutation primitive: create-or-merge the entry at
    /// `path`, then re-establish ancestor closure.
    fn apply(&mut self, path: &str, kind: Option<EntryKind>, attributes: Attributes) {
        match self.entries.get_mut(path) {
            Some(Slot::Present(entry)) => {
                if let Some(kind) = kind {
                    entry.kind = kind;
                }
                entry.merge_attributes(attributes);
                self.stats.updates += 1;
            }
            _ => {
                let mut entry =
                    Entry::from_info(skimfs_path::parse(path), kind.unwrap_or(EntryKind::File));
                entry.merge_attributes(attributes);
                self.insert_slot(path.to_string(), Slot::Present(entry));
                self.stats.inserts += 1;
            }
        }

        self.ensure_parent_directories(path);
    }

    /// Inserts or replaces a slot, recording first-seen order.
    fn insert_slot(&mut self, path: String, slot: Slot) {
        if !self.entries.contains_key(&path) {
            self.order.push(path.clone());
        }
        self.entries.insert(path, slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::RawObject;
    use serde_json::json;

    fn attrs(pairs: &[(&str, serde_json::Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_update_object_creates_from_parse() {
        let mut cache = MetaCache::new();
        cache.update_object("a/b/c.txt", attrs(&[("size", json!(42))]));

        let entry = cache.lookup("a/b/c.txt").entry().unwrap();
        assert_eq!(entry.dirname, "a/b");
        assert_eq!(entry.basename, "c.txt");
        assert_eq!(entry.kind, EntryKind::File);
        assert_eq!(entry.attributes["size"], json!(42));
    }

    #[test]
    fn test_ancestor_closure() {
        let mut cache = MetaCache::new();
        cache.update_object("a/b/c.txt", Attributes::new());

        for dir in ["a/b", "a"] {
            let entry = cache.lookup(dir).entry().unwrap();
            assert_eq!(entry.kind, EntryKind::Dir);
        }
        assert_eq!(cache.lookup("a").entry().unwrap().dirname, "");
        assert_eq!(cache.entry_count(), 3);
    }

    #[test]
    fn test_ancestor_walk_stops_at_known_ancestor() {
        let mut cache = MetaCache::new();
        cache.update_object("a/b/one.txt", Attributes::new());
        let synthesized_before = cache.stats().synthesized_dirs;

        cache.update_object("a/b/two.txt", Attributes::new());
        assert_eq!(cache.stats().synthesized_dirs, synthesized_before);
    }

    #[test]
    fn test_update_object_idempotent() {
        let mut cache = MetaCache::new();
        let attributes = attrs(&[("size", json!(7))]);
        cache.update_object("x/y.txt", attributes.clone());
        let first = cache.lookup("x/y.txt").entry().unwrap().clone();
        let count = cache.entry_count();

        cache.update_object("x/y.txt", attributes);
        assert_eq!(cache.lookup("x/y.txt").entry().unwrap(), &first);
        assert_eq!(cache.entry_count(), count);
    }

    #[test]
    fn test_merge_preserves_absent_keys() {
        let mut cache = MetaCache::new();
        cache.update_object("f.txt", attrs(&[("size", json!(1)), ("mime", json!("text/plain"))]));
        cache.update_object("f.txt", attrs(&[("size", json!(2))]));

        let entry = cache.lookup("f.txt").entry().unwrap();
        assert_eq!(entry.attributes["size"], json!(2));
        assert_eq!(entry.attributes["mime"], json!("text/plain"));
    }

    #[test]
    fn test_store_contents_round_trip() {
        let mut cache = MetaCache::new();
        cache.store_contents(
            "",
            vec![RawObject::file("a.txt"), RawObject::file("b/c.txt")],
            true,
        );

        let listing = cache.list_contents("", true);
        let paths: Vec<&str> = listing.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"a.txt"));
        assert!(paths.contains(&"b/c.txt"));

        assert!(cache.is_complete("", true));
        assert!(cache.is_complete("b", true), "subtree marking");
    }

    #[test]
    fn test_shallow_store_does_not_mark_subdirectories() {
        let mut cache = MetaCache::new();
        cache.store_contents(
            "",
            vec![RawObject::file("a.txt"), RawObject::file("b/c.txt")],
            false,
        );

        assert!(cache.is_complete("", false));
        assert!(!cache.is_complete("", true));
        assert!(!cache.is_complete("b", false));
    }

    #[test]
    fn test_recursive_marking_skips_objects_outside_directory() {
        let mut cache = MetaCache::new();
        // Provider handed back a stray object outside the listed subtree.
        cache.store_contents(
            "sub",
            vec![RawObject::file("sub/x/f.txt"), RawObject::file("other/g.txt")],
            true,
        );

        assert!(cache.is_complete("sub", true));
        assert!(cache.is_complete("sub/x", true));
        assert!(!cache.is_complete("other", false));
    }

    #[test]
    fn test_completeness_levels() {
        let mut cache = MetaCache::new();
        assert!(!cache.is_complete("d", false));

        cache.set_complete("d", false);
        assert!(cache.is_complete("d", false));
        assert!(!cache.is_complete("d", true));

        cache.set_complete("d", true);
        assert!(cache.is_complete("d", false));
        assert!(cache.is_complete("d", true));
    }

    #[test]
    fn test_downgrade_is_not_prevented() {
        // Documents current behavior: set_complete trusts the most recent
        // assertion, so a shallow listing erases recursive knowledge.
        let mut cache = MetaCache::new();
        cache.set_complete("d", true);
        cache.set_complete("d", false);
        assert!(!cache.is_complete("d", true));
        assert!(cache.is_complete("d", false));
    }

    #[test]
    fn test_file_exists_three_states() {
        let mut cache = MetaCache::new();

        // Never listed: unknown, conservatively false.
        assert!(!cache.file_exists("a/x.txt"));
        assert_eq!(cache.lookup("a/x.txt"), Presence::Unknown);

        // Empty but shallow-complete listing of "a": absence is now
        // established, distinguishable via is_complete.
        cache.store_contents("a", vec![], false);
        assert!(!cache.file_exists("a/x.txt"));
        assert_eq!(cache.lookup("a/x.txt"), Presence::KnownAbsent);
        assert!(cache.is_complete("a", false));
    }

    #[test]
    fn test_tombstone() {
        let mut cache = MetaCache::new();
        cache.store_miss("ghost.txt");

        assert!(!cache.file_exists("ghost.txt"));
        assert_eq!(cache.lookup("ghost.txt"), Presence::KnownAbsent);
        assert_eq!(cache.stats().tombstones, 1);

        // A later real sighting replaces the tombstone.
        cache.update_object("ghost.txt", attrs(&[("size", json!(3))]));
        assert!(cache.file_exists("ghost.txt"));
    }

    #[test]
    fn test_tombstones_skipped_in_listings() {
        let mut cache = MetaCache::new();
        cache.update_object("d/a.txt", Attributes::new());
        cache.store_miss("d/b.txt");

        let listing = cache.list_contents("d", false);
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].path, "d/a.txt");
    }

    #[test]
    fn test_containment_boundary() {
        assert!(MetaCache::path_is_in_directory("", "anything"));
        assert!(MetaCache::path_is_in_directory("", ""));
        assert!(MetaCache::path_is_in_directory("a", "a/b"));
        assert!(!MetaCache::path_is_in_directory("a", "ab/c"));
        assert!(!MetaCache::path_is_in_directory("a", "a"));
    }

    #[test]
    fn test_list_contents_shallow_vs_deep() {
        let mut cache = MetaCache::new();
        cache.update_object("top.txt", Attributes::new());
        cache.update_object("d/mid.txt", Attributes::new());
        cache.update_object("d/e/leaf.txt", Attributes::new());

        let shallow: Vec<String> = cache
            .list_contents("d", false)
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(shallow, vec!["d/mid.txt".to_string(), "d/e".to_string()]);

        let deep: Vec<String> = cache
            .list_contents("d", true)
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(
            deep,
            vec![
                "d/mid.txt".to_string(),
                "d/e/leaf.txt".to_string(),
                "d/e".to_string(),
            ]
        );
    }

    #[test]
    fn test_list_contents_insertion_order() {
        let mut cache = MetaCache::new();
        cache.update_object("z.txt", Attributes::new());
        cache.update_object("a.txt", Attributes::new());
        cache.update_object("m.txt", Attributes::new());

        let paths: Vec<String> = cache
            .list_contents("", false)
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(
            paths,
            vec!["z.txt".to_string(), "a.txt".to_string(), "m.txt".to_string()]
        );
    }

    #[test]
    fn test_list_contents_is_a_snapshot() {
        let mut cache = MetaCache::new();
        cache.update_object("d/a.txt", Attributes::new());
        let listing = cache.list_contents("d", false);

        cache.update_object("d/b.txt", Attributes::new());
        assert_eq!(listing.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cache = MetaCache::new();
        cache.store_contents("", vec![RawObject::file("a.txt")], false);
        cache.clear();

        assert!(cache.is_empty());
        assert!(!cache.is_complete("", false));
        assert!(cache.list_contents("", true).is_empty());
    }

    #[test]
    fn test_stats_counters() {
        let mut cache = MetaCache::new();
        cache.update_object("a/b.txt", Attributes::new());
        cache.update_object("a/b.txt", Attributes::new());

        assert_eq!(cache.stats().inserts, 1);
        assert_eq!(cache.stats().updates, 1);
        assert_eq!(cache.stats().synthesized_dirs, 1);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut cache = MetaCache::new();
        cache.store_contents(
            "",
            vec![
                RawObject::file("z.txt").with_attribute("size", json!(5)),
                RawObject::dir("sub"),
                RawObject::file("sub/n.txt"),
            ],
            true,
        );
        cache.store_miss("gone.txt");

        let restored = MetaCache::from_json(&cache.to_json().unwrap()).unwrap();

        assert_eq!(restored.entry_count(), cache.entry_count());
        assert!(restored.is_complete("", true));
        assert!(restored.is_complete("sub", true));
        assert_eq!(restored.lookup("gone.txt"), Presence::KnownAbsent);
        assert_eq!(
            restored.lookup("z.txt").entry().unwrap().attributes["size"],
            json!(5)
        );

        // Insertion order survives the round trip.
        let before: Vec<String> = cache
            .list_contents("", true)
            .into_iter()
            .map(|e| e.path)
            .collect();
        let after: Vec<String> = restored
            .list_contents("", true)
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(MetaCache::from_json("not json").is_err());
    }
}
