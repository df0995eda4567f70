#![warn(missing_docs)]

//! SkimFS cache subsystem: an in-memory metadata cache between a
//! file-browser backend and an expensive listing provider.
//!
//! The cache stores one [`Entry`] per known path, synthesizes placeholder
//! entries for implied ancestors so the store is always a connected path
//! tree, and tracks per-directory completeness (shallow vs recursive) so
//! partial knowledge is never mistaken for complete knowledge.
//! [`CachedLister`] wires a cache to a [`ListingProvider`] so fresh and
//! cached listings go through one code path.

pub mod cache;
pub mod entry;
pub mod listing;

pub use cache::{CacheStats, MetaCache, SnapshotError};
pub use entry::{Attributes, Completeness, Entry, EntryKind, Presence};
pub use listing::{CachedLister, ListingProvider, RawObject};
