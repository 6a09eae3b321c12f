//! Caches that keep repeated work off the hot path.
//!
//! [`ParseCache`] is engine-owned: an LRU of content fingerprints to parsed
//! spans so identical buffers are never re-tokenised. [`BufferCache`] is
//! host-owned, one per editor buffer, and carries everything the
//! incremental controller needs between calls.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::fingerprint::Fingerprint;
use crate::parser::RawParse;
use crate::record::{CachedMask, MaskRecord};

use std::sync::Arc;

/// Maximum number of parse results retained in the LRU.
const PARSE_CACHE_ENTRIES: usize = 200;

/// LRU of fingerprint → parsed spans.
pub(crate) struct ParseCache {
    entries: LruCache<Fingerprint, Arc<RawParse>>,
}

impl ParseCache {
    pub(crate) fn new() -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(PARSE_CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    pub(crate) fn get(&mut self, fingerprint: &Fingerprint) -> Option<Arc<RawParse>> {
        self.entries.get(fingerprint).cloned()
    }

    pub(crate) fn put(&mut self, fingerprint: Fingerprint, parse: Arc<RawParse>) {
        self.entries.put(fingerprint, parse);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for ParseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseCache")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

/// Per-buffer state between masking calls, owned by the integration layer
/// and keyed by its opaque buffer handle.
///
/// Holds the last emitted records in owned form, the line offsets they were
/// positioned against, the content fingerprint for the no-change fast path,
/// and the post-paste "force full remask" latch.
#[derive(Debug, Default)]
pub struct BufferCache {
    masks: Vec<CachedMask>,
    line_offsets: Vec<usize>,
    fingerprint: Option<Fingerprint>,
    needs_full_remask: bool,
    generation: u64,
}

impl BufferCache {
    /// Creates an empty cache for a newly attached buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while the cache holds no completed run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fingerprint.is_none()
    }

    /// Returns the cached records from the last run.
    #[must_use]
    pub fn masks(&self) -> &[CachedMask] {
        &self.masks
    }

    /// Returns the line offsets from the last run.
    #[must_use]
    pub fn line_offsets(&self) -> &[usize] {
        &self.line_offsets
    }

    /// Returns the number of lines the buffer had on the last run.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_offsets.len()
    }

    /// Marks the buffer as having received a bulk paste: the next
    /// incremental call performs a full rebuild regardless of its edit
    /// descriptor or fingerprint, then the latch clears.
    pub fn mark_paste(&mut self) {
        self.needs_full_remask = true;
    }

    /// Returns whether the paste latch is currently set.
    #[must_use]
    pub fn paste_pending(&self) -> bool {
        self.needs_full_remask
    }

    /// Drops all cached state, as on buffer detach and re-attach.
    pub fn clear(&mut self) {
        self.masks.clear();
        self.line_offsets.clear();
        self.fingerprint = None;
        self.needs_full_remask = false;
        self.generation = 0;
    }

    pub(crate) fn fingerprint(&self) -> Option<Fingerprint> {
        self.fingerprint
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Consumes the paste latch.
    pub(crate) fn take_full_remask(&mut self) -> bool {
        std::mem::take(&mut self.needs_full_remask)
    }

    /// Replaces the cached state with the outcome of a completed run.
    pub(crate) fn store(
        &mut self,
        masks: &[MaskRecord<'_>],
        line_offsets: Vec<usize>,
        fingerprint: Fingerprint,
        generation: u64,
    ) {
        self.masks = masks.iter().map(CachedMask::from).collect();
        self.line_offsets = line_offsets;
        self.fingerprint = Some(fingerprint);
        self.generation = generation;
    }
}
