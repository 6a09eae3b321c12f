//! The masking engine: ties the tokeniser, policy resolver, and mode
//! registry together and adds the incremental update path.
//!
//! A [`MaskEngine`] is an explicit value the host owns - there are no
//! process-wide singletons. Hosts that serve multiple threads create one
//! engine per thread; every call is a straight-line synchronous
//! computation.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::{trace, warn};

use crate::cache::{BufferCache, ParseCache};
use crate::config::Config;
use crate::error::{EncodingError, PolicyError, VeilError};
use crate::fingerprint::Fingerprint;
use crate::mode::{
    FULL_MODE, MaskContext, MaskMode, ModeDef, ModeInfo, ModeOptions, ModeRegistry, SchemaError,
};
use crate::parser::{self, ParseOptions, ParseResult, RawParse};
use crate::policy::{PolicyResolver, PolicyTable};
use crate::pool::MaskPool;
use crate::record::MaskRecord;

/// Describes the extent of an edit for [`MaskEngine::generate_incremental`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditScope {
    /// Recompute every record. Required whenever the edit changed the
    /// buffer's line count, since cached records outside a range would
    /// carry stale line numbers.
    FullRebuild,
    /// Only the inclusive 1-indexed line range was touched; records
    /// outside it are reused from the cache.
    LineRange {
        /// First edited line.
        min_line: usize,
        /// Last edited line.
        max_line: usize,
    },
}

/// Output of [`MaskEngine::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskSet<'a> {
    /// All mask records, in ascending `value_start` order.
    pub masks: Vec<MaskRecord<'a>>,
    /// Byte offset of each 1-indexed line start.
    pub line_offsets: Vec<usize>,
}

/// Output of [`MaskEngine::generate_incremental`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalMasks<'a> {
    /// The merged, complete record list (mirrored into the buffer cache).
    pub masks: Vec<MaskRecord<'a>>,
    /// The minimal subset the overlay layer must redraw.
    pub masks_to_apply: Vec<MaskRecord<'a>>,
    /// Byte offset of each 1-indexed line start.
    pub line_offsets: Vec<usize>,
    /// `true` when the content fingerprint matched and nothing was
    /// recomputed; `masks` then echoes the cached records.
    pub unchanged: bool,
}

/// The masking engine.
///
/// Owns the mode registry, the compiled policy, the parse LRU, and the
/// mask-string pool. Reconfiguring policy or modes bumps an internal
/// generation counter so that buffer caches written under the old
/// configuration are never trusted again.
pub struct MaskEngine {
    registry: ModeRegistry,
    policy: PolicyResolver,
    skip_comments: bool,
    parse_cache: ParseCache,
    pool: MaskPool,
    generation: u64,
    warned_modes: HashSet<Box<str>>,
}

impl fmt::Debug for MaskEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskEngine")
            .field("modes", &self.registry.len())
            .field("policy", &self.policy)
            .field("skip_comments", &self.skip_comments)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl MaskEngine {
    /// Creates an engine with the built-in modes, an empty policy
    /// (everything masked with `full`), and comment entries masked too.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: ModeRegistry::builtin(),
            policy: PolicyResolver::default(),
            skip_comments: false,
            parse_cache: ParseCache::new(),
            pool: MaskPool::new(),
            generation: 0,
            warned_modes: HashSet::new(),
        }
    }

    /// Creates an engine from a loaded [`Config`]: applies its policy
    /// table, mode option tables, and comment handling.
    pub fn with_config(config: &Config) -> Result<Self, VeilError> {
        let mut engine = Self::new();
        engine.skip_comments = config.skip_comments;
        engine.set_policy(&config.policy())?;
        for (name, options) in &config.modes {
            engine.configure_mode(name, options.clone())?;
        }
        Ok(engine)
    }

    /// Replaces the policy table, recompiling all rule globs.
    pub fn set_policy(&mut self, table: &PolicyTable) -> Result<(), PolicyError> {
        self.policy = PolicyResolver::compile(table)?;
        self.bump_generation();
        Ok(())
    }

    /// Registers a custom mode. See [`ModeRegistry::register`].
    pub fn register_mode(&mut self, name: &str, def: ModeDef) -> Result<(), SchemaError> {
        self.registry.register(name, def)?;
        self.bump_generation();
        Ok(())
    }

    /// Reconfigures a registered mode. See [`ModeRegistry::configure`].
    pub fn configure_mode(&mut self, name: &str, options: ModeOptions) -> Result<(), SchemaError> {
        self.registry.configure(name, options)?;
        self.bump_generation();
        Ok(())
    }

    /// Builds a one-off instance of a mode with option overrides.
    pub fn create_mode(&self, name: &str, overrides: ModeOptions) -> Result<MaskMode, SchemaError> {
        self.registry.create(name, overrides)
    }

    /// Returns all registered mode names, sorted.
    #[must_use]
    pub fn list_modes(&self) -> Vec<Arc<str>> {
        self.registry.list()
    }

    /// Returns a summary of one registered mode.
    #[must_use]
    pub fn mode_info(&self, name: &str) -> Option<ModeInfo> {
        self.registry.info(name)
    }

    /// Returns whether comment entries are skipped during generation.
    #[must_use]
    pub fn skip_comments(&self) -> bool {
        self.skip_comments
    }

    /// Controls whether `#KEY=VALUE` entries produce records.
    pub fn set_skip_comments(&mut self, skip: bool) {
        if self.skip_comments != skip {
            self.skip_comments = skip;
            self.bump_generation();
        }
    }

    /// Parses `input` into entries and line offsets.
    ///
    /// Identical inputs hit the engine's fingerprint LRU and skip the
    /// tokeniser. The only failure is non-UTF-8 input.
    pub fn parse<'a>(&mut self, input: &'a [u8], options: ParseOptions) -> Result<ParseResult<'a>, EncodingError> {
        let text = utf8(input)?;
        let raw = self.parse_cached(text);
        Ok(raw.view(text, options))
    }

    /// Produces mask records for the whole buffer.
    ///
    /// `source` is the buffer's file name, of which only the basename is
    /// used for source-policy matching.
    pub fn generate<'a>(&mut self, input: &'a [u8], source: Option<&str>) -> Result<MaskSet<'a>, EncodingError> {
        let text = utf8(input)?;
        let raw = self.parse_cached(text);
        let masks = self.build_masks(text, &raw, source, None);

        #[cfg(feature = "tracing")]
        trace!(records = masks.len(), bytes = text.len(), "generated masks");

        Ok(MaskSet {
            masks,
            line_offsets: raw.line_offsets.clone(),
        })
    }

    /// Produces mask records after an edit, reusing cached records for
    /// untouched lines.
    ///
    /// The caller owns `cache` (one per buffer) and must pass
    /// [`EditScope::FullRebuild`] whenever the edit changed the line
    /// count. The cache is updated in place with the merged result.
    pub fn generate_incremental<'a>(
        &mut self,
        input: &'a [u8],
        source: Option<&str>,
        edit: EditScope,
        cache: &mut BufferCache,
    ) -> Result<IncrementalMasks<'a>, EncodingError> {
        let text = utf8(input)?;
        let fingerprint = Fingerprint::of(input);
        let force_full = cache.take_full_remask();
        let reusable = !force_full && !cache.is_empty() && cache.generation() == self.generation;

        if reusable && edit == EditScope::FullRebuild && cache.fingerprint() == Some(fingerprint) {
            #[cfg(feature = "tracing")]
            trace!("fingerprint match, skipping remask");

            let masks: Vec<MaskRecord<'a>> = cache.masks().iter().filter_map(|m| m.rehydrate(text)).collect();
            return Ok(IncrementalMasks {
                masks,
                masks_to_apply: Vec::new(),
                line_offsets: cache.line_offsets().to_vec(),
                unchanged: true,
            });
        }

        let raw = self.parse_cached(text);
        let range = match edit {
            EditScope::LineRange { min_line, max_line } if reusable => Some((min_line, max_line)),
            _ => None,
        };

        let (masks, masks_to_apply) = match range {
            Some((min_line, max_line)) => {
                let fresh = self.build_masks(text, &raw, source, Some((min_line, max_line)));
                let mut merged: Vec<MaskRecord<'a>> = cache
                    .masks()
                    .iter()
                    .filter(|m| m.line_number < min_line || m.line_number > max_line)
                    .filter_map(|m| m.rehydrate(text))
                    .collect();
                merged.extend(fresh.iter().cloned());
                merged.sort_by_key(|m| (m.line_number, m.value_start));
                (merged, fresh)
            }
            None => {
                let masks = self.build_masks(text, &raw, source, None);
                (masks.clone(), masks)
            }
        };

        cache.store(&masks, raw.line_offsets.clone(), fingerprint, self.generation);

        #[cfg(feature = "tracing")]
        trace!(
            records = masks.len(),
            to_apply = masks_to_apply.len(),
            "incremental masks"
        );

        Ok(IncrementalMasks {
            masks,
            masks_to_apply,
            line_offsets: raw.line_offsets.clone(),
            unchanged: false,
        })
    }

    /// Drops the parse LRU and the mask-string pool. Buffer caches are
    /// host-owned and unaffected.
    pub fn clear_caches(&mut self) {
        self.parse_cache.clear();
        self.pool.clear();
    }

    /// Returns the number of parse results currently held by the LRU.
    #[must_use]
    pub fn cached_parses(&self) -> usize {
        self.parse_cache.len()
    }

    fn bump_generation(&mut self) {
        self.generation += 1;
    }

    fn parse_cached(&mut self, text: &str) -> Arc<RawParse> {
        let fingerprint = Fingerprint::of(text.as_bytes());
        if let Some(hit) = self.parse_cache.get(&fingerprint) {
            #[cfg(feature = "tracing")]
            trace!("parse cache hit");
            return hit;
        }

        let raw = Arc::new(parser::parse_raw(text));
        self.parse_cache.put(fingerprint, Arc::clone(&raw));
        raw
    }

    /// The generate loop: resolve a mode per entry and emit a record when
    /// the mask differs from the value.
    ///
    /// Two memo tables local to the call keep buffers with many repeated
    /// keys cheap: key → mode name, and mode name → bound instance.
    fn build_masks<'a>(
        &mut self,
        text: &'a str,
        raw: &RawParse,
        source: Option<&str>,
        line_filter: Option<(usize, usize)>,
    ) -> Vec<MaskRecord<'a>> {
        let basename = source.map(source_basename);
        let mut mode_names: HashMap<&'a str, Arc<str>> = HashMap::new();
        let mut instances: HashMap<Arc<str>, MaskMode> = HashMap::new();
        let mut records = Vec::new();

        for raw_entry in &raw.entries {
            let entry = raw_entry.view(text);

            if entry.is_comment && self.skip_comments {
                continue;
            }
            if let Some((min_line, max_line)) = line_filter
                && !(min_line..=max_line).contains(&entry.line_number)
            {
                continue;
            }

            let mode_name = match mode_names.get(entry.key) {
                Some(name) => Arc::clone(name),
                None => {
                    let name = Arc::clone(self.policy.resolve(entry.key, basename));
                    mode_names.insert(entry.key, Arc::clone(&name));
                    name
                }
            };

            if !instances.contains_key(&mode_name) {
                let instance = self.resolve_instance(&mode_name);
                instances.insert(Arc::clone(&mode_name), instance);
            }
            let mode = &instances[&mode_name];

            let ctx = MaskContext {
                key: entry.key,
                value: entry.value,
                source: basename.unwrap_or(""),
                line_number: entry.line_number,
                quote_type: entry.quote_type,
                is_comment: entry.is_comment,
                options: mode.options(),
            };

            let Some(mask) = mode.apply(&ctx, &mut self.pool) else {
                continue;
            };
            if mask.as_ref() == entry.value {
                continue;
            }

            records.push(MaskRecord {
                line_number: entry.line_number,
                value_end_line: entry.value_end_line,
                value_start: entry.value_start,
                value_end: entry.value_end,
                mask,
                quote_type: entry.quote_type,
                value: entry.value,
            });
        }

        records
    }

    /// Looks up a mode instance, degrading gracefully: an unknown name
    /// falls back to the default mode (diagnosed once per name), and an
    /// unknown default falls back to built-in `full`.
    fn resolve_instance(&mut self, name: &str) -> MaskMode {
        if let Some(mode) = self.registry.get(name) {
            return mode.clone();
        }

        if self.warned_modes.insert(name.into()) {
            #[cfg(feature = "tracing")]
            warn!(mode = name, "policy references an unregistered mask mode, using the default");
        }

        let default = Arc::clone(self.policy.default_mode());
        if default.as_ref() != name
            && let Some(mode) = self.registry.get(&default)
        {
            return mode.clone();
        }

        self.registry.get(FULL_MODE).cloned().unwrap_or_else(MaskMode::fallback_full)
    }
}

impl Default for MaskEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn utf8(input: &[u8]) -> Result<&str, EncodingError> {
    std::str::from_utf8(input).map_err(EncodingError::new)
}

/// Strips any directory components: only the basename participates in
/// source-policy matching.
fn source_basename(source: &str) -> &str {
    source.rsplit(['/', '\\']).next().unwrap_or(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::OptionValue;
    use crate::policy::PatternRule;

    fn opts(pairs: &[(&str, OptionValue)]) -> ModeOptions {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    fn engine_with_policy(patterns: &[(&str, &str)], sources: &[(&str, &str)]) -> MaskEngine {
        let mut engine = MaskEngine::new();
        engine
            .set_policy(&PolicyTable {
                patterns: patterns.iter().map(|(g, m)| PatternRule::new(g, m)).collect(),
                sources: sources.iter().map(|(g, m)| PatternRule::new(g, m)).collect(),
                default_mode: "full".to_string(),
            })
            .unwrap();
        engine
    }

    #[test]
    fn generate_masks_an_unquoted_value_with_exact_spans() {
        let mut engine = MaskEngine::new();
        let set = engine.generate(b"API_KEY=secret123\n", None).unwrap();

        assert_eq!(set.masks.len(), 1);
        let record = &set.masks[0];
        assert_eq!(record.value_start, 8);
        assert_eq!(record.value_end, 17);
        assert_eq!(record.line_number, 1);
        assert_eq!(record.value_end_line, 1);
        assert_eq!(record.mask.as_ref(), "*********");
        assert_eq!(record.value, "secret123");
    }

    #[test]
    fn generate_rejects_invalid_utf8() {
        let mut engine = MaskEngine::new();
        let err = engine.generate(b"KEY=\xff\xfe", None).unwrap_err();
        assert_eq!(err.valid_up_to, 4);
    }

    #[test]
    fn parse_rejects_invalid_utf8() {
        let mut engine = MaskEngine::new();
        assert!(engine.parse(b"\xc3", ParseOptions::default()).is_err());
    }

    #[test]
    fn generate_applies_pattern_policy_per_key() {
        let mut engine = engine_with_policy(&[("*_TOKEN", "partial")], &[]);
        engine
            .configure_mode(
                "partial",
                opts(&[
                    ("show_start", OptionValue::from(2i64)),
                    ("show_end", OptionValue::from(2i64)),
                ]),
            )
            .unwrap();

        let set = engine.generate(b"TOKEN=mysecretvalue\nAUTH_TOKEN=secrettoken\n", None).unwrap();

        assert_eq!(set.masks.len(), 2);
        // TOKEN does not match *_TOKEN: default full applies.
        assert_eq!(set.masks[0].mask.as_ref(), "*************");
        // AUTH_TOKEN matches: partial with 2-byte bookends.
        assert_eq!(set.masks[1].mask.as_ref(), "se*******en");
    }

    #[test]
    fn generate_source_rule_can_disable_masking() {
        let mut engine = engine_with_policy(&[], &[("dev.env", "none")]);

        let set = engine.generate(b"KEY=secret\n", Some("dev.env")).unwrap();
        assert!(set.masks.is_empty());

        let set = engine.generate(b"KEY=secret\n", Some("prod.env")).unwrap();
        assert_eq!(set.masks.len(), 1);
    }

    #[test]
    fn generate_matches_sources_by_basename_only() {
        let mut engine = engine_with_policy(&[], &[("dev.env", "none")]);
        let set = engine.generate(b"KEY=secret\n", Some("/home/user/project/dev.env")).unwrap();
        assert!(set.masks.is_empty());
    }

    #[test]
    fn key_pattern_beats_source_pattern() {
        let mut engine = engine_with_policy(&[("API_KEY", "full")], &[("dev.env", "none")]);
        let set = engine.generate(b"API_KEY=secret\nOTHER=value\n", Some("dev.env")).unwrap();

        // API_KEY is masked by the key rule; OTHER is released by the
        // source rule.
        assert_eq!(set.masks.len(), 1);
        assert_eq!(set.masks[0].value, "secret");
    }

    #[test]
    fn comment_entries_are_masked_by_default() {
        let mut engine = MaskEngine::new();
        let set = engine.generate(b"#FOO=bar\nBAR=baz\n", None).unwrap();
        assert_eq!(set.masks.len(), 2);
    }

    #[test]
    fn skip_comments_drops_comment_entries() {
        let mut engine = MaskEngine::new();
        engine.set_skip_comments(true);

        let set = engine.generate(b"#FOO=bar\nBAR=baz\n", None).unwrap();
        assert_eq!(set.masks.len(), 1);
        assert_eq!(set.masks[0].value, "baz");
        assert_eq!(set.masks[0].value_start, 13);
        assert_eq!(set.masks[0].value_end, 16);
    }

    #[test]
    fn empty_values_produce_no_record() {
        let mut engine = MaskEngine::new();
        let set = engine.generate(b"EMPTY=\nFULL=x\n", None).unwrap();
        assert_eq!(set.masks.len(), 1);
        assert_eq!(set.masks[0].value, "x");
    }

    #[test]
    fn records_are_ordered_by_value_start() {
        let mut engine = MaskEngine::new();
        let set = engine.generate(b"A=1\nB=2\nC=3\n", None).unwrap();
        let starts: Vec<usize> = set.masks.iter().map(|m| m.value_start).collect();
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn generate_is_idempotent() {
        let mut engine = engine_with_policy(&[("*_TOKEN", "partial")], &[]);
        let input = b"A=alpha\nAUTH_TOKEN=secrettoken\nB=beta\n";

        let first = engine.generate(input, Some("x.env")).unwrap();
        let second = engine.generate(input, Some("x.env")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn repeated_generate_hits_the_parse_cache() {
        let mut engine = MaskEngine::new();
        engine.generate(b"KEY=value\n", None).unwrap();
        assert_eq!(engine.cached_parses(), 1);
        engine.generate(b"KEY=value\n", None).unwrap();
        assert_eq!(engine.cached_parses(), 1);
        engine.generate(b"KEY=other\n", None).unwrap();
        assert_eq!(engine.cached_parses(), 2);
    }

    #[test]
    fn clear_caches_empties_the_parse_cache() {
        let mut engine = MaskEngine::new();
        engine.generate(b"KEY=value\n", None).unwrap();
        engine.clear_caches();
        assert_eq!(engine.cached_parses(), 0);
    }

    #[test]
    fn unknown_policy_mode_falls_back_to_the_default() {
        let mut engine = engine_with_policy(&[("API_KEY", "no_such_mode")], &[]);
        let set = engine.generate(b"API_KEY=secret123\n", None).unwrap();

        // Fallback is the default mode (full), never a crash.
        assert_eq!(set.masks.len(), 1);
        assert_eq!(set.masks[0].mask.as_ref(), "*********");
    }

    #[test]
    fn unknown_default_mode_falls_back_to_builtin_full() {
        let mut engine = MaskEngine::new();
        engine
            .set_policy(&PolicyTable {
                patterns: Vec::new(),
                sources: Vec::new(),
                default_mode: "ghost".to_string(),
            })
            .unwrap();

        let set = engine.generate(b"KEY=secret\n", None).unwrap();
        assert_eq!(set.masks.len(), 1);
        assert_eq!(set.masks[0].mask.as_ref(), "******");
    }

    #[test]
    fn custom_modes_participate_in_generation() {
        let mut engine = engine_with_policy(&[("*", "redact")], &[]);
        engine
            .register_mode("redact", ModeDef::new(|_| "[hidden]".to_string()))
            .unwrap();

        let set = engine.generate(b"KEY=secret\n", None).unwrap();
        assert_eq!(set.masks[0].mask.as_ref(), "[hidden]");
    }

    #[test]
    fn custom_identity_mode_emits_no_records() {
        let mut engine = engine_with_policy(&[("*", "mirror")], &[]);
        engine
            .register_mode("mirror", ModeDef::new(|ctx| ctx.value.to_string()))
            .unwrap();

        let set = engine.generate(b"KEY=secret\n", None).unwrap();
        assert!(set.masks.is_empty());
    }

    #[test]
    fn multiline_value_is_masked_as_one_record() {
        let mut engine = MaskEngine::new();
        let input = b"JSON=\"{\n  \\\"k\\\": \\\"v\\\"\n}\"\n";
        let set = engine.generate(input, None).unwrap();

        assert_eq!(set.masks.len(), 1);
        let record = &set.masks[0];
        assert_eq!(record.line_number, 1);
        assert_eq!(record.value_end_line, 3);
        assert_eq!(record.quote_type, crate::parser::QuoteType::Double);
        assert_eq!(record.mask.len(), record.value.len());
    }

    #[test]
    fn incremental_full_rebuild_applies_everything() {
        let mut engine = MaskEngine::new();
        let mut cache = BufferCache::new();

        let out = engine
            .generate_incremental(b"A=1234\nB=5678\n", None, EditScope::FullRebuild, &mut cache)
            .unwrap();

        assert!(!out.unchanged);
        assert_eq!(out.masks.len(), 2);
        assert_eq!(out.masks_to_apply, out.masks);
        assert_eq!(cache.masks().len(), 2);
    }

    #[test]
    fn incremental_fast_path_skips_unchanged_content() {
        let mut engine = MaskEngine::new();
        let mut cache = BufferCache::new();
        let input = b"A=1234\nB=5678\n";

        let first = engine
            .generate_incremental(input, None, EditScope::FullRebuild, &mut cache)
            .unwrap();
        let second = engine
            .generate_incremental(input, None, EditScope::FullRebuild, &mut cache)
            .unwrap();

        assert!(second.unchanged);
        assert!(second.masks_to_apply.is_empty());
        assert_eq!(second.masks, first.masks);
        assert_eq!(second.line_offsets, first.line_offsets);
    }

    #[test]
    fn incremental_line_range_reuses_untouched_records() {
        let mut engine = MaskEngine::new();
        let mut cache = BufferCache::new();

        let pre = b"A=aaaa\nB=bbbb\nC=cccc\n";
        let before = engine
            .generate_incremental(pre, None, EditScope::FullRebuild, &mut cache)
            .unwrap();
        assert_eq!(before.masks.len(), 3);

        // Edit line 2 only, preserving the line count and byte layout.
        let post = b"A=aaaa\nB=xyzw\nC=cccc\n";
        let after = engine
            .generate_incremental(
                post,
                None,
                EditScope::LineRange { min_line: 2, max_line: 2 },
                &mut cache,
            )
            .unwrap();

        assert_eq!(after.masks.len(), 3);
        let lines: Vec<usize> = after.masks.iter().map(|m| m.line_number).collect();
        assert_eq!(lines, vec![1, 2, 3]);

        // Records outside the range are byte-for-byte the cached ones.
        assert_eq!(after.masks[0], before.masks[0]);
        assert_eq!(after.masks[2], before.masks[2]);

        // Only the edited line is redrawn.
        assert_eq!(after.masks_to_apply.len(), 1);
        assert_eq!(after.masks_to_apply[0].line_number, 2);
        assert_eq!(after.masks_to_apply[0].value, "xyzw");
    }

    #[test]
    fn incremental_line_range_matches_a_full_generate() {
        let mut engine = MaskEngine::new();
        let mut cache = BufferCache::new();

        let pre = b"A=aaaa\nB=bbbb\nC=cccc\n";
        engine
            .generate_incremental(pre, None, EditScope::FullRebuild, &mut cache)
            .unwrap();

        let post = b"A=aaaa\nB=xyzw\nC=cccc\n";
        let incremental = engine
            .generate_incremental(
                post,
                None,
                EditScope::LineRange { min_line: 2, max_line: 2 },
                &mut cache,
            )
            .unwrap();
        let full = engine.generate(post, None).unwrap();

        assert_eq!(incremental.masks, full.masks);
        assert_eq!(incremental.line_offsets, full.line_offsets);
    }

    #[test]
    fn incremental_without_cache_state_rebuilds_fully() {
        let mut engine = MaskEngine::new();
        let mut cache = BufferCache::new();

        let out = engine
            .generate_incremental(
                b"A=1234\nB=5678\n",
                None,
                EditScope::LineRange { min_line: 1, max_line: 1 },
                &mut cache,
            )
            .unwrap();

        // No cached run to merge with: everything is rebuilt and applied.
        assert_eq!(out.masks.len(), 2);
        assert_eq!(out.masks_to_apply.len(), 2);
    }

    #[test]
    fn paste_latch_forces_one_full_rebuild() {
        let mut engine = MaskEngine::new();
        let mut cache = BufferCache::new();
        let input = b"A=1234\nB=5678\n";

        engine
            .generate_incremental(input, None, EditScope::FullRebuild, &mut cache)
            .unwrap();

        cache.mark_paste();
        let pasted = engine
            .generate_incremental(
                input,
                None,
                EditScope::LineRange { min_line: 1, max_line: 1 },
                &mut cache,
            )
            .unwrap();

        // Latch overrides both the range and the fingerprint fast path.
        assert!(!pasted.unchanged);
        assert_eq!(pasted.masks_to_apply.len(), 2);

        // Latch is cleared afterwards.
        let again = engine
            .generate_incremental(input, None, EditScope::FullRebuild, &mut cache)
            .unwrap();
        assert!(again.unchanged);
    }

    #[test]
    fn reconfiguration_invalidates_buffer_caches() {
        let mut engine = MaskEngine::new();
        let mut cache = BufferCache::new();
        let input = b"KEY=secret\n";

        engine
            .generate_incremental(input, None, EditScope::FullRebuild, &mut cache)
            .unwrap();

        engine
            .configure_mode("full", opts(&[("mask_char", OptionValue::from('#'))]))
            .unwrap();

        // Identical content, but the cached records were produced under the
        // old configuration and must not be returned.
        let out = engine
            .generate_incremental(input, None, EditScope::FullRebuild, &mut cache)
            .unwrap();
        assert!(!out.unchanged);
        assert_eq!(out.masks[0].mask.as_ref(), "######");
    }

    #[test]
    fn with_config_applies_policy_modes_and_comment_handling() {
        let config = Config::from_toml(
            r#"
            skip_comments = true
            default_mode = "full"

            [[patterns]]
            glob = "*_TOKEN"
            mode = "partial"

            [modes.partial]
            show_start = 2
            show_end = 2
        "#,
        )
        .unwrap();

        let mut engine = MaskEngine::with_config(&config).unwrap();
        let set = engine.generate(b"#HIDDEN=abc\nAUTH_TOKEN=secrettoken\n", None).unwrap();

        assert_eq!(set.masks.len(), 1);
        assert_eq!(set.masks[0].mask.as_ref(), "se*******en");
    }

    #[test]
    fn list_modes_and_mode_info_surface_the_registry() {
        let engine = MaskEngine::new();
        let modes = engine.list_modes();
        let names: Vec<&str> = modes.iter().map(|n| n.as_ref() as &str).collect();
        assert_eq!(names, vec!["full", "none", "partial"]);
        assert!(engine.mode_info("full").unwrap().builtin);
        assert!(engine.mode_info("nope").is_none());
    }

    #[test]
    fn source_basename_strips_directories() {
        assert_eq!(source_basename("/home/user/dev.env"), "dev.env");
        assert_eq!(source_basename("C:\\project\\dev.env"), "dev.env");
        assert_eq!(source_basename("dev.env"), "dev.env");
    }
}
