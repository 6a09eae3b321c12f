//! Per-key masking policy.
//!
//! A policy is an ordered set of glob rules over entry keys, a second set
//! over source-file basenames, and a default mode name. Rules are compiled
//! once into matchers ordered by specificity; resolution is a linear scan
//! over a small rule set, with a key hit always beating any source rule.

use std::sync::Arc;

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::mode::FULL_MODE;

/// One `glob → mode` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    /// Glob over the entry key (or source basename, depending on the table
    /// the rule belongs to). `*` matches any run of characters, `?` exactly
    /// one; patterns without wildcards match exactly.
    pub glob: String,
    /// Name of the mode applied on a hit.
    pub mode: String,
}

impl PatternRule {
    /// Creates a rule from a glob and a mode name.
    #[must_use]
    pub fn new(glob: &str, mode: &str) -> Self {
        Self {
            glob: glob.to_string(),
            mode: mode.to_string(),
        }
    }
}

/// The policy as configured by the host: key rules, source rules, and the
/// default mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    /// Rules evaluated against the entry key.
    pub patterns: Vec<PatternRule>,
    /// Rules evaluated against the source file's basename.
    pub sources: Vec<PatternRule>,
    /// Mode applied when no rule matches.
    pub default_mode: String,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            sources: Vec::new(),
            default_mode: FULL_MODE.to_string(),
        }
    }
}

struct CompiledRule {
    matcher: GlobMatcher,
    mode: Arc<str>,
    exact: bool,
    wildcards: u32,
    literal_prefix: usize,
    index: usize,
}

impl CompiledRule {
    fn compile(rule: &PatternRule, index: usize) -> Result<Self, PolicyError> {
        let glob = Glob::new(&rule.glob).map_err(|source| PolicyError::InvalidGlob {
            pattern: rule.glob.clone(),
            source,
        })?;

        let wildcards = rule.glob.chars().filter(|c| is_wildcard(*c)).count();
        let literal_prefix = rule.glob.find(is_wildcard).unwrap_or(rule.glob.len());

        Ok(Self {
            matcher: glob.compile_matcher(),
            mode: Arc::from(rule.mode.as_str()),
            exact: wildcards == 0,
            wildcards: u32::try_from(wildcards).unwrap_or(u32::MAX),
            literal_prefix,
            index,
        })
    }

    fn is_match(&self, candidate: &str) -> bool {
        self.matcher.is_match(candidate)
    }
}

fn is_wildcard(c: char) -> bool {
    matches!(c, '*' | '?' | '[' | '{')
}

/// Sorts by specificity: exact rules first, then fewer wildcards, then the
/// longer literal prefix, then declaration order.
fn sort_by_specificity(rules: &mut [CompiledRule]) {
    rules.sort_by(|a, b| {
        b.exact
            .cmp(&a.exact)
            .then(a.wildcards.cmp(&b.wildcards))
            .then(b.literal_prefix.cmp(&a.literal_prefix))
            .then(a.index.cmp(&b.index))
    });
}

/// The compiled form of a [`PolicyTable`], ready for per-entry resolution.
pub struct PolicyResolver {
    key_rules: Vec<CompiledRule>,
    source_rules: Vec<CompiledRule>,
    default_mode: Arc<str>,
}

impl std::fmt::Debug for PolicyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyResolver")
            .field("key_rules", &self.key_rules.len())
            .field("source_rules", &self.source_rules.len())
            .field("default_mode", &self.default_mode)
            .finish_non_exhaustive()
    }
}

impl PolicyResolver {
    /// Compiles a policy table, validating every glob.
    pub fn compile(table: &PolicyTable) -> Result<Self, PolicyError> {
        let mut key_rules = compile_rules(&table.patterns)?;
        let mut source_rules = compile_rules(&table.sources)?;
        sort_by_specificity(&mut key_rules);
        sort_by_specificity(&mut source_rules);

        Ok(Self {
            key_rules,
            source_rules,
            default_mode: Arc::from(table.default_mode.as_str()),
        })
    }

    /// Resolves the mode name for `key`, optionally scoped by the source
    /// file's basename.
    ///
    /// Key rules are scanned in specificity order and the first hit wins;
    /// source rules are consulted only when no key rule matched; otherwise
    /// the default mode applies.
    #[must_use]
    pub fn resolve(&self, key: &str, source_basename: Option<&str>) -> &Arc<str> {
        if let Some(rule) = self.key_rules.iter().find(|r| r.is_match(key)) {
            return &rule.mode;
        }

        if let Some(basename) = source_basename
            && let Some(rule) = self.source_rules.iter().find(|r| r.is_match(basename))
        {
            return &rule.mode;
        }

        &self.default_mode
    }

    /// Returns the configured default mode name.
    #[must_use]
    pub fn default_mode(&self) -> &Arc<str> {
        &self.default_mode
    }
}

impl Default for PolicyResolver {
    fn default() -> Self {
        Self {
            key_rules: Vec::new(),
            source_rules: Vec::new(),
            default_mode: Arc::from(FULL_MODE),
        }
    }
}

fn compile_rules(rules: &[PatternRule]) -> Result<Vec<CompiledRule>, PolicyError> {
    rules
        .iter()
        .enumerate()
        .map(|(index, rule)| CompiledRule::compile(rule, index))
        .collect()
}
