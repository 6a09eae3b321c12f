//! Core masking engine for veil.
//!
//! This crate turns dotenv text into *mask decorations*: byte-exact spans
//! of the original buffer paired with the replacement string an editor
//! should draw over them, so the real values never enter the display
//! pipeline. It is designed to be embedded in editor integrations that own
//! the buffer and the overlay primitive.
//!
//! # Main Types
//!
//! - [`MaskEngine`] - parses a buffer, resolves the per-key policy, and
//!   emits [`MaskRecord`]s, with an incremental path for edits
//! - [`PolicyTable`] - ordered glob rules over keys and source basenames
//! - [`ModeRegistry`] - the built-in `full` / `partial` / `none` modes plus
//!   user-registered custom modes
//! - [`BufferCache`] - host-owned per-buffer state for incremental updates
//! - [`Config`] - user configuration loaded from `.veil.toml`
//!
//! # Error Handling
//!
//! This crate uses [`thiserror`] for structured, typed errors that library
//! consumers can match on:
//!
//! - [`EncodingError`] - the input is not UTF-8 (the only hard failure)
//! - [`PolicyError`] - policy glob compilation failures
//! - [`SchemaError`] - mode option validation failures
//! - [`VeilError`] - top-level enum combining the above
//!
//! Policy misconfiguration is defensive: an unknown mode name falls back
//! to the default mode with a one-shot diagnostic and never crashes the
//! engine.

/// Parse-result and per-buffer caches for incremental masking.
pub mod cache;
/// User configuration loaded from `.veil.toml`.
pub mod config;
/// The masking engine and its incremental update controller.
pub mod engine;
/// Error types for encoding, policy, schema, and configuration failures.
pub mod error;
/// Content fingerprints for the no-change fast path.
pub mod fingerprint;
/// Mask modes: built-ins, custom registration, and option schemas.
pub mod mode;
/// Dotenv tokenisation with exact byte spans.
pub mod parser;
/// Glob-based masking policy over keys and source basenames.
pub mod policy;
/// Cached fill strings for repeated-character masks.
pub mod pool;
/// Common re-exports for embedding hosts.
pub mod prelude;
/// Mask decoration records and overlay column mapping.
pub mod record;
/// Text utilities for line and char-boundary arithmetic.
pub mod text;

pub use cache::BufferCache;
pub use config::{Config, ConfigError};
pub use engine::{EditScope, IncrementalMasks, MaskEngine, MaskSet};
pub use error::{EncodingError, PolicyError, VeilError};
pub use fingerprint::Fingerprint;
pub use mode::{
    FULL_MODE, MaskContext, MaskMode, ModeDef, ModeInfo, ModeOptions, ModeRegistry, NONE_MODE, OptionKind,
    OptionSchema, OptionValue, PARTIAL_MODE, SchemaError,
};
pub use parser::{Entry, ParseOptions, ParseResult, QuoteType};
pub use policy::{PatternRule, PolicyResolver, PolicyTable};
pub use pool::MaskPool;
pub use record::{CachedMask, MaskRecord, OverlaySpan};

/// Default filename for veil configuration.
pub const CONFIG_FILENAME: &str = ".veil.toml";
