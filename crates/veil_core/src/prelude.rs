//! Convenience re-exports of the most commonly used types.

pub use crate::cache::BufferCache;
pub use crate::config::{Config, ConfigError};
pub use crate::engine::{EditScope, IncrementalMasks, MaskEngine, MaskSet};
pub use crate::error::{EncodingError, PolicyError, VeilError};
pub use crate::mode::{MaskContext, ModeDef, ModeOptions, ModeRegistry, OptionValue, SchemaError};
pub use crate::parser::{Entry, ParseOptions, ParseResult, QuoteType};
pub use crate::policy::{PatternRule, PolicyTable};
pub use crate::record::{CachedMask, MaskRecord, OverlaySpan};
