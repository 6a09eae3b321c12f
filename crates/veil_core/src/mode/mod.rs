//! Mask modes: named strategies that turn an entry's value into the string
//! drawn over it.
//!
//! The three built-in modes (`full`, `partial`, `none`) are variants of one
//! tagged type; user-defined modes plug in through [`ModeDef`] registration
//! and receive the full entry context on every application.

mod options;
/// Registration and configuration of mask modes.
pub mod registry;

use std::fmt;
use std::sync::Arc;

pub use options::{ModeOptions, OptionKind, OptionSchema, OptionValue, SchemaError};
pub use registry::{ModeDef, ModeInfo, ModeRegistry};

use crate::parser::QuoteType;
use crate::pool::MaskPool;
use crate::text::{ceil_char_boundary, floor_char_boundary};

/// Name of the built-in mode that replaces the whole value.
pub const FULL_MODE: &str = "full";
/// Name of the built-in mode that keeps the value's ends visible.
pub const PARTIAL_MODE: &str = "partial";
/// Name of the built-in mode that leaves the value untouched.
pub const NONE_MODE: &str = "none";

/// Entry context handed to a mode's `apply`.
///
/// One context value is rebuilt per entry inside the generate loop; modes
/// must be pure with respect to it.
#[derive(Debug, Clone, Copy)]
pub struct MaskContext<'a> {
    /// The entry's key.
    pub key: &'a str,
    /// The entry's value, as written in the source.
    pub value: &'a str,
    /// Basename of the source file, empty when no source was given.
    pub source: &'a str,
    /// 1-indexed line the value starts on.
    pub line_number: usize,
    /// Quoting style of the value.
    pub quote_type: QuoteType,
    /// Whether the entry comes from a comment line.
    pub is_comment: bool,
    /// The applied mode's configured options.
    pub options: &'a ModeOptions,
}

/// Signature of a user-defined mode's apply function.
pub type ApplyFn = dyn Fn(&MaskContext<'_>) -> String + Send + Sync;

/// Options of the built-in `full` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullOptions {
    /// Character the mask is built from.
    pub mask_char: char,
    /// Match the mask length to the value's byte length.
    pub preserve_length: bool,
    /// Fixed mask length, overriding `preserve_length` when set.
    pub fixed_length: Option<usize>,
}

impl Default for FullOptions {
    fn default() -> Self {
        Self {
            mask_char: '*',
            preserve_length: true,
            fixed_length: None,
        }
    }
}

/// What `partial` falls back to when the value is too short to split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackMode {
    /// Mask the whole value.
    #[default]
    Full,
    /// Leave the value untouched.
    None,
}

/// Options of the built-in `partial` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialOptions {
    /// Character the masked middle is built from.
    pub mask_char: char,
    /// Bytes kept visible at the start of the value.
    pub show_start: usize,
    /// Bytes kept visible at the end of the value.
    pub show_end: usize,
    /// Minimum number of masked bytes required in the middle.
    pub min_mask: usize,
    /// Behaviour when the value is shorter than `show_start + show_end +
    /// min_mask`.
    pub fallback: FallbackMode,
}

impl Default for PartialOptions {
    fn default() -> Self {
        Self {
            mask_char: '*',
            show_start: 3,
            show_end: 3,
            min_mask: 3,
            fallback: FallbackMode::Full,
        }
    }
}

#[derive(Clone)]
pub(crate) struct CustomMode {
    pub apply: Arc<ApplyFn>,
}

#[derive(Clone)]
pub(crate) enum ModeKind {
    Full(FullOptions),
    Partial(PartialOptions),
    None,
    Custom(CustomMode),
}

impl fmt::Debug for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(o) => f.debug_tuple("Full").field(o).finish(),
            Self::Partial(o) => f.debug_tuple("Partial").field(o).finish(),
            Self::None => write!(f, "None"),
            Self::Custom(_) => f.debug_struct("Custom").finish_non_exhaustive(),
        }
    }
}

/// A mode instance bound to its configured options, ready to apply.
#[derive(Clone)]
pub struct MaskMode {
    name: Arc<str>,
    kind: ModeKind,
    options: Arc<ModeOptions>,
}

impl fmt::Debug for MaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskMode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl MaskMode {
    pub(crate) fn new(name: Arc<str>, kind: ModeKind, options: Arc<ModeOptions>) -> Self {
        Self { name, kind, options }
    }

    /// Returns the mode's registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the mode's configured options.
    #[must_use]
    pub fn options(&self) -> &ModeOptions {
        &self.options
    }

    /// The `full` mode with default options, used as the last-resort
    /// fallback when policy references only unknown names.
    pub(crate) fn fallback_full() -> Self {
        Self::new(
            Arc::from(FULL_MODE),
            ModeKind::Full(FullOptions::default()),
            Arc::new(ModeOptions::new()),
        )
    }

    /// Applies the mode to the context's value.
    ///
    /// Returns `None` when the mode leaves the value unchanged (the `none`
    /// mode, `partial` falling back to `none`, or a custom mode returning
    /// the identity string), in which case no record is emitted.
    pub(crate) fn apply(&self, ctx: &MaskContext<'_>, pool: &mut MaskPool) -> Option<Arc<str>> {
        match &self.kind {
            ModeKind::None => None,
            ModeKind::Full(opts) => Some(mask_full(ctx.value, opts, pool)),
            ModeKind::Partial(opts) => mask_partial(ctx.value, opts, pool),
            ModeKind::Custom(custom) => {
                let masked = (custom.apply)(ctx);
                if masked == ctx.value {
                    None
                } else {
                    Some(Arc::from(masked))
                }
            }
        }
    }
}

fn mask_full(value: &str, opts: &FullOptions, pool: &mut MaskPool) -> Arc<str> {
    if let Some(len) = opts.fixed_length {
        pool.fill(opts.mask_char, len)
    } else if opts.preserve_length {
        fill_byte_len(opts.mask_char, value.len(), pool)
    } else {
        pool.fill(opts.mask_char, 1)
    }
}

/// Builds the partial rendering: visible start, masked middle, visible end.
///
/// Counting is by byte length of the stored value. Show boundaries that
/// would split a multi-byte character are clamped outward into the masked
/// middle, so the visible ends never contain broken sequences; the middle
/// is a byte-exact fill, so the output always occupies the value's byte
/// length.
fn mask_partial(value: &str, opts: &PartialOptions, pool: &mut MaskPool) -> Option<Arc<str>> {
    let len = value.len();
    if len <= opts.show_start + opts.show_end + opts.min_mask {
        return match opts.fallback {
            FallbackMode::Full => Some(fill_byte_len(opts.mask_char, len, pool)),
            FallbackMode::None => None,
        };
    }

    let prefix_end = floor_char_boundary(value, opts.show_start);
    let suffix_start = ceil_char_boundary(value, len - opts.show_end);
    let middle = fill_byte_len(opts.mask_char, suffix_start - prefix_end, pool);

    let mut out = String::with_capacity(len);
    out.push_str(&value[..prefix_end]);
    out.push_str(&middle);
    out.push_str(&value[suffix_start..]);
    Some(Arc::from(out))
}

/// Pads byte-exact fills whose mask character does not tile the target
/// length.
const FILL_PAD: char = '*';

/// Builds a mask occupying exactly `byte_len` bytes.
///
/// Masks replace spans measured in bytes, so a multi-byte mask character
/// is repeated as often as it fits and any remaining bytes are padded with
/// `*`. ASCII mask characters go straight through the pool.
fn fill_byte_len(mask_char: char, byte_len: usize, pool: &mut MaskPool) -> Arc<str> {
    let char_len = mask_char.len_utf8();
    if char_len == 1 {
        return pool.fill(mask_char, byte_len);
    }

    let copies = byte_len / char_len;
    let padding = byte_len % char_len;
    if padding == 0 {
        return pool.fill(mask_char, copies);
    }

    let mut fill = String::with_capacity(byte_len);
    fill.extend(std::iter::repeat_n(mask_char, copies));
    fill.extend(std::iter::repeat_n(FILL_PAD, padding));
    Arc::from(fill)
}
