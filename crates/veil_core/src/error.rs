use thiserror::Error;

/// The input handed to `parse` or `generate` is not valid UTF-8.
///
/// This is the only hard failure in the engine: no entries or records are
/// produced, and the host should leave the buffer unmasked rather than show
/// partial coverage.
#[derive(Debug, Error)]
#[error("input is not valid UTF-8 (valid up to byte {valid_up_to})")]
pub struct EncodingError {
    /// Length of the longest valid UTF-8 prefix of the input.
    pub valid_up_to: usize,
    /// The underlying UTF-8 validation error.
    #[source]
    source: std::str::Utf8Error,
}

impl EncodingError {
    pub(crate) fn new(source: std::str::Utf8Error) -> Self {
        Self {
            valid_up_to: source.valid_up_to(),
            source,
        }
    }
}

/// Errors that can occur when compiling a policy table.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A key or source rule contains a glob that failed to compile.
    #[error("invalid glob in rule '{pattern}': {source}")]
    InvalidGlob {
        /// The glob text of the rule that failed.
        pattern: String,
        /// The underlying glob compilation error.
        #[source]
        source: globset::Error,
    },
}

/// Top-level error type for the veil masking pipeline.
///
/// Unifies errors from input validation, policy compilation, mode
/// configuration, and config-file loading into a single type for callers
/// that orchestrate the full workflow.
#[derive(Debug, Error)]
pub enum VeilError {
    /// The input text is not valid UTF-8.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// A policy rule failed to compile.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Mode options failed validation against the mode's schema.
    #[error(transparent)]
    Schema(#[from] crate::mode::SchemaError),

    /// A config file could not be read, parsed, or written.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}
