//! Host configuration loaded from `.veil.toml`.
//!
//! The file carries everything an editor integration needs to hand to
//! [`crate::MaskEngine::with_config`]: the policy table, per-mode option
//! tables, and comment handling. All fields are optional and default to
//! masking everything with `full`.
//!
//! ```toml
//! skip_comments = true
//! default_mode = "full"
//!
//! [[patterns]]
//! glob = "*_TOKEN"
//! mode = "partial"
//!
//! [[sources]]
//! glob = ".env.example"
//! mode = "none"
//!
//! [modes.partial]
//! show_start = 2
//! show_end = 2
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::mode::{FULL_MODE, ModeOptions};
use crate::policy::{PatternRule, PolicyTable};

/// Configuration for the masking engine, loaded from `.veil.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Leave `#KEY=VALUE` entries unmasked.
    #[serde(default)]
    pub skip_comments: bool,

    /// Mode applied when no pattern or source rule matches.
    #[serde(default = "default_mode_name")]
    pub default_mode: String,

    /// Key rules, evaluated against entry keys in specificity order.
    #[serde(default)]
    pub patterns: Vec<PatternRule>,

    /// Source rules, evaluated against the source file's basename.
    #[serde(default)]
    pub sources: Vec<PatternRule>,

    /// Option tables applied to modes by name on engine construction.
    #[serde(default)]
    pub modes: BTreeMap<String, ModeOptions>,
}

fn default_mode_name() -> String {
    FULL_MODE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            skip_comments: false,
            default_mode: default_mode_name(),
            patterns: Vec::new(),
            sources: Vec::new(),
            modes: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Reads the configuration at `path`.
    ///
    /// A missing file is not an error: masking should work out of the box,
    /// so the defaults are returned instead.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&text).map_err(|source| ConfigError::Invalid {
            origin: path.display().to_string(),
            source,
        })
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Invalid {
            origin: "inline TOML".to_string(),
            source,
        })
    }

    /// Renders this configuration and replaces the file at `path` with it.
    ///
    /// The rendered text is staged to a temporary file in the target
    /// directory and swapped into place, so a concurrent reader sees the
    /// old file or the new one, never a torn write.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let rendered = self.to_toml()?;
        stage_and_swap(path, &rendered).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Renders this configuration as pretty-printed TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|source| ConfigError::Render { source })
    }

    /// Extracts the policy table for [`crate::MaskEngine::set_policy`].
    #[must_use]
    pub fn policy(&self) -> PolicyTable {
        PolicyTable {
            patterns: self.patterns.clone(),
            sources: self.sources.clone(),
            default_mode: self.default_mode.clone(),
        }
    }
}

/// Writes `text` to a temporary file beside `path`, syncs it, and renames
/// it over the target. The rename is the commit point.
fn stage_and_swap(path: &Path, text: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(text.as_bytes())?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|failed| failed.error)?;
    Ok(())
}

/// Errors from loading or persisting a `.veil.toml` file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but reading it failed.
    #[error("cannot read '{path}': {source}")]
    Read {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The TOML text does not describe a veil configuration.
    #[error("invalid configuration ({origin}): {source}")]
    Invalid {
        /// Where the text came from: a file path, or `inline TOML`.
        origin: String,
        /// The underlying TOML deserialisation failure.
        #[source]
        source: toml::de::Error,
    },

    /// The configuration could not be rendered as TOML.
    #[error("configuration is not representable as TOML: {source}")]
    Render {
        /// The underlying TOML serialisation failure.
        #[source]
        source: toml::ser::Error,
    },

    /// Staging or swapping the rendered file failed.
    #[error("cannot write '{path}': {source}")]
    Write {
        /// The destination file.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}
