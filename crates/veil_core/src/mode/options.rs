//! Option values and schemas for mask modes.
//!
//! Every mode carries a key-value option map. Built-in modes declare a
//! schema so that `configure_mode` can reject bad options up front instead
//! of failing in the masking hot path; custom modes may declare one too.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Option map for one mode, as configured by the host.
pub type ModeOptions = BTreeMap<String, OptionValue>;

/// A single mode option value.
///
/// Characters are represented as one-character strings so the TOML config
/// surface stays natural (`mask_char = "*"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer count or length.
    Int(i64),
    /// String (including one-character strings used as characters).
    Str(String),
}

impl OptionValue {
    /// Returns the boolean value, if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the string value, if this is a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a character, if this is a one-character string.
    #[must_use]
    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Str(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Str(_) => "string",
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<char> for OptionValue {
    fn from(value: char) -> Self {
        Self::Str(value.to_string())
    }
}

/// Expected type of a declared option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// `true` / `false`.
    Bool,
    /// Whole number.
    Int,
    /// Arbitrary string.
    Str,
    /// Exactly one character, written as a one-character string.
    Char,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "boolean"),
            Self::Int => write!(f, "integer"),
            Self::Str => write!(f, "string"),
            Self::Char => write!(f, "character"),
        }
    }
}

#[derive(Debug, Clone)]
struct OptionField {
    name: Box<str>,
    kind: OptionKind,
    required: bool,
}

/// Declared option set for a mode.
///
/// Validation rejects unknown option names, type mismatches, and missing
/// required options. An empty schema accepts no options at all.
#[derive(Debug, Clone, Default)]
pub struct OptionSchema {
    fields: Vec<OptionField>,
}

impl OptionSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an optional field.
    #[must_use]
    pub fn field(mut self, name: &str, kind: OptionKind) -> Self {
        self.fields.push(OptionField {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    /// Declares a required field.
    #[must_use]
    pub fn required(mut self, name: &str, kind: OptionKind) -> Self {
        self.fields.push(OptionField {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    /// Validates `options` for the mode named `mode`.
    pub fn validate(&self, mode: &str, options: &ModeOptions) -> Result<(), SchemaError> {
        for (name, value) in options {
            let Some(field) = self.fields.iter().find(|f| f.name.as_ref() == name.as_str()) else {
                return Err(SchemaError::UnknownOption {
                    mode: mode.to_string(),
                    option: name.clone(),
                });
            };

            let matches = match field.kind {
                OptionKind::Bool => value.as_bool().is_some(),
                OptionKind::Int => value.as_int().is_some(),
                OptionKind::Str => value.as_str().is_some(),
                OptionKind::Char => value.as_char().is_some(),
            };

            if !matches {
                return Err(SchemaError::TypeMismatch {
                    mode: mode.to_string(),
                    option: name.clone(),
                    expected: field.kind,
                    actual: value.type_name(),
                });
            }
        }

        for field in self.fields.iter().filter(|f| f.required) {
            if !options.contains_key(field.name.as_ref()) {
                return Err(SchemaError::MissingOption {
                    mode: mode.to_string(),
                    option: field.name.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Errors raised while registering or configuring a mode.
///
/// A rejected configuration never alters the mode: the previous options
/// stay in effect.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The named mode is not registered.
    #[error("mode '{mode}' is not registered")]
    UnknownMode {
        /// The mode name that was looked up.
        mode: String,
    },

    /// An option name is not declared by the mode's schema.
    #[error("mode '{mode}' has no option '{option}'")]
    UnknownOption {
        /// The mode being configured.
        mode: String,
        /// The unrecognised option name.
        option: String,
    },

    /// An option value has the wrong type.
    #[error("option '{option}' of mode '{mode}' expects {expected}, got {actual}")]
    TypeMismatch {
        /// The mode being configured.
        mode: String,
        /// The offending option name.
        option: String,
        /// The type declared in the schema.
        expected: OptionKind,
        /// The type of the supplied value.
        actual: &'static str,
    },

    /// A required option is absent.
    #[error("mode '{mode}' requires option '{option}'")]
    MissingOption {
        /// The mode being configured.
        mode: String,
        /// The missing option name.
        option: String,
    },

    /// An option value is the right type but out of range.
    #[error("option '{option}' of mode '{mode}' {reason}")]
    InvalidValue {
        /// The mode being configured.
        mode: String,
        /// The offending option name.
        option: String,
        /// What the value must satisfy.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> OptionSchema {
        OptionSchema::new()
            .field("mask_char", OptionKind::Char)
            .field("preserve_length", OptionKind::Bool)
            .field("fixed_length", OptionKind::Int)
    }

    fn options(pairs: &[(&str, OptionValue)]) -> ModeOptions {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn empty_options_validate_against_any_schema() {
        schema().validate("full", &ModeOptions::new()).unwrap();
    }

    #[test]
    fn known_options_with_correct_types_validate() {
        let opts = options(&[
            ("mask_char", OptionValue::from('#')),
            ("preserve_length", OptionValue::from(false)),
            ("fixed_length", OptionValue::from(8i64)),
        ]);
        schema().validate("full", &opts).unwrap();
    }

    #[test]
    fn unknown_option_is_rejected() {
        let opts = options(&[("no_such_option", OptionValue::from(true))]);
        let err = schema().validate("full", &opts).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownOption { .. }));
        assert!(err.to_string().contains("no_such_option"));
    }

    #[test]
    fn type_mismatch_is_rejected_with_both_types_named() {
        let opts = options(&[("preserve_length", OptionValue::from("yes"))]);
        let err = schema().validate("full", &opts).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("boolean"));
        assert!(message.contains("string"));
    }

    #[test]
    fn char_fields_reject_multi_character_strings() {
        let opts = options(&[("mask_char", OptionValue::from("**"))]);
        let err = schema().validate("full", &opts).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn char_fields_accept_multibyte_characters() {
        let opts = options(&[("mask_char", OptionValue::from('•'))]);
        schema().validate("full", &opts).unwrap();
    }

    #[test]
    fn missing_required_option_is_rejected() {
        let schema = OptionSchema::new().required("label", OptionKind::Str);
        let err = schema.validate("custom", &ModeOptions::new()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingOption { .. }));
    }

    #[test]
    fn empty_schema_rejects_every_option() {
        let schema = OptionSchema::new();
        let opts = options(&[("anything", OptionValue::from(1i64))]);
        assert!(schema.validate("none", &opts).is_err());
    }

    #[test]
    fn option_value_accessors_match_variants() {
        assert_eq!(OptionValue::from(true).as_bool(), Some(true));
        assert_eq!(OptionValue::from(7i64).as_int(), Some(7));
        assert_eq!(OptionValue::from("abc").as_str(), Some("abc"));
        assert_eq!(OptionValue::from('*').as_char(), Some('*'));
        assert_eq!(OptionValue::from("ab").as_char(), None);
        assert_eq!(OptionValue::from(1i64).as_bool(), None);
    }
}
