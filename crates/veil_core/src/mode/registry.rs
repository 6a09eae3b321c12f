//! The mode registry: name → configured mode instance.
//!
//! Built-in modes are installed at construction; custom modes are added via
//! [`ModeRegistry::register`]. Configuration is validated against the
//! mode's schema before it takes effect, so a rejected call leaves the
//! previous options untouched.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::options::{ModeOptions, OptionKind, OptionSchema, SchemaError};
use super::{
    ApplyFn, CustomMode, FallbackMode, FullOptions, MaskContext, MaskMode, ModeKind, PartialOptions, FULL_MODE,
    NONE_MODE, PARTIAL_MODE,
};

/// Definition of a user-provided mode, passed to [`ModeRegistry::register`].
pub struct ModeDef {
    apply: Arc<ApplyFn>,
    option_schema: Option<OptionSchema>,
    default_options: ModeOptions,
}

impl ModeDef {
    /// Creates a definition from the mode's apply function.
    pub fn new(apply: impl Fn(&MaskContext<'_>) -> String + Send + Sync + 'static) -> Self {
        Self {
            apply: Arc::new(apply),
            option_schema: None,
            default_options: ModeOptions::new(),
        }
    }

    /// Declares the option schema this mode validates against.
    #[must_use]
    pub fn with_schema(mut self, schema: OptionSchema) -> Self {
        self.option_schema = Some(schema);
        self
    }

    /// Sets the options the mode starts out with.
    #[must_use]
    pub fn with_defaults(mut self, options: ModeOptions) -> Self {
        self.default_options = options;
        self
    }
}

impl fmt::Debug for ModeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeDef")
            .field("has_schema", &self.option_schema.is_some())
            .field("default_options", &self.default_options)
            .finish_non_exhaustive()
    }
}

/// Descriptive summary of one registered mode.
#[derive(Debug, Clone)]
pub struct ModeInfo {
    /// The mode's registered name.
    pub name: Arc<str>,
    /// Whether this is one of the built-in modes.
    pub builtin: bool,
    /// Whether the mode declares an option schema.
    pub has_schema: bool,
    /// The currently configured options.
    pub options: ModeOptions,
}

struct RegisteredMode {
    mode: MaskMode,
    schema: Option<OptionSchema>,
    builtin: bool,
}

/// Collection of mask modes keyed by name.
pub struct ModeRegistry {
    modes: HashMap<Arc<str>, RegisteredMode>,
}

impl fmt::Debug for ModeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeRegistry")
            .field("modes", &self.modes.len())
            .finish_non_exhaustive()
    }
}

impl ModeRegistry {
    /// Creates a registry with the three built-in modes installed with
    /// their default options.
    #[must_use]
    pub fn builtin() -> Self {
        let mut modes = HashMap::new();

        for name in [FULL_MODE, PARTIAL_MODE, NONE_MODE] {
            let name: Arc<str> = Arc::from(name);
            // The default option map is empty and always satisfies the
            // schema, so this cannot fail.
            let kind = builtin_kind(&name, &ModeOptions::new()).unwrap_or(ModeKind::None);
            modes.insert(
                Arc::clone(&name),
                RegisteredMode {
                    mode: MaskMode::new(Arc::clone(&name), kind, Arc::new(ModeOptions::new())),
                    schema: Some(builtin_schema(&name)),
                    builtin: true,
                },
            );
        }

        Self { modes }
    }

    /// Registers a custom mode under `name`, replacing any existing mode
    /// with that name.
    ///
    /// The definition's default options are validated against its schema.
    pub fn register(&mut self, name: &str, def: ModeDef) -> Result<(), SchemaError> {
        if let Some(schema) = &def.option_schema {
            schema.validate(name, &def.default_options)?;
        }

        let name: Arc<str> = Arc::from(name);
        let options = Arc::new(def.default_options);
        let mode = MaskMode::new(
            Arc::clone(&name),
            ModeKind::Custom(CustomMode { apply: def.apply }),
            options,
        );

        self.modes.insert(
            name,
            RegisteredMode {
                mode,
                schema: def.option_schema,
                builtin: false,
            },
        );
        Ok(())
    }

    /// Merges `options` into the named mode's configuration.
    ///
    /// Options are validated against the mode's schema first; on error the
    /// previous configuration is retained.
    pub fn configure(&mut self, name: &str, options: ModeOptions) -> Result<(), SchemaError> {
        let Some(registered) = self.modes.get(name) else {
            return Err(SchemaError::UnknownMode { mode: name.to_string() });
        };

        if let Some(schema) = &registered.schema {
            schema.validate(name, &options)?;
        }

        let mut merged = registered.mode.options().clone();
        merged.extend(options);
        let mode = rebuild(&registered.mode, registered.builtin, merged)?;

        // Validation passed: now it is safe to replace the instance.
        if let Some(registered) = self.modes.get_mut(name) {
            registered.mode = mode;
        }
        Ok(())
    }

    /// Builds a one-off instance of the named mode with `overrides` merged
    /// over its current configuration. The registered mode is unchanged.
    pub fn create(&self, name: &str, overrides: ModeOptions) -> Result<MaskMode, SchemaError> {
        let Some(registered) = self.modes.get(name) else {
            return Err(SchemaError::UnknownMode { mode: name.to_string() });
        };

        if let Some(schema) = &registered.schema {
            schema.validate(name, &overrides)?;
        }

        let mut merged = registered.mode.options().clone();
        merged.extend(overrides);
        rebuild(&registered.mode, registered.builtin, merged)
    }

    /// Returns the configured instance of the named mode.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MaskMode> {
        self.modes.get(name).map(|r| &r.mode)
    }

    /// Returns all registered mode names, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self.modes.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Returns a summary of the named mode.
    #[must_use]
    pub fn info(&self, name: &str) -> Option<ModeInfo> {
        self.modes.get(name).map(|r| ModeInfo {
            name: Arc::clone(&r.mode.name),
            builtin: r.builtin,
            has_schema: r.schema.is_some(),
            options: r.mode.options().clone(),
        })
    }

    /// Returns the number of registered modes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    /// Returns `true` if no modes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Rebuilds a mode instance against a merged option map.
fn rebuild(current: &MaskMode, builtin: bool, merged: ModeOptions) -> Result<MaskMode, SchemaError> {
    let name = Arc::clone(&current.name);
    let kind = if builtin {
        builtin_kind(&name, &merged)?
    } else {
        current.kind.clone()
    };
    Ok(MaskMode::new(name, kind, Arc::new(merged)))
}

fn builtin_schema(name: &str) -> OptionSchema {
    match name {
        FULL_MODE => OptionSchema::new()
            .field("mask_char", OptionKind::Char)
            .field("preserve_length", OptionKind::Bool)
            .field("fixed_length", OptionKind::Int),
        PARTIAL_MODE => OptionSchema::new()
            .field("mask_char", OptionKind::Char)
            .field("show_start", OptionKind::Int)
            .field("show_end", OptionKind::Int)
            .field("min_mask", OptionKind::Int)
            .field("fallback_mode", OptionKind::Str),
        // `none` takes no options at all.
        _ => OptionSchema::new(),
    }
}

fn builtin_kind(name: &str, options: &ModeOptions) -> Result<ModeKind, SchemaError> {
    match name {
        FULL_MODE => Ok(ModeKind::Full(parse_full_options(options)?)),
        PARTIAL_MODE => Ok(ModeKind::Partial(parse_partial_options(options)?)),
        _ => Ok(ModeKind::None),
    }
}

fn parse_full_options(options: &ModeOptions) -> Result<FullOptions, SchemaError> {
    let mut parsed = FullOptions::default();

    if let Some(value) = options.get("mask_char") {
        parsed.mask_char = value.as_char().unwrap_or(parsed.mask_char);
    }
    if let Some(value) = options.get("preserve_length") {
        parsed.preserve_length = value.as_bool().unwrap_or(parsed.preserve_length);
    }
    if let Some(value) = options.get("fixed_length") {
        let len = non_negative(FULL_MODE, "fixed_length", value.as_int())?;
        // A zero fixed length clears the override and falls back to
        // `preserve_length`, matching the wire convention of the upstream
        // masker where 0 means "use the value length".
        parsed.fixed_length = (len > 0).then_some(len);
    }

    Ok(parsed)
}

fn parse_partial_options(options: &ModeOptions) -> Result<PartialOptions, SchemaError> {
    let mut parsed = PartialOptions::default();

    if let Some(value) = options.get("mask_char") {
        parsed.mask_char = value.as_char().unwrap_or(parsed.mask_char);
    }
    if let Some(value) = options.get("show_start") {
        parsed.show_start = non_negative(PARTIAL_MODE, "show_start", value.as_int())?;
    }
    if let Some(value) = options.get("show_end") {
        parsed.show_end = non_negative(PARTIAL_MODE, "show_end", value.as_int())?;
    }
    if let Some(value) = options.get("min_mask") {
        let min_mask = non_negative(PARTIAL_MODE, "min_mask", value.as_int())?;
        if min_mask < 1 {
            return Err(SchemaError::InvalidValue {
                mode: PARTIAL_MODE.to_string(),
                option: "min_mask".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        parsed.min_mask = min_mask;
    }
    if let Some(value) = options.get("fallback_mode") {
        parsed.fallback = match value.as_str() {
            Some(FULL_MODE) => FallbackMode::Full,
            Some(NONE_MODE) => FallbackMode::None,
            _ => {
                return Err(SchemaError::InvalidValue {
                    mode: PARTIAL_MODE.to_string(),
                    option: "fallback_mode".to_string(),
                    reason: "must be 'full' or 'none'".to_string(),
                });
            }
        };
    }

    Ok(parsed)
}

fn non_negative(mode: &str, option: &str, value: Option<i64>) -> Result<usize, SchemaError> {
    value
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| SchemaError::InvalidValue {
            mode: mode.to_string(),
            option: option.to_string(),
            reason: "must be non-negative".to_string(),
        })
}
