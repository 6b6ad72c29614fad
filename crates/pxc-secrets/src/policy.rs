//! Password generation policy.
//!
//! Turns the raw `generatedSecretsOptions` of a cluster specification into
//! a validated [`GenerationPolicy`]. Validation happens before anything is
//! generated or written, so a bad policy never leaves partial state behind.

use pxc_types::{bail, GeneratedSecretsOptions, Result};

/// Default minimum password length.
pub const DEFAULT_MIN_LENGTH: usize = 16;

/// Default maximum password length.
pub const DEFAULT_MAX_LENGTH: usize = 20;

/// Symbols used when the cluster manifest does not mention `symbols` at all.
pub const DEFAULT_SYMBOLS: &str = "!#$%&()*+,-.<=>?@[]^_{}~";

/// Upper bound on `maxLength`, keeping generation cost sane.
pub const MAX_LENGTH_LIMIT: usize = 1024;

/// Validated password generation constraints.
///
/// Invariant: `1 <= min_length <= max_length <= MAX_LENGTH_LIMIT`, and
/// `symbols` holds distinct ASCII punctuation characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPolicy {
    symbols: Vec<char>,
    min_length: usize,
    max_length: usize,
}

impl GenerationPolicy {
    /// Build a policy, enforcing the invariant.
    pub fn new(symbols: &str, min_length: usize, max_length: usize) -> Result<Self> {
        if min_length < 1 {
            bail!(Policy, "minLength must be at least 1, got {}", min_length);
        }
        if max_length < min_length {
            bail!(
                Policy,
                "maxLength ({}) must not be smaller than minLength ({})",
                max_length,
                min_length
            );
        }
        if max_length > MAX_LENGTH_LIMIT {
            bail!(Policy, "maxLength ({}) exceeds the limit of {}", max_length, MAX_LENGTH_LIMIT);
        }

        let mut distinct: Vec<char> = Vec::with_capacity(symbols.len());
        for c in symbols.chars() {
            if !c.is_ascii_punctuation() {
                bail!(
                    Policy,
                    "symbols may only contain ASCII punctuation, found {:?}",
                    c
                );
            }
            if !distinct.contains(&c) {
                distinct.push(c);
            }
        }

        Ok(Self {
            symbols: distinct,
            min_length,
            max_length,
        })
    }

    /// Allowed punctuation; empty means letters and digits only.
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    /// Minimum password length.
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Maximum password length (inclusive).
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Whether `c` may appear in a password generated under this policy.
    pub fn allows(&self, c: char) -> bool {
        c.is_ascii_alphanumeric() || self.symbols.contains(&c)
    }
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.chars().collect(),
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

/// Normalizes raw generation options.
pub struct PasswordPolicy;

impl PasswordPolicy {
    /// Validate and default the raw options from a cluster specification.
    ///
    /// Absent options yield the built-in defaults. Within present options an
    /// unset `minLength` becomes `min(16, maxLength)` and an unset
    /// `maxLength` becomes `max(20, minLength)`, so supplying only one bound
    /// never trips the ordering check by itself. An empty `symbols` string
    /// is kept as "no symbols"; only an unset one selects the defaults.
    pub fn normalize(raw: Option<&GeneratedSecretsOptions>) -> Result<GenerationPolicy> {
        let Some(raw) = raw else {
            return Ok(GenerationPolicy::default());
        };

        let min_length = raw.min_length.map(Self::length("minLength")).transpose()?;
        let max_length = raw.max_length.map(Self::length("maxLength")).transpose()?;

        let (min_length, max_length) = match (min_length, max_length) {
            (Some(min), Some(max)) => (min, max),
            (Some(min), None) => (min, DEFAULT_MAX_LENGTH.max(min)),
            (None, Some(max)) => (DEFAULT_MIN_LENGTH.min(max), max),
            (None, None) => (DEFAULT_MIN_LENGTH, DEFAULT_MAX_LENGTH),
        };

        let symbols = raw.symbols.as_deref().unwrap_or(DEFAULT_SYMBOLS);

        GenerationPolicy::new(symbols, min_length, max_length)
    }

    fn length(field: &'static str) -> impl Fn(i64) -> Result<usize> {
        move |value| {
            if value < 1 {
                bail!(Policy, "{} must be at least 1, got {}", field, value);
            }
            usize::try_from(value)
                .map_err(|_| pxc_types::PxcError::Policy(format!("{} is out of range: {}", field, value)))
        }
    }
}
