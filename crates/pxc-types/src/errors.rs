//! Error types for credential controller operations.

use thiserror::Error;

/// The main error type for credential controller operations.
///
/// Policy errors need a manifest fix. Store conflicts are retried
/// internally; unavailability waits for the next reconcile trigger.
/// Randomness failures are fatal.
#[derive(Error, Debug)]
pub enum PxcError {
    /// Invalid password generation policy
    #[error("Policy error: {0}")]
    Policy(String),

    /// A single optimistic-concurrency check failed in the backend
    #[error("Store conflict: {0}")]
    Conflict(String),

    /// Optimistic-concurrency retries were exhausted
    #[error("Store conflict on {secret}: gave up after {attempts} attempts")]
    StoreConflict {
        /// Secret object that kept conflicting
        secret: String,
        /// Number of fetch-merge-write attempts made
        attempts: u32,
    },

    /// The persistence backend is unreachable or failing
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A secret object or credential key does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The secure randomness source failed
    #[error("Randomness source failure: {0}")]
    Randomness(String),

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl PxcError {
    /// Whether a later attempt may succeed without any change to the
    /// cluster specification.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PxcError::Conflict(_) | PxcError::StoreConflict { .. } | PxcError::StoreUnavailable(_)
        )
    }

    /// Whether this is a single check-and-set mismatch.
    pub fn is_conflict(&self) -> bool {
        matches!(self, PxcError::Conflict(_))
    }

    /// Whether the error indicates an environment failure that must not
    /// be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PxcError::Randomness(_))
    }
}

/// A specialized Result type for credential controller operations.
pub type Result<T> = std::result::Result<T, PxcError>;

/// Helper macro to bail out with a PxcError
///
/// This is used for expected error conditions.
///
/// # Example
///
/// ```ignore
/// if min_length < 1 {
///     bail!(Policy, "minLength must be at least 1, got {}", min_length);
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($variant:ident, $msg:expr) => {
        return Err($crate::PxcError::$variant($msg.to_string()))
    };
    ($variant:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::PxcError::$variant(format!($fmt, $($arg)*)))
    };
}
