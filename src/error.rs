//! Error types for Sugerir operations.
//!
//! Provides rich error context for library consumers.

use std::fmt;

/// Main error type for Sugerir operations.
///
/// Covers structural failures (training on empty data, corrupt persisted
/// models, invalid hyperparameters). Per-query sparsity is deliberately
/// *not* represented here: `get_rating` and `get_suggestions` resolve
/// cold-start conditions through documented fallback values instead.
///
/// # Examples
///
/// ```
/// use sugerir::error::SugerirError;
///
/// let err = SugerirError::InsufficientData {
///     context: "training store is empty".to_string(),
/// };
/// assert!(err.to_string().contains("Insufficient data"));
/// ```
#[derive(Debug)]
pub enum SugerirError {
    /// Not enough data to perform the operation (empty training or testing store).
    InsufficientData {
        /// What was being attempted
        context: String,
    },

    /// Persisted model state is structurally invalid.
    CorruptModel {
        /// Error description
        message: String,
    },

    /// Persisted model was written by a newer format version.
    UnsupportedVersion {
        /// Version found
        found: (u8, u8),
        /// Maximum supported version
        supported: (u8, u8),
    },

    /// Checksum verification failed on a persisted model.
    ChecksumMismatch {
        /// Expected checksum
        expected: u32,
        /// Actual checksum
        actual: u32,
    },

    /// Identifier outside the configured validity range.
    InvalidIdentifier {
        /// Offending identifier
        id: u32,
        /// Inclusive upper bound of the valid range (lower bound is 1)
        max: u32,
    },

    /// Invalid hyperparameter value provided.
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Training diverged instead of converging.
    ConvergenceFailure {
        /// Epochs completed before the failure was detected
        iterations: usize,
        /// Loss at the point of failure
        final_loss: f32,
    },

    /// I/O error (file not found, permission denied, etc.).
    Io(std::io::Error),

    /// Serialization/deserialization error.
    Serialization(String),
}

impl fmt::Display for SugerirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SugerirError::InsufficientData { context } => {
                write!(f, "Insufficient data: {context}")
            }
            SugerirError::CorruptModel { message } => {
                write!(f, "Corrupt model: {message}")
            }
            SugerirError::UnsupportedVersion { found, supported } => {
                write!(
                    f,
                    "Unsupported format version: found {}.{}, max supported {}.{}",
                    found.0, found.1, supported.0, supported.1
                )
            }
            SugerirError::ChecksumMismatch { expected, actual } => {
                write!(
                    f,
                    "Checksum mismatch: expected 0x{expected:08X}, got 0x{actual:08X}"
                )
            }
            SugerirError::InvalidIdentifier { id, max } => {
                write!(f, "Invalid identifier: {id} outside valid range 1..={max}")
            }
            SugerirError::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid hyperparameter: {param} = {value}, expected {constraint}"
                )
            }
            SugerirError::ConvergenceFailure {
                iterations,
                final_loss,
            } => {
                write!(
                    f,
                    "Convergence failure: loss {final_loss} after {iterations} epochs"
                )
            }
            SugerirError::Io(e) => write!(f, "I/O error: {e}"),
            SugerirError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl std::error::Error for SugerirError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SugerirError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SugerirError {
    fn from(err: std::io::Error) -> Self {
        SugerirError::Io(err)
    }
}

impl From<serde_json::Error> for SugerirError {
    fn from(err: serde_json::Error) -> Self {
        SugerirError::Serialization(err.to_string())
    }
}

impl SugerirError {
    /// Create an insufficient-data error with descriptive context
    #[must_use]
    pub fn insufficient_data(context: &str) -> Self {
        Self::InsufficientData {
            context: context.to_string(),
        }
    }

    /// Create a corrupt-model error with descriptive context
    #[must_use]
    pub fn corrupt_model(message: &str) -> Self {
        Self::CorruptModel {
            message: message.to_string(),
        }
    }

    /// Create an invalid-hyperparameter error
    #[must_use]
    pub fn invalid_hyperparameter(param: &str, value: impl fmt::Display, constraint: &str) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, SugerirError>;
