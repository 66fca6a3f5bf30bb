//! # Error Types
//!
//! Structured error types for wall_core. Every fatal condition in the
//! evaluation pipeline maps onto one variant here, so callers (and anything
//! consuming the JSON form) can tell a bad configuration apart from an
//! envelope that is too coarse to evaluate.
//!
//! Recoverable substitutions are *not* errors; they are reported through
//! [`crate::calculations::Degeneracy`] alongside a valid result.
//!
//! ## Example
//!
//! ```rust
//! use wall_core::errors::{CalcError, CalcResult};
//!
//! fn validate_length(wall_length: f64) -> CalcResult<()> {
//!     if !(wall_length > 0.0) {
//!         return Err(CalcError::invalid_input(
//!             "wall_length",
//!             wall_length.to_string(),
//!             "Wall length must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for wall_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for evaluation operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// A configuration value is non-finite or outside its domain
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Not enough samples or envelope points to run the requested step
    #[error("Insufficient data for {what}: need at least {required}, got {actual}")]
    InsufficientData {
        what: String,
        required: usize,
        actual: usize,
    },

    /// The line method could not locate or use a load-fraction crossing
    #[error("Insufficient envelope resolution for load fraction {load_fraction}: {reason}")]
    InsufficientResolution { load_fraction: f64, reason: String },

    /// Calculation failed for a reason other than resolution
    #[error("Calculation failed: {calculation_type} - {reason}")]
    CalculationFailed {
        calculation_type: String,
        reason: String,
    },

    /// An envelope edit was refused; the envelope is unchanged
    #[error("Edit rejected: {operation} - {reason}")]
    EditRejected { operation: String, reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an InsufficientData error
    pub fn insufficient_data(what: impl Into<String>, required: usize, actual: usize) -> Self {
        CalcError::InsufficientData {
            what: what.into(),
            required,
            actual,
        }
    }

    /// Create an InsufficientResolution error
    pub fn insufficient_resolution(load_fraction: f64, reason: impl Into<String>) -> Self {
        CalcError::InsufficientResolution {
            load_fraction,
            reason: reason.into(),
        }
    }

    /// Create a CalculationFailed error
    pub fn calculation_failed(calculation_type: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::CalculationFailed {
            calculation_type: calculation_type.into(),
            reason: reason.into(),
        }
    }

    /// Create an EditRejected error
    pub fn edit_rejected(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::EditRejected {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        CalcError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            CalcError::InsufficientResolution { .. } => "INSUFFICIENT_RESOLUTION",
            CalcError::CalculationFailed { .. } => "CALCULATION_FAILED",
            CalcError::EditRejected { .. } => "EDIT_REJECTED",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::FileLocked { .. } => "FILE_LOCKED",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}
