//! # Error Types
//!
//! Structured error types for damage_core. Every failure carries enough
//! context to tell the caller which input, table or file needs fixing.
//!
//! ## Example
//!
//! ```rust
//! use damage_core::errors::{DamageError, DamageResult};
//!
//! fn validate_length(length_m: f64) -> DamageResult<()> {
//!     if length_m < 0.0 {
//!         return Err(DamageError::invalid_input(
//!             "length",
//!             length_m.to_string(),
//!             "Segment length cannot be negative",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for damage_core operations
pub type DamageResult<T> = Result<T, DamageError>;

/// Structured error type for damage and risk operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum DamageError {
    /// An input value is invalid (out of range, wrong type, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A column or attribute required by a computation stage is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A curve or max damage table is malformed
    #[error("Format error in {source_name}: {reason}")]
    Format { source_name: String, reason: String },

    /// Zero or several files matched where exactly one was expected
    #[error("Expected exactly one file matching '{pattern}' in '{folder}', found {found}")]
    FileSearch {
        folder: String,
        pattern: String,
        found: usize,
    },

    /// Lookup into a reference table with an unknown key
    #[error("Unknown key '{key}' in {table}")]
    UnknownKey { table: String, key: String },

    /// A precondition of a pipeline stage does not hold
    #[error("Precondition failed: {reason}")]
    Precondition { reason: String },

    /// Manual damage computation requested without any damage function
    #[error("No manual damage functions were loaded")]
    EmptyDamageFunctionSet,

    /// Selector outside a closed enumeration
    #[error("Not implemented: {selector} '{value}'")]
    NotImplemented { selector: String, value: String },

    /// Risk cutoff year outside the range supported by the chosen mode
    #[error(
        "Cannot calculate risk in '{mode}' mode with year {year}: {reason}. Use {alternatives} instead."
    )]
    RiskBoundary {
        mode: String,
        year: u32,
        reason: String,
        alternatives: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DamageError {
    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DamageError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        DamageError::MissingField {
            field: field.into(),
        }
    }

    /// Create a Format error
    pub fn format(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        DamageError::Format {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnknownKey error
    pub fn unknown_key(table: impl Into<String>, key: impl Into<String>) -> Self {
        DamageError::UnknownKey {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Create a Precondition error
    pub fn precondition(reason: impl Into<String>) -> Self {
        DamageError::Precondition {
            reason: reason.into(),
        }
    }

    /// Create a NotImplemented error
    pub fn not_implemented(selector: impl Into<String>, value: impl Into<String>) -> Self {
        DamageError::NotImplemented {
            selector: selector.into(),
            value: value.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DamageError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the shape of the input data rather than by
    /// the caller's choice of mode or selector
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            DamageError::InvalidInput { .. }
                | DamageError::MissingField { .. }
                | DamageError::Format { .. }
                | DamageError::Precondition { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            DamageError::InvalidInput { .. } => "INVALID_INPUT",
            DamageError::MissingField { .. } => "MISSING_FIELD",
            DamageError::Format { .. } => "FORMAT_ERROR",
            DamageError::FileSearch { .. } => "FILE_SEARCH",
            DamageError::UnknownKey { .. } => "UNKNOWN_KEY",
            DamageError::Precondition { .. } => "PRECONDITION_FAILED",
            DamageError::EmptyDamageFunctionSet => "EMPTY_DAMAGE_FUNCTION_SET",
            DamageError::NotImplemented { .. } => "NOT_IMPLEMENTED",
            DamageError::RiskBoundary { .. } => "RISK_BOUNDARY",
            DamageError::FileError { .. } => "FILE_ERROR",
            DamageError::SerializationError { .. } => "SERIALIZATION_ERROR",
            DamageError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = DamageError::unknown_key("lane correction factors", "motorway/9");
        let json = serde_json::to_string(&error).unwrap();
        let roundtrip: DamageError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(DamageError::missing_field("lanes").error_code(), "MISSING_FIELD");
        assert_eq!(
            DamageError::not_implemented("damage curve", "XYZ").error_code(),
            "NOT_IMPLEMENTED"
        );
        assert_eq!(DamageError::EmptyDamageFunctionSet.error_code(), "EMPTY_DAMAGE_FUNCTION_SET");
    }

    #[test]
    fn test_risk_boundary_message_names_year_and_alternatives() {
        let error = DamageError::RiskBoundary {
            mode: "cut_from_year".to_string(),
            year: 5,
            reason: "cutoff <= smallest available return period (10)".to_string(),
            alternatives: "'default' or 'triangle_to_null_year' mode".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("year 5"));
        assert!(message.contains("triangle_to_null_year"));
    }

    #[test]
    fn test_data_error_classification() {
        assert!(DamageError::precondition("no events").is_data_error());
        assert!(!DamageError::not_implemented("risk mode", "x").is_data_error());
    }
}
