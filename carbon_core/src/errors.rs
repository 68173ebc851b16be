//! # Error Types
//!
//! Structured error types for carbon_core. Every variant carries enough
//! context for a caller (human, service layer or script) to see which input
//! was rejected and why.
//!
//! ## Example
//!
//! ```rust
//! use carbon_core::errors::{CarbonError, CarbonResult};
//!
//! fn validate_area(area_m2: f64) -> CarbonResult<()> {
//!     if area_m2 <= 0.0 {
//!         return Err(CarbonError::invalid_geometry(
//!             "ground_floor_area",
//!             area_m2.to_string(),
//!             "Ground floor area must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_area(0.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for carbon_core operations
pub type CarbonResult<T> = Result<T, CarbonError>;

/// Structured error type for carbon operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CarbonError {
    /// An input value is invalid (out of range, not finite, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Building geometry violates the envelope derivation preconditions
    #[error("Invalid geometry for '{field}': {value} - {reason}")]
    InvalidGeometry {
        field: String,
        value: String,
        reason: String,
    },

    /// A material was loaded without its phase indicator
    #[error("Material '{material}' has no phase indicator")]
    MissingIndicator { material: String },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Name already used by another entity of the same kind
    #[error("{entity} name '{name}' already exists")]
    DuplicateName { entity: String, name: String },

    /// Entity not found in the inventory
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Phase group name not recognized (strict name policy only)
    #[error("Unknown phase group: '{name}'")]
    UnknownPhase { name: String },

    /// Quantity kind not recognized (strict name policy only)
    #[error("Unknown unit kind: '{kind}'")]
    UnknownUnitKind { kind: String },

    /// Embodied carbon estimated before the envelope areas were derived
    #[error("Envelope areas not derived for building '{building}'")]
    EnvelopeNotDerived { building: String },

    /// A concurrent aggregation could not complete
    #[error("Aggregation failed: {reason}")]
    AggregationFailed { reason: String },

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

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl CarbonError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CarbonError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidGeometry error
    pub fn invalid_geometry(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CarbonError::InvalidGeometry {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingIndicator error
    pub fn missing_indicator(material: impl Into<String>) -> Self {
        CarbonError::MissingIndicator {
            material: material.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        CarbonError::MissingField {
            field: field.into(),
        }
    }

    /// Create a DuplicateName error
    pub fn duplicate_name(entity: impl Into<String>, name: impl Into<String>) -> Self {
        CarbonError::DuplicateName {
            entity: entity.into(),
            name: name.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        CarbonError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create an UnknownPhase error
    pub fn unknown_phase(name: impl Into<String>) -> Self {
        CarbonError::UnknownPhase { name: name.into() }
    }

    /// Create an UnknownUnitKind error
    pub fn unknown_unit_kind(kind: impl Into<String>) -> Self {
        CarbonError::UnknownUnitKind { kind: kind.into() }
    }

    /// Create an AggregationFailed error
    pub fn aggregation_failed(reason: impl Into<String>) -> Self {
        CarbonError::AggregationFailed {
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CarbonError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for precondition violations on building geometry
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, CarbonError::InvalidGeometry { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CarbonError::InvalidInput { .. } => "INVALID_INPUT",
            CarbonError::InvalidGeometry { .. } => "INVALID_GEOMETRY",
            CarbonError::MissingIndicator { .. } => "MISSING_INDICATOR",
            CarbonError::MissingField { .. } => "MISSING_FIELD",
            CarbonError::DuplicateName { .. } => "DUPLICATE_NAME",
            CarbonError::NotFound { .. } => "NOT_FOUND",
            CarbonError::UnknownPhase { .. } => "UNKNOWN_PHASE",
            CarbonError::UnknownUnitKind { .. } => "UNKNOWN_UNIT_KIND",
            CarbonError::EnvelopeNotDerived { .. } => "ENVELOPE_NOT_DERIVED",
            CarbonError::AggregationFailed { .. } => "AGGREGATION_FAILED",
            CarbonError::FileError { .. } => "FILE_ERROR",
            CarbonError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CarbonError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

impl From<serde_json::Error> for CarbonError {
    fn from(e: serde_json::Error) -> Self {
        CarbonError::SerializationError {
            reason: e.to_string(),
        }
    }
}
