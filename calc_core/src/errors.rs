//! # Error Types
//!
//! Structured error types for calc_core. Per-edit problems (bad input text,
//! out-of-domain results, zero divisors, conflicting user values) are
//! recovered locally by the calculator and surfaced as messages in
//! [`UiState`](crate::calculator::UiState). Only configuration problems
//! (unknown units, dangling variable ids) escape as `Err`, and only from
//! [`create_calculator`](crate::calculator::create_calculator).
//!
//! ## Example
//!
//! ```rust
//! use calc_core::errors::{CalcError, CalcResult, DomainErrorKind};
//!
//! fn validate_volume(volume_l: f64) -> CalcResult<()> {
//!     if volume_l <= 0.0 {
//!         return Err(CalcError::domain(
//!             "v1",
//!             DomainErrorKind::NonPositive,
//!             "Volume must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert_eq!(validate_volume(-1.0).unwrap_err().error_code(), "DOMAIN_ERROR");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for calc_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Which declared constraint a value violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainErrorKind {
    /// Value must be strictly greater than zero
    NonPositive,
    /// Value must not be below zero
    Negative,
    /// Value lies outside a closed range such as [0, 1]
    OutOfRange,
    /// A ratio reached or passed its upper bound (e.g. margin >= 100 %)
    RatioExceeded,
    /// Two related quantities are in the wrong order (e.g. A < Z)
    OrderingViolated,
}

impl fmt::Display for DomainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DomainErrorKind::NonPositive => "NonPositive",
            DomainErrorKind::Negative => "Negative",
            DomainErrorKind::OutOfRange => "OutOfRange",
            DomainErrorKind::RatioExceeded => "RatioExceeded",
            DomainErrorKind::OrderingViolated => "OrderingViolated",
        };
        f.write_str(name)
    }
}

/// Mathematical singularities a closed-form rearrangement can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SingularityKind {
    /// A required divisor is zero in base units
    DivisionByZero,
}

impl fmt::Display for SingularityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingularityKind::DivisionByZero => f.write_str("DivisionByZero"),
        }
    }
}

/// Structured error type for calculator operations.
///
/// Each variant carries enough context to be rendered next to the field it
/// concerns, and serializes to a tagged JSON object for API consumers.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// Raw input text is not a finite number
    #[error("Invalid number for '{field}': '{input}' - {reason}")]
    ParseError {
        field: String,
        input: String,
        reason: String,
    },

    /// An input or result violates a declared constraint
    #[error("{kind} on '{field}': {message}")]
    DomainError {
        field: String,
        kind: DomainErrorKind,
        message: String,
    },

    /// The rearrangement for a field is undefined for the current inputs
    #[error("{kind} while solving '{field}': {message}")]
    Singularity {
        field: String,
        kind: SingularityKind,
        message: String,
    },

    /// A group has no member left to recompute: every member was entered by
    /// the user, or the filled values contradict its relation
    #[error("Overdetermined: the fields of '{group}' cannot all hold as entered; clear one to recompute it")]
    Overdetermined { group: String },

    /// Unit symbol is not registered for the dimension
    #[error("Unknown unit '{unit}' for dimension '{dimension}'")]
    UnknownUnit { dimension: String, unit: String },

    /// Dimension id is not present in the unit registry
    #[error("Unknown dimension '{dimension}'")]
    UnknownDimension { dimension: String },

    /// Variable id is not declared in the calculator
    #[error("Unknown variable '{variable}'")]
    UnknownVariable { variable: String },

    /// A unit table, variable list, or equation group is malformed
    #[error("Invalid calculator definition: {reason}")]
    InvalidDefinition { reason: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },
}

impl CalcError {
    /// Create a ParseError
    pub fn parse(field: impl Into<String>, input: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::ParseError {
            field: field.into(),
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a DomainError
    pub fn domain(field: impl Into<String>, kind: DomainErrorKind, message: impl Into<String>) -> Self {
        CalcError::DomainError {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a division-by-zero Singularity
    pub fn division_by_zero(field: impl Into<String>, divisor: impl AsRef<str>) -> Self {
        CalcError::Singularity {
            field: field.into(),
            kind: SingularityKind::DivisionByZero,
            message: format!("'{}' is zero", divisor.as_ref()),
        }
    }

    /// Create an Overdetermined error
    pub fn overdetermined(group: impl Into<String>) -> Self {
        CalcError::Overdetermined { group: group.into() }
    }

    /// Create an UnknownUnit error
    pub fn unknown_unit(dimension: impl Into<String>, unit: impl Into<String>) -> Self {
        CalcError::UnknownUnit {
            dimension: dimension.into(),
            unit: unit.into(),
        }
    }

    /// Create an UnknownDimension error
    pub fn unknown_dimension(dimension: impl Into<String>) -> Self {
        CalcError::UnknownDimension {
            dimension: dimension.into(),
        }
    }

    /// Create an UnknownVariable error
    pub fn unknown_variable(variable: impl Into<String>) -> Self {
        CalcError::UnknownVariable {
            variable: variable.into(),
        }
    }

    /// Create an InvalidDefinition error
    pub fn invalid_definition(reason: impl Into<String>) -> Self {
        CalcError::InvalidDefinition { reason: reason.into() }
    }

    /// True for configuration errors that make a calculator unusable.
    ///
    /// These are only ever returned while building a calculator.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CalcError::UnknownUnit { .. }
                | CalcError::UnknownDimension { .. }
                | CalcError::UnknownVariable { .. }
                | CalcError::InvalidDefinition { .. }
        )
    }

    /// Field this error should be displayed against, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            CalcError::ParseError { field, .. }
            | CalcError::DomainError { field, .. }
            | CalcError::Singularity { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::ParseError { .. } => "PARSE_ERROR",
            CalcError::DomainError { .. } => "DOMAIN_ERROR",
            CalcError::Singularity { .. } => "SINGULARITY",
            CalcError::Overdetermined { .. } => "OVERDETERMINED",
            CalcError::UnknownUnit { .. } => "UNKNOWN_UNIT",
            CalcError::UnknownDimension { .. } => "UNKNOWN_DIMENSION",
            CalcError::UnknownVariable { .. } => "UNKNOWN_VARIABLE",
            CalcError::InvalidDefinition { .. } => "INVALID_DEFINITION",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(err: serde_json::Error) -> Self {
        CalcError::SerializationError {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = CalcError::domain("margin", DomainErrorKind::RatioExceeded, "Margin must be below 100 %");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"DomainError\""));
        let roundtrip: CalcError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CalcError::parse("c1", "abc", "not a number").error_code(), "PARSE_ERROR");
        assert_eq!(CalcError::division_by_zero("v2", "c1").error_code(), "SINGULARITY");
        assert_eq!(CalcError::overdetermined("margin").error_code(), "OVERDETERMINED");
        assert_eq!(CalcError::unknown_unit("mass", "stone").error_code(), "UNKNOWN_UNIT");
    }

    #[test]
    fn test_fatal_errors() {
        assert!(CalcError::unknown_unit("mass", "stone").is_fatal());
        assert!(CalcError::invalid_definition("empty group").is_fatal());
        assert!(!CalcError::overdetermined("margin").is_fatal());
        assert!(!CalcError::parse("c1", "x", "bad").is_fatal());
    }

    #[test]
    fn test_display_names_kind() {
        let err = CalcError::division_by_zero("v2", "c1");
        assert_eq!(err.to_string(), "DivisionByZero while solving 'v2': 'c1' is zero");
        assert_eq!(err.field(), Some("v2"));
    }
}
