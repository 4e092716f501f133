//! # Calculator Settings
//!
//! Tunables for result formatting and the resolution engine. Settings are
//! plain JSON; every field has a default, so a partial document such as
//! `{"format": {"significant_digits": 4}}` is valid.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::settings::CalculatorSettings;
//!
//! let settings = CalculatorSettings::from_json_str(r#"{"format": {"max_decimals": 3}}"#).unwrap();
//! assert_eq!(settings.format.max_decimals, 3);
//! assert_eq!(settings.format.significant_digits, 5);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Smallest and largest mantissa precision allowed in scientific form
pub const MIN_SIGNIFICANT_DIGITS: usize = 4;
pub const MAX_SIGNIFICANT_DIGITS: usize = 6;

/// Number rendering policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatSettings {
    /// Significant digits of the mantissa in scientific form (4..=6)
    pub significant_digits: usize,

    /// Maximum decimals in fixed-point form (trailing zeros are stripped)
    pub max_decimals: usize,

    /// Magnitudes below this render in scientific form
    pub sci_lower: f64,

    /// Magnitudes above this render in scientific form
    pub sci_upper: f64,

    /// Render computed zeros as an empty field
    pub blank_zero_results: bool,
}

impl Default for FormatSettings {
    fn default() -> Self {
        FormatSettings {
            significant_digits: 5,
            max_decimals: 6,
            sci_lower: 1e-4,
            sci_upper: 1e6,
            blank_zero_results: true,
        }
    }
}

/// Resolution engine limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Upper bound on evaluation passes per event
    pub max_passes: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings { max_passes: 16 }
    }
}

/// All settings of a calculator instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorSettings {
    pub format: FormatSettings,
    pub engine: EngineSettings,
}

impl CalculatorSettings {
    /// Parse settings from JSON, then validate them
    pub fn from_json_str(json: &str) -> CalcResult<Self> {
        let settings: CalculatorSettings = serde_json::from_str(json)?;
        settings.validated()
    }

    /// Read settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> CalcResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| CalcError::SerializationError {
            reason: format!("reading '{}': {}", path.display(), e),
        })?;
        Self::from_json_str(&json)
    }

    /// Clamp the mantissa precision and reject unusable thresholds
    pub fn validated(mut self) -> CalcResult<Self> {
        self.format.significant_digits = self
            .format
            .significant_digits
            .clamp(MIN_SIGNIFICANT_DIGITS, MAX_SIGNIFICANT_DIGITS);

        let f = &self.format;
        if !(f.sci_lower.is_finite() && f.sci_upper.is_finite()) || f.sci_lower <= 0.0 || f.sci_lower >= f.sci_upper {
            return Err(CalcError::invalid_definition(format!(
                "scientific thresholds must satisfy 0 < sci_lower < sci_upper (got {} and {})",
                f.sci_lower, f.sci_upper
            )));
        }
        if self.engine.max_passes == 0 {
            return Err(CalcError::invalid_definition("max_passes must be at least 1"));
        }
        Ok(self)
    }
}
