//! # Formatting
//!
//! Text at the edges of the calculator: parsing what the user typed and
//! rendering base-unit results in a chosen display unit.
//!
//! ## Policy
//!
//! - `|v| < sci_lower` or `|v| > sci_upper` (non-zero): normalized scientific
//!   form with `significant_digits` in the mantissa, e.g. `1.2346e7`
//! - otherwise fixed-point with at most `max_decimals`, trailing zeros stripped
//! - zero, NaN and infinities render as `""` ("no result yet")
//!
//! ## Example
//!
//! ```rust
//! use calc_core::format::Formatter;
//! use calc_core::settings::FormatSettings;
//! use calc_core::units::{dim, UnitRegistry};
//!
//! let registry = UnitRegistry::standard();
//! let settings = FormatSettings::default();
//! let formatter = Formatter::new(&registry, &settings);
//!
//! assert_eq!(formatter.format(0.025, dim::VOLUME, "mL").unwrap(), "25");
//! assert_eq!(formatter.format(12_345_678.0, dim::LENGTH, "m").unwrap(), "1.2346e7");
//! assert_eq!(formatter.format(f64::NAN, dim::LENGTH, "m").unwrap(), "");
//! ```

use crate::errors::{CalcError, CalcResult};
use crate::settings::FormatSettings;
use crate::units::UnitRegistry;

/// Renders base-unit values in display units.
#[derive(Debug, Clone, Copy)]
pub struct Formatter<'a> {
    registry: &'a UnitRegistry,
    settings: &'a FormatSettings,
}

impl<'a> Formatter<'a> {
    pub fn new(registry: &'a UnitRegistry, settings: &'a FormatSettings) -> Self {
        Formatter { registry, settings }
    }

    /// Convert `base_value` into `unit` and render it as a result.
    pub fn format(&self, base_value: f64, dimension: &str, unit: &str) -> CalcResult<String> {
        let value = self.registry.from_base(dimension, unit, base_value)?;
        Ok(format_result(value, self.settings))
    }
}

/// Render a computed value already expressed in its display unit.
pub fn format_result(value: f64, settings: &FormatSettings) -> String {
    if !value.is_finite() {
        return String::new();
    }
    if value == 0.0 {
        return if settings.blank_zero_results {
            String::new()
        } else {
            "0".to_string()
        };
    }
    format_nonzero(value, settings)
}

/// Render a user-entered value; unlike results, zero is shown.
pub fn format_input(value: f64, settings: &FormatSettings) -> String {
    if !value.is_finite() {
        return String::new();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    format_nonzero(value, settings)
}

fn format_nonzero(value: f64, settings: &FormatSettings) -> String {
    let magnitude = value.abs();
    if magnitude < settings.sci_lower || magnitude > settings.sci_upper {
        let precision = settings.significant_digits.saturating_sub(1);
        let text = format!("{:.*e}", precision, value);
        match text.split_once('e') {
            Some((mantissa, exponent)) => format!("{}e{}", strip_trailing_zeros(mantissa), exponent),
            None => text,
        }
    } else {
        let text = format!("{:.*}", settings.max_decimals, value);
        let text = strip_trailing_zeros(&text);
        if text == "-0" {
            "0".to_string()
        } else {
            text.to_string()
        }
    }
}

fn strip_trailing_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Parse raw input text.
///
/// Blank text means "no value" and yields `Ok(None)`. Thousands separators
/// (`,` and `_`) are ignored. Anything that is not a finite number is a
/// `ParseError` against `field`.
pub fn parse_number(field: &str, raw: &str) -> CalcResult<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let cleaned: String = trimmed.chars().filter(|c| *c != ',' && *c != '_').collect();
    let value: f64 = cleaned
        .parse()
        .map_err(|_| CalcError::parse(field, trimmed, "not a number"))?;
    if !value.is_finite() {
        return Err(CalcError::parse(field, trimmed, "must be a finite number"));
    }
    Ok(Some(value))
}
