//! # Unit Registry
//!
//! Per-dimension unit tables and the conversions between a display unit and
//! the dimension's canonical base unit. All solver arithmetic happens in base
//! units; display units only matter at the edges (parsing and formatting).
//!
//! ## Conversion Model
//!
//! Every unit carries a `scale` and an `offset`:
//!
//! ```text
//! base = raw * scale + offset
//! raw  = (base - offset) / scale
//! ```
//!
//! Most dimensions are pure scale (offset = 0). Temperature is affine:
//! Celsius and Fahrenheit carry an offset onto Kelvin.
//!
//! ## Built-in Dimensions
//!
//! | Dimension | Base unit | Other units |
//! |-----------|-----------|-------------|
//! | mass | kg | mg, g, t, oz, lb |
//! | length | m | mm, cm, km, in, ft, yd, mi |
//! | volume | L | µL, mL, m³, fl oz, gal |
//! | temperature | K | °C, °F, °R |
//! | time | s | ms, min, h, d, wk, yr |
//! | concentration | M | mM, µM, nM, mol/m³ |
//! | density | kg/m³ | g/cm³, g/mL, kg/L, lb/ft³ |
//! | speed | m/s | km/h, mph, kn, ft/s |
//! | money | ¤ | k¤, M¤ |
//! | ratio | fraction | %, ‰, bp |
//! | count | ea | dozen |
//! | voltage | V | mV, kV |
//! | current | A | µA, mA |
//! | resistance | Ω | mΩ, kΩ, MΩ |
//!
//! ## Example
//!
//! ```rust
//! use calc_core::units::{dim, UnitRegistry};
//!
//! let registry = UnitRegistry::standard();
//! let kelvin = registry.to_base(dim::TEMPERATURE, "°C", 25.0).unwrap();
//! assert!((kelvin - 298.15).abs() < 1e-9);
//!
//! let feet = registry.convert(dim::LENGTH, "in", "ft", 144.0).unwrap();
//! assert!((feet - 12.0).abs() < 1e-9);
//! ```

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Identifiers of the built-in dimensions.
pub mod dim {
    pub const MASS: &str = "mass";
    pub const LENGTH: &str = "length";
    pub const VOLUME: &str = "volume";
    pub const TEMPERATURE: &str = "temperature";
    pub const TIME: &str = "time";
    pub const CONCENTRATION: &str = "concentration";
    pub const DENSITY: &str = "density";
    pub const SPEED: &str = "speed";
    pub const MONEY: &str = "money";
    pub const RATIO: &str = "ratio";
    pub const COUNT: &str = "count";
    pub const VOLTAGE: &str = "voltage";
    pub const CURRENT: &str = "current";
    pub const RESISTANCE: &str = "resistance";
}

/// Seconds in a Julian year (365.25 days)
pub const SECONDS_PER_YEAR: f64 = 31_557_600.0;

// ============================================================================
// Unit Definitions
// ============================================================================

/// One legal unit of a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    /// Symbol shown in unit selectors (e.g. "mL", "°F")
    pub symbol: String,

    /// Human-readable name
    pub name: String,

    /// Multiplier onto the base unit
    pub scale: f64,

    /// Additive offset onto the base unit (non-zero only for affine units)
    #[serde(default)]
    pub offset: f64,
}

impl UnitDef {
    /// Create a pure-scale unit
    pub fn scaled(symbol: impl Into<String>, name: impl Into<String>, scale: f64) -> Self {
        UnitDef {
            symbol: symbol.into(),
            name: name.into(),
            scale,
            offset: 0.0,
        }
    }

    /// Create an affine unit (`base = raw * scale + offset`)
    pub fn affine(symbol: impl Into<String>, name: impl Into<String>, scale: f64, offset: f64) -> Self {
        UnitDef {
            symbol: symbol.into(),
            name: name.into(),
            scale,
            offset,
        }
    }

    /// Convert a raw value in this unit to the base unit
    #[inline]
    pub fn to_base(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }

    /// Convert a base-unit value into this unit
    #[inline]
    pub fn from_base(&self, base: f64) -> f64 {
        (base - self.offset) / self.scale
    }

    /// True when the unit carries an offset
    pub fn is_affine(&self) -> bool {
        self.offset != 0.0
    }
}

// ============================================================================
// Dimension Tables
// ============================================================================

/// The unit table of one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionTable {
    /// Dimension identifier (e.g. "mass")
    pub id: String,

    /// Display name (e.g. "Mass")
    pub name: String,

    /// Symbol of the canonical base unit; must appear in `units`
    pub base_unit: String,

    /// Legal units, in selector order
    pub units: Vec<UnitDef>,
}

impl DimensionTable {
    /// Create a table containing only its base unit.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base_symbol: impl Into<String>,
        base_name: impl Into<String>,
    ) -> Self {
        let base_symbol = base_symbol.into();
        DimensionTable {
            id: id.into(),
            name: name.into(),
            base_unit: base_symbol.clone(),
            units: vec![UnitDef::scaled(base_symbol, base_name, 1.0)],
        }
    }

    /// Builder: add a pure-scale unit
    pub fn with_unit(mut self, symbol: &str, name: &str, scale: f64) -> Self {
        self.units.push(UnitDef::scaled(symbol, name, scale));
        self
    }

    /// Builder: add an affine unit
    pub fn with_affine_unit(mut self, symbol: &str, name: &str, scale: f64, offset: f64) -> Self {
        self.units.push(UnitDef::affine(symbol, name, scale, offset));
        self
    }

    /// Look up a unit by symbol
    pub fn unit(&self, symbol: &str) -> Option<&UnitDef> {
        self.units.iter().find(|u| u.symbol == symbol)
    }

    /// Symbols of all units, in selector order
    pub fn symbols(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.symbol.as_str()).collect()
    }

    /// True if any unit of this dimension is affine
    pub fn is_affine(&self) -> bool {
        self.units.iter().any(UnitDef::is_affine)
    }

    /// Check the table is internally consistent.
    pub fn validate(&self) -> CalcResult<()> {
        if self.id.trim().is_empty() {
            return Err(CalcError::invalid_definition("dimension id must not be empty"));
        }

        let base = self
            .unit(&self.base_unit)
            .ok_or_else(|| CalcError::unknown_unit(&self.id, &self.base_unit))?;
        if base.scale != 1.0 || base.offset != 0.0 {
            return Err(CalcError::invalid_definition(format!(
                "base unit '{}' of '{}' must have scale 1 and offset 0",
                self.base_unit, self.id
            )));
        }

        let mut seen = HashSet::new();
        for unit in &self.units {
            if !seen.insert(unit.symbol.as_str()) {
                return Err(CalcError::invalid_definition(format!(
                    "unit '{}' is declared twice in '{}'",
                    unit.symbol, self.id
                )));
            }
            if !unit.scale.is_finite() || unit.scale == 0.0 {
                return Err(CalcError::invalid_definition(format!(
                    "unit '{}' of '{}' has an unusable scale {}",
                    unit.symbol, self.id, unit.scale
                )));
            }
            if !unit.offset.is_finite() {
                return Err(CalcError::invalid_definition(format!(
                    "unit '{}' of '{}' has a non-finite offset",
                    unit.symbol, self.id
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// All dimension tables known to a calculator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitRegistry {
    dimensions: BTreeMap<String, DimensionTable>,
}

static STANDARD: Lazy<UnitRegistry> = Lazy::new(build_standard);

impl UnitRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in registry (see module docs for its contents)
    pub fn standard() -> Self {
        STANDARD.clone()
    }

    /// Parse and validate a registry from JSON.
    ///
    /// The JSON shape is an object keyed by dimension id, each value a
    /// [`DimensionTable`].
    pub fn from_json_str(json: &str) -> CalcResult<Self> {
        let registry: UnitRegistry = serde_json::from_str(json)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Add (or replace) a dimension table after validating it
    pub fn insert(&mut self, table: DimensionTable) -> CalcResult<()> {
        table.validate()?;
        self.dimensions.insert(table.id.clone(), table);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_dimension(mut self, table: DimensionTable) -> CalcResult<Self> {
        self.insert(table)?;
        Ok(self)
    }

    /// Validate every table
    pub fn validate(&self) -> CalcResult<()> {
        for (key, table) in &self.dimensions {
            if key != &table.id {
                return Err(CalcError::invalid_definition(format!(
                    "dimension keyed '{}' declares id '{}'",
                    key, table.id
                )));
            }
            table.validate()?;
        }
        Ok(())
    }

    /// Iterate over all dimension tables, ordered by id
    pub fn dimensions(&self) -> impl Iterator<Item = &DimensionTable> {
        self.dimensions.values()
    }

    /// Look up a dimension table
    pub fn dimension(&self, dimension: &str) -> CalcResult<&DimensionTable> {
        self.dimensions
            .get(dimension)
            .ok_or_else(|| CalcError::unknown_dimension(dimension))
    }

    /// Look up a unit of a dimension
    pub fn unit(&self, dimension: &str, unit: &str) -> CalcResult<&UnitDef> {
        self.dimension(dimension)?
            .unit(unit)
            .ok_or_else(|| CalcError::unknown_unit(dimension, unit))
    }

    /// Convert a raw value in `unit` to the dimension's base unit
    pub fn to_base(&self, dimension: &str, unit: &str, raw: f64) -> CalcResult<f64> {
        Ok(self.unit(dimension, unit)?.to_base(raw))
    }

    /// Convert a base-unit value into `unit`
    pub fn from_base(&self, dimension: &str, unit: &str, base: f64) -> CalcResult<f64> {
        Ok(self.unit(dimension, unit)?.from_base(base))
    }

    /// Re-express a raw value from one unit of a dimension into another
    pub fn convert(&self, dimension: &str, from: &str, to: &str, raw: f64) -> CalcResult<f64> {
        let from_unit = self.unit(dimension, from)?;
        let to_unit = self.unit(dimension, to)?;
        Ok(to_unit.from_base(from_unit.to_base(raw)))
    }
}

fn build_standard() -> UnitRegistry {
    // Kelvin = °F * 5/9 + (273.15 - 32 * 5/9)
    let fahrenheit_offset = 273.15 - 32.0 * 5.0 / 9.0;

    let tables = vec![
        DimensionTable::new(dim::MASS, "Mass", "kg", "kilogram")
            .with_unit("mg", "milligram", 1e-6)
            .with_unit("g", "gram", 1e-3)
            .with_unit("t", "tonne", 1e3)
            .with_unit("oz", "ounce", 0.028_349_523_125)
            .with_unit("lb", "pound", 0.453_592_37),
        DimensionTable::new(dim::LENGTH, "Length", "m", "metre")
            .with_unit("mm", "millimetre", 1e-3)
            .with_unit("cm", "centimetre", 1e-2)
            .with_unit("km", "kilometre", 1e3)
            .with_unit("in", "inch", 0.0254)
            .with_unit("ft", "foot", 0.3048)
            .with_unit("yd", "yard", 0.9144)
            .with_unit("mi", "mile", 1_609.344),
        DimensionTable::new(dim::VOLUME, "Volume", "L", "litre")
            .with_unit("µL", "microlitre", 1e-6)
            .with_unit("mL", "millilitre", 1e-3)
            .with_unit("m³", "cubic metre", 1e3)
            .with_unit("fl oz", "US fluid ounce", 0.029_573_529_562_5)
            .with_unit("gal", "US gallon", 3.785_411_784),
        DimensionTable::new(dim::TEMPERATURE, "Temperature", "K", "kelvin")
            .with_affine_unit("°C", "degree Celsius", 1.0, 273.15)
            .with_affine_unit("°F", "degree Fahrenheit", 5.0 / 9.0, fahrenheit_offset)
            .with_unit("°R", "degree Rankine", 5.0 / 9.0),
        DimensionTable::new(dim::TIME, "Time", "s", "second")
            .with_unit("ms", "millisecond", 1e-3)
            .with_unit("min", "minute", 60.0)
            .with_unit("h", "hour", 3_600.0)
            .with_unit("d", "day", 86_400.0)
            .with_unit("wk", "week", 604_800.0)
            .with_unit("yr", "year", SECONDS_PER_YEAR),
        DimensionTable::new(dim::CONCENTRATION, "Molar concentration", "M", "mole per litre")
            .with_unit("mM", "millimolar", 1e-3)
            .with_unit("µM", "micromolar", 1e-6)
            .with_unit("nM", "nanomolar", 1e-9)
            .with_unit("mol/m³", "mole per cubic metre", 1e-3),
        DimensionTable::new(dim::DENSITY, "Density", "kg/m³", "kilogram per cubic metre")
            .with_unit("g/cm³", "gram per cubic centimetre", 1e3)
            .with_unit("g/mL", "gram per millilitre", 1e3)
            .with_unit("kg/L", "kilogram per litre", 1e3)
            .with_unit("lb/ft³", "pound per cubic foot", 16.018_463_373_960_14),
        DimensionTable::new(dim::SPEED, "Speed", "m/s", "metre per second")
            .with_unit("km/h", "kilometre per hour", 1.0 / 3.6)
            .with_unit("mph", "mile per hour", 0.447_04)
            .with_unit("kn", "knot", 1_852.0 / 3_600.0)
            .with_unit("ft/s", "foot per second", 0.3048),
        DimensionTable::new(dim::MONEY, "Money", "¤", "currency unit")
            .with_unit("k¤", "thousand", 1e3)
            .with_unit("M¤", "million", 1e6),
        DimensionTable::new(dim::RATIO, "Ratio", "fraction", "fraction")
            .with_unit("%", "percent", 1e-2)
            .with_unit("‰", "per mille", 1e-3)
            .with_unit("bp", "basis point", 1e-4),
        DimensionTable::new(dim::COUNT, "Count", "ea", "each").with_unit("dozen", "dozen", 12.0),
        DimensionTable::new(dim::VOLTAGE, "Voltage", "V", "volt")
            .with_unit("mV", "millivolt", 1e-3)
            .with_unit("kV", "kilovolt", 1e3),
        DimensionTable::new(dim::CURRENT, "Current", "A", "ampere")
            .with_unit("µA", "microampere", 1e-6)
            .with_unit("mA", "milliampere", 1e-3),
        DimensionTable::new(dim::RESISTANCE, "Resistance", "Ω", "ohm")
            .with_unit("mΩ", "milliohm", 1e-3)
            .with_unit("kΩ", "kiloohm", 1e3)
            .with_unit("MΩ", "megaohm", 1e6),
    ];

    let mut registry = UnitRegistry::new();
    for table in tables {
        registry.dimensions.insert(table.id.clone(), table);
    }
    registry
}
