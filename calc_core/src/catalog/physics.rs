//! Physics calculators.

use super::{CalculatorDefinition, CatalogCategory, CatalogId};
use crate::equations::{checked_div, Constraint, EquationGroup, Knowns, Relation};
use crate::errors::CalcResult;
use crate::units::dim;
use crate::variables::VariableDef;

/// Cubic metres per litre (volume is based on the litre, density on kg/m³)
const M3_PER_LITRE: f64 = 1e-3;

/// V = I·R
pub(super) fn ohms_law() -> CalculatorDefinition {
    CalculatorDefinition {
        id: CatalogId::OhmsLaw,
        name: "Ohm's Law",
        description: "Voltage across a resistor from the current through it and its resistance.",
        category: CatalogCategory::Physics,
        variables: vec![
            VariableDef::new("voltage", "Voltage (V)", dim::VOLTAGE, "V"),
            VariableDef::new("current", "Current (I)", dim::CURRENT, "A"),
            VariableDef::new("resistance", "Resistance (R)", dim::RESISTANCE, "Ω"),
        ],
        groups: vec![
            EquationGroup::new("ohm", "Ohm's law", Relation::product("voltage", &["current", "resistance"]))
                .with_formula("V = I * R")
                .with_constraint(Constraint::non_negative("resistance")),
        ],
    }
}

fn mass_from_density(k: &Knowns) -> CalcResult<f64> {
    Ok(k.get("density")? * k.get("volume")? * M3_PER_LITRE)
}

fn density_from_mass(k: &Knowns) -> CalcResult<f64> {
    checked_div("density", k.get("mass")?, k.get("volume")? * M3_PER_LITRE, "volume")
}

fn volume_from_mass(k: &Knowns) -> CalcResult<f64> {
    Ok(checked_div("volume", k.get("mass")?, k.get("density")?, "density")? / M3_PER_LITRE)
}

/// m = ρ·V
pub(super) fn density() -> CalculatorDefinition {
    CalculatorDefinition {
        id: CatalogId::Density,
        name: "Density",
        description: "Mass, density and volume of a uniform body.",
        category: CatalogCategory::Physics,
        variables: vec![
            VariableDef::new("mass", "Mass (m)", dim::MASS, "g"),
            VariableDef::new("density", "Density (ρ)", dim::DENSITY, "g/cm³"),
            VariableDef::new("volume", "Volume (V)", dim::VOLUME, "mL"),
        ],
        groups: vec![
            EquationGroup::new(
                "density",
                "Density",
                Relation::custom(&[
                    ("mass", mass_from_density),
                    ("density", density_from_mass),
                    ("volume", volume_from_mass),
                ]),
            )
            .with_formula("m = ρ * V")
            .with_constraint(Constraint::non_negative("mass"))
            .with_constraint(Constraint::positive("density"))
            .with_constraint(Constraint::non_negative("volume"))
            .with_handoff(&["mass"]),
        ],
    }
}

/// d = v·t
pub(super) fn speed() -> CalculatorDefinition {
    CalculatorDefinition {
        id: CatalogId::Speed,
        name: "Speed, Distance, Time",
        description: "Distance covered at constant speed over a duration.",
        category: CatalogCategory::Physics,
        variables: vec![
            VariableDef::new("distance", "Distance", dim::LENGTH, "km"),
            VariableDef::new("speed", "Speed", dim::SPEED, "km/h"),
            VariableDef::new("time", "Time", dim::TIME, "h"),
        ],
        groups: vec![
            EquationGroup::new("travel", "Distance travelled", Relation::product("distance", &["speed", "time"]))
                .with_formula("d = v * t")
                .with_constraint(Constraint::non_negative("distance"))
                .with_constraint(Constraint::non_negative("speed"))
                .with_constraint(Constraint::non_negative("time"))
                .with_handoff(&["time", "distance"]),
        ],
    }
}
