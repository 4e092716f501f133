//! Chemistry calculators.

use super::{CalculatorDefinition, CatalogCategory, CatalogId};
use crate::equations::{Constraint, EquationGroup, Relation};
use crate::units::dim;
use crate::variables::VariableDef;

/// C1·V1 = C2·V2
pub(super) fn dilution() -> CalculatorDefinition {
    CalculatorDefinition {
        id: CatalogId::Dilution,
        name: "Solution Dilution",
        description: "Concentration and volume of a stock solution before and after dilution.",
        category: CatalogCategory::Chemistry,
        variables: vec![
            VariableDef::new("c1", "Stock concentration (C1)", dim::CONCENTRATION, "M"),
            VariableDef::new("v1", "Stock volume (V1)", dim::VOLUME, "mL"),
            VariableDef::new("c2", "Final concentration (C2)", dim::CONCENTRATION, "M"),
            VariableDef::new("v2", "Final volume (V2)", dim::VOLUME, "mL"),
        ],
        groups: vec![
            EquationGroup::new("dilution", "Dilution", Relation::balance("c1", "v1", "c2", "v2"))
                .with_formula("C1 * V1 = C2 * V2")
                .with_constraint(Constraint::non_negative("c1"))
                .with_constraint(Constraint::non_negative("v1"))
                .with_constraint(Constraint::non_negative("c2"))
                .with_constraint(Constraint::non_negative("v2"))
                .with_handoff(&["v2", "c2", "v1", "c1"]),
        ],
    }
}

/// V1/T1 = V2/T2 at constant pressure, on absolute temperature
pub(super) fn charles_law() -> CalculatorDefinition {
    CalculatorDefinition {
        id: CatalogId::CharlesLaw,
        name: "Charles's Law",
        description: "Volume of a gas at constant pressure as its absolute temperature changes.",
        category: CatalogCategory::Chemistry,
        variables: vec![
            VariableDef::new("v1", "Initial volume (V1)", dim::VOLUME, "L"),
            VariableDef::new("t1", "Initial temperature (T1)", dim::TEMPERATURE, "°C"),
            VariableDef::new("v2", "Final volume (V2)", dim::VOLUME, "L"),
            VariableDef::new("t2", "Final temperature (T2)", dim::TEMPERATURE, "°C"),
        ],
        groups: vec![
            EquationGroup::new("charles", "Charles's law", Relation::balance("v1", "t2", "v2", "t1"))
                .with_formula("V1 / T1 = V2 / T2")
                .with_constraint(Constraint::positive("t1"))
                .with_constraint(Constraint::positive("t2"))
                .with_constraint(Constraint::non_negative("v1"))
                .with_constraint(Constraint::non_negative("v2"))
                .with_handoff(&["v2", "t2"]),
        ],
    }
}

/// A = Z + N
pub(super) fn nucleons() -> CalculatorDefinition {
    CalculatorDefinition {
        id: CatalogId::Nucleons,
        name: "Nucleon Count",
        description: "Mass number from protons and neutrons, or either count from the other two.",
        category: CatalogCategory::Chemistry,
        variables: vec![
            VariableDef::new("a", "Mass number (A)", dim::COUNT, "ea"),
            VariableDef::new("z", "Atomic number (Z)", dim::COUNT, "ea"),
            VariableDef::new("n", "Neutron count (N)", dim::COUNT, "ea"),
        ],
        groups: vec![
            EquationGroup::new("nucleons", "Nucleons", Relation::sum("a", &["z", "n"]))
                .with_formula("A = Z + N")
                .with_constraint(Constraint::at_least("a", "z"))
                .with_constraint(Constraint::positive("z"))
                .with_constraint(Constraint::non_negative("n")),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dilution() {
        let mut calc = dilution().instantiate().unwrap();
        calc.on_field_change("c1", "10");
        calc.on_field_change("v1", "5");
        let state = calc.on_field_change("c2", "2");
        assert_eq!(state.field("v2").unwrap().display_value, "25");
    }

    #[test]
    fn test_charles_law_uses_absolute_temperature() {
        let mut calc = charles_law().instantiate().unwrap();
        calc.on_field_change("v1", "2");
        calc.on_field_change("t1", "25");
        calc.on_field_change("t2", "50");
        let v2 = calc.variable("v2").unwrap().raw_value().unwrap();
        assert_relative_eq!(v2, 2.0 * 323.15 / 298.15, max_relative = 1e-12);
    }

    #[test]
    fn test_charles_law_rejects_absolute_zero() {
        let mut calc = charles_law().instantiate().unwrap();
        calc.on_field_change("v1", "2");
        calc.on_field_change("t2", "50");
        let state = calc.on_field_change("t1", "-273.15");
        assert!(state.field("t1").unwrap().errors[0].contains("NonPositive"));
        assert_eq!(state.field("v2").unwrap().display_value, "");
    }

    #[test]
    fn test_nucleons() {
        let mut calc = nucleons().instantiate().unwrap();
        calc.on_field_change("z", "6");
        let state = calc.on_field_change("n", "8");
        assert_eq!(state.field("a").unwrap().display_value, "14");

        let mut calc = nucleons().instantiate().unwrap();
        calc.on_field_change("a", "5");
        let state = calc.on_field_change("z", "6");
        assert!(state.field("a").unwrap().errors[0].contains("OrderingViolated"));
        assert_eq!(state.field("n").unwrap().display_value, "");
    }
}
