//! # Calculator Instance
//!
//! The reactive update controller and the public surface of the crate. A
//! [`CalculatorInstance`] owns one [`VariableSet`] and one
//! [`ResolutionEngine`] and accepts exactly four events:
//!
//! | Event | Effect |
//! |-------|--------|
//! | [`on_field_change`](CalculatorInstance::on_field_change) | parse, store as `UserSet`, resolve |
//! | [`on_unit_change`](CalculatorInstance::on_unit_change) | re-express the value; never resolves |
//! | [`on_clear_field`](CalculatorInstance::on_clear_field) | empty the field, resolve (cascading clears) |
//! | [`on_clear_all`](CalculatorInstance::on_clear_all) | empty everything, restore default units |
//!
//! Each returns a [`UiState`] snapshot. Errors never cross this boundary as
//! `Err`; they are reported as messages on the field they concern.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::calculator::create_calculator;
//! use calc_core::equations::{EquationGroup, Relation};
//! use calc_core::units::{dim, UnitRegistry};
//! use calc_core::variables::VariableDef;
//!
//! let defs = vec![
//!     VariableDef::new("c1", "Stock concentration", dim::CONCENTRATION, "M"),
//!     VariableDef::new("v1", "Stock volume", dim::VOLUME, "mL"),
//!     VariableDef::new("c2", "Final concentration", dim::CONCENTRATION, "M"),
//!     VariableDef::new("v2", "Final volume", dim::VOLUME, "mL"),
//! ];
//! let groups = vec![EquationGroup::new("dilution", "Dilution", Relation::balance("c1", "v1", "c2", "v2"))];
//!
//! let mut calc = create_calculator(&defs, UnitRegistry::standard(), groups).unwrap();
//! calc.on_field_change("c1", "10");
//! calc.on_field_change("v1", "5");
//! let state = calc.on_field_change("c2", "2");
//! assert_eq!(state.field("v2").unwrap().display_value, "25");
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::engine::{Edit, GroupReport, ResolutionEngine};
use crate::equations::EquationGroup;
use crate::errors::{CalcError, CalcResult};
use crate::format::{format_input, format_result, parse_number};
use crate::settings::CalculatorSettings;
use crate::units::UnitRegistry;
use crate::variables::{Provenance, Variable, VariableDef, VariableSet};

/// Display state of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    pub id: String,
    pub label: String,
    /// Text for the input box ("" when there is nothing to show)
    pub display_value: String,
    /// Selected unit symbol
    pub unit: String,
    pub provenance: Provenance,
    /// Messages to show inline, most specific first
    pub errors: Vec<String>,
    /// Informational messages that are not errors
    #[serde(default)]
    pub notices: Vec<String>,
}

/// Shown on a field whose typed value was handed back to the solver
pub const HANDOFF_NOTICE: &str = "recomputed: was user-entered";

/// Snapshot handed to the presentation layer after every event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    /// One entry per variable, in declaration order
    pub fields: Vec<FieldState>,
}

impl UiState {
    pub fn field(&self, id: &str) -> Option<&FieldState> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// True if any field carries a message
    pub fn has_errors(&self) -> bool {
        self.fields.iter().any(|f| !f.errors.is_empty())
    }
}

/// Build a calculator, checking every declaration against the registry.
///
/// This is the only place configuration errors (`UnknownUnit`,
/// `UnknownDimension`, `UnknownVariable`, `InvalidDefinition`) surface.
pub fn create_calculator(
    variable_defs: &[VariableDef],
    unit_tables: UnitRegistry,
    equation_groups: Vec<EquationGroup>,
) -> CalcResult<CalculatorInstance> {
    CalculatorInstance::new(variable_defs, unit_tables, equation_groups, CalculatorSettings::default())
}

/// One live calculator session.
#[derive(Debug, Clone)]
pub struct CalculatorInstance {
    session: Uuid,
    variables: VariableSet,
    engine: ResolutionEngine,
    settings: CalculatorSettings,
    /// Field-local problems (bad text, bad unit), kept until the field changes
    input_errors: HashMap<String, CalcError>,
    /// Text that failed to parse, echoed back in place of the value
    rejected_text: HashMap<String, String>,
    /// Group-level problems from the most recent resolution
    solve_errors: Vec<(String, CalcError)>,
    /// Fields the most recent resolution took over from the user
    handed_off: Vec<String>,
    last_outcomes: Vec<GroupReport>,
    solver_runs: u64,
}

impl CalculatorInstance {
    /// Build a calculator with explicit settings
    pub fn new(
        variable_defs: &[VariableDef],
        unit_tables: UnitRegistry,
        equation_groups: Vec<EquationGroup>,
        settings: CalculatorSettings,
    ) -> CalcResult<Self> {
        unit_tables.validate()?;
        let settings = settings.validated()?;
        let variables = VariableSet::new(unit_tables, variable_defs)?;

        let mut seen = HashSet::new();
        for group in &equation_groups {
            if !seen.insert(group.id.as_str()) {
                return Err(CalcError::invalid_definition(format!(
                    "equation group '{}' is declared twice",
                    group.id
                )));
            }
            group.validate(&variables)?;
        }

        let session = Uuid::new_v4();
        debug!(%session, variables = variables.len(), groups = equation_groups.len(), "calculator created");

        Ok(CalculatorInstance {
            session,
            variables,
            engine: ResolutionEngine::new(equation_groups, settings.engine.clone()),
            settings,
            input_errors: HashMap::new(),
            rejected_text: HashMap::new(),
            solve_errors: Vec::new(),
            handed_off: Vec::new(),
            last_outcomes: Vec::new(),
            solver_runs: 0,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session
    }

    pub fn settings(&self) -> &CalculatorSettings {
        &self.settings
    }

    /// Read-only view of the variables
    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    pub fn variable(&self, id: &str) -> CalcResult<&Variable> {
        self.variables.get(id)
    }

    pub fn groups(&self) -> &[EquationGroup] {
        self.engine.groups()
    }

    /// Unit symbols selectable for a variable
    pub fn units_for(&self, id: &str) -> CalcResult<Vec<String>> {
        let var = self.variables.get(id)?;
        let table = self.variables.registry().dimension(var.dimension())?;
        Ok(table.units.iter().map(|u| u.symbol.clone()).collect())
    }

    /// Group outcomes of the most recent resolution
    pub fn last_outcomes(&self) -> &[GroupReport] {
        &self.last_outcomes
    }

    /// Number of times the resolution engine has been invoked
    pub fn solver_runs(&self) -> u64 {
        self.solver_runs
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// The user typed `raw` into a field.
    pub fn on_field_change(&mut self, variable_id: &str, raw: &str) -> UiState {
        let span = info_span!("field_change", session = %self.session, field = variable_id);
        let _enter = span.enter();

        let previous = match self.variables.get(variable_id) {
            Ok(var) => var.provenance(),
            Err(err) => {
                warn!(error = %err, "event for unknown field ignored");
                return self.snapshot();
            }
        };

        let value = match parse_number(variable_id, raw) {
            Ok(Some(value)) => value,
            Ok(None) => return self.clear_field(variable_id),
            Err(err) => {
                debug!(error = %err, "input rejected");
                self.input_errors.insert(variable_id.to_string(), err);
                self.rejected_text.insert(variable_id.to_string(), raw.to_string());
                return self.snapshot();
            }
        };

        self.input_errors.remove(variable_id);
        self.rejected_text.remove(variable_id);
        if let Err(err) = self.variables.set_input(variable_id, value, raw.trim()) {
            warn!(error = %err, "value not stored");
            return self.snapshot();
        }

        self.run_solver(Edit::Value {
            id: variable_id,
            was_derived: previous == Provenance::Derived,
        });
        self.snapshot()
    }

    /// The user picked another unit for a field.
    ///
    /// The held value is re-expressed in the new unit. The physical
    /// quantity is unchanged, so the solver does not run.
    pub fn on_unit_change(&mut self, variable_id: &str, unit: &str) -> UiState {
        let span = info_span!("unit_change", session = %self.session, field = variable_id, unit);
        let _enter = span.enter();

        match self.variables.set_unit(variable_id, unit) {
            Ok(()) => {
                if matches!(self.input_errors.get(variable_id), Some(CalcError::UnknownUnit { .. })) {
                    self.input_errors.remove(variable_id);
                }
                debug!("value re-expressed");
            }
            Err(err @ CalcError::UnknownVariable { .. }) => {
                warn!(error = %err, "event for unknown field ignored");
            }
            Err(err) => {
                warn!(error = %err, "unit change rejected");
                self.input_errors.insert(variable_id.to_string(), err);
            }
        }
        self.snapshot()
    }

    /// The user emptied one field.
    pub fn on_clear_field(&mut self, variable_id: &str) -> UiState {
        let span = info_span!("clear_field", session = %self.session, field = variable_id);
        let _enter = span.enter();
        self.clear_field(variable_id)
    }

    /// Reset every field to empty and its default unit.
    pub fn on_clear_all(&mut self) -> UiState {
        let span = info_span!("clear_all", session = %self.session);
        let _enter = span.enter();

        self.variables.reset_all();
        self.input_errors.clear();
        self.rejected_text.clear();
        self.solve_errors.clear();
        self.handed_off.clear();
        self.last_outcomes.clear();
        debug!("calculator reset");
        self.snapshot()
    }

    fn clear_field(&mut self, variable_id: &str) -> UiState {
        self.input_errors.remove(variable_id);
        self.rejected_text.remove(variable_id);
        if let Err(err) = self.variables.clear(variable_id) {
            warn!(error = %err, "event for unknown field ignored");
            return self.snapshot();
        }
        self.run_solver(Edit::Cleared { id: variable_id });
        self.snapshot()
    }

    fn run_solver(&mut self, edit: Edit<'_>) {
        self.solver_runs += 1;
        let resolution = self.engine.resolve(&mut self.variables, edit);

        self.solve_errors.clear();
        for report in &resolution.reports {
            if let Some(err) = report.outcome.to_error(&report.group) {
                // Group-wide problems are shown on the field the user just edited
                let field = err.field().unwrap_or(edit.id()).to_string();
                self.solve_errors.push((field, err));
            }
        }
        for id in &resolution.handed_off {
            info!(field = %id, "user value handed back to the solver");
        }
        debug!(
            passes = resolution.passes,
            derived = ?resolution.derived,
            cleared = ?resolution.cleared,
            "resolution finished"
        );
        self.handed_off = resolution.handed_off;
        self.last_outcomes = resolution.reports;
    }

    // ========================================================================
    // Snapshot
    // ========================================================================

    /// Current display state of every field
    pub fn snapshot(&self) -> UiState {
        let fields = self
            .variables
            .iter()
            .map(|var| {
                let mut errors = Vec::new();
                if let Some(err) = self.input_errors.get(var.id()) {
                    errors.push(err.to_string());
                }
                errors.extend(
                    self.solve_errors
                        .iter()
                        .filter(|(field, _)| field == var.id())
                        .map(|(_, err)| err.to_string()),
                );
                let notices = if self.handed_off.iter().any(|id| id == var.id()) {
                    vec![HANDOFF_NOTICE.to_string()]
                } else {
                    Vec::new()
                };

                FieldState {
                    id: var.id().to_string(),
                    label: var.label().to_string(),
                    display_value: self.display_value(var),
                    unit: var.unit().to_string(),
                    provenance: var.provenance(),
                    errors,
                    notices,
                }
            })
            .collect();
        UiState { fields }
    }

    fn display_value(&self, var: &Variable) -> String {
        if let Some(text) = self.rejected_text.get(var.id()) {
            return text.clone();
        }
        let format = &self.settings.format;
        match (var.provenance(), var.raw_value()) {
            (_, None) | (Provenance::Empty, _) => String::new(),
            (Provenance::UserSet, Some(raw)) => match var.input_text() {
                Some(text) => text.to_string(),
                None => format_input(raw, format),
            },
            (Provenance::Derived, Some(raw)) => format_result(raw, format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equations::{Constraint, Relation};
    use crate::units::dim;

    fn dilution_calc() -> CalculatorInstance {
        let defs = vec![
            VariableDef::new("c1", "C1", dim::CONCENTRATION, "M"),
            VariableDef::new("v1", "V1", dim::VOLUME, "mL"),
            VariableDef::new("c2", "C2", dim::CONCENTRATION, "M"),
            VariableDef::new("v2", "V2", dim::VOLUME, "mL"),
        ];
        let groups = vec![
            EquationGroup::new("dilution", "Dilution", Relation::balance("c1", "v1", "c2", "v2"))
                .with_constraint(Constraint::non_negative("v2")),
        ];
        create_calculator(&defs, UnitRegistry::standard(), groups).unwrap()
    }

    #[test]
    fn test_definition_errors_are_fatal() {
        let defs = vec![VariableDef::new("m", "Mass", dim::MASS, "stone")];
        let err = create_calculator(&defs, UnitRegistry::standard(), vec![]).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_UNIT");
        assert!(err.is_fatal());

        let defs = vec![
            VariableDef::new("a", "A", dim::COUNT, "ea"),
            VariableDef::new("b", "B", dim::COUNT, "ea"),
        ];
        let groups = vec![
            EquationGroup::new("g", "G", Relation::sum("a", &["b"])),
            EquationGroup::new("g", "G again", Relation::sum("b", &["a"])),
        ];
        let err = create_calculator(&defs, UnitRegistry::standard(), groups).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DEFINITION");
    }

    #[test]
    fn test_user_text_is_echoed() {
        let mut calc = dilution_calc();
        let state = calc.on_field_change("c1", " 1,000 ");
        let c1 = state.field("c1").unwrap();
        assert_eq!(c1.display_value, "1,000");
        assert_eq!(c1.provenance, Provenance::UserSet);

        let state = calc.on_field_change("v1", "0");
        assert_eq!(state.field("v1").unwrap().display_value, "0");
    }

    #[test]
    fn test_parse_error_is_field_local() {
        let mut calc = dilution_calc();
        calc.on_field_change("c1", "10");
        calc.on_field_change("v1", "5");
        calc.on_field_change("c2", "2");

        let state = calc.on_field_change("c1", "ten");
        let c1 = state.field("c1").unwrap();
        assert_eq!(c1.display_value, "ten");
        assert_eq!(c1.errors.len(), 1);
        assert!(c1.errors[0].contains("not a number"));
        // Previous value and the derived result survive
        assert_eq!(calc.variable("c1").unwrap().raw_value(), Some(10.0));
        assert_eq!(state.field("v2").unwrap().display_value, "25");
        assert!(state.field("v2").unwrap().errors.is_empty());

        let state = calc.on_field_change("c1", "20");
        assert!(state.field("c1").unwrap().errors.is_empty());
        assert_eq!(state.field("v2").unwrap().display_value, "50");
    }

    #[test]
    fn test_blank_input_clears() {
        let mut calc = dilution_calc();
        calc.on_field_change("c1", "10");
        let state = calc.on_field_change("c1", "   ");
        assert_eq!(state.field("c1").unwrap().provenance, Provenance::Empty);
    }

    #[test]
    fn test_unknown_unit_is_field_error() {
        let mut calc = dilution_calc();
        calc.on_field_change("v1", "5");
        let state = calc.on_unit_change("v1", "kg");
        let v1 = state.field("v1").unwrap();
        assert_eq!(v1.unit, "mL");
        assert_eq!(v1.display_value, "5");
        assert!(v1.errors[0].contains("Unknown unit"));

        let state = calc.on_unit_change("v1", "L");
        assert!(state.field("v1").unwrap().errors.is_empty());
        assert_eq!(state.field("v1").unwrap().display_value, "0.005");
    }

    #[test]
    fn test_unknown_field_is_ignored() {
        let mut calc = dilution_calc();
        let before = calc.snapshot();
        assert_eq!(calc.on_field_change("nope", "1"), before);
        assert_eq!(calc.on_unit_change("nope", "L"), before);
        assert_eq!(calc.on_clear_field("nope"), before);
        assert_eq!(calc.solver_runs(), 0);
    }

    #[test]
    fn test_derived_value_follows_unit() {
        let mut calc = dilution_calc();
        calc.on_field_change("c1", "10");
        calc.on_field_change("v1", "5");
        calc.on_field_change("c2", "2");
        let state = calc.on_unit_change("v2", "L");
        let v2 = state.field("v2").unwrap();
        assert_eq!(v2.display_value, "0.025");
        assert_eq!(v2.provenance, Provenance::Derived);
    }

    #[test]
    fn test_clear_all_restores_units() {
        let mut calc = dilution_calc();
        calc.on_field_change("v1", "5");
        calc.on_unit_change("v1", "L");
        calc.on_field_change("c1", "oops");
        let state = calc.on_clear_all();
        for field in &state.fields {
            assert_eq!(field.display_value, "");
            assert_eq!(field.provenance, Provenance::Empty);
            assert!(field.errors.is_empty());
        }
        assert_eq!(state.field("v1").unwrap().unit, "mL");
    }

    #[test]
    fn test_handoff_leaves_a_notice() {
        let defs = vec![
            VariableDef::new("c1", "C1", dim::CONCENTRATION, "M"),
            VariableDef::new("v1", "V1", dim::VOLUME, "mL"),
            VariableDef::new("c2", "C2", dim::CONCENTRATION, "M"),
            VariableDef::new("v2", "V2", dim::VOLUME, "mL"),
        ];
        let groups = vec![
            EquationGroup::new("dilution", "Dilution", Relation::balance("c1", "v1", "c2", "v2"))
                .with_handoff(&["v2", "c2"]),
        ];
        let mut calc = create_calculator(&defs, UnitRegistry::standard(), groups).unwrap();
        calc.on_field_change("c1", "10");
        calc.on_field_change("v1", "5");
        calc.on_field_change("c2", "2");

        // Typing over the computed V2 takes C2 away from the user
        let state = calc.on_field_change("v2", "50");
        let c2 = state.field("c2").unwrap();
        assert_eq!(c2.display_value, "1");
        assert_eq!(c2.provenance, Provenance::Derived);
        assert_eq!(c2.notices, vec![HANDOFF_NOTICE.to_string()]);
        assert!(c2.errors.is_empty());
        assert!(!state.has_errors());
        assert!(state.field("v2").unwrap().notices.is_empty());

        // The notice lasts until the next resolution
        let state = calc.on_unit_change("c2", "mM");
        assert_eq!(state.field("c2").unwrap().notices.len(), 1);
        let state = calc.on_field_change("c1", "20");
        assert!(state.fields.iter().all(|f| f.notices.is_empty()));
    }

    #[test]
    fn test_ui_state_serializes() {
        let mut calc = dilution_calc();
        let state = calc.on_field_change("c1", "10");
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"display_value\":\"10\""));
        let roundtrip: UiState = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, state);

        let older = r#"{"id":"c1","label":"C1","display_value":"10","unit":"M","provenance":"UserSet","errors":[]}"#;
        let field: FieldState = serde_json::from_str(older).unwrap();
        assert!(field.notices.is_empty());
    }
}
