//! # Variable Set
//!
//! The named slots of one calculator. Each [`Variable`] holds a raw value
//! expressed in its *current* display unit, that unit, and a [`Provenance`]
//! tag recording who put the value there.
//!
//! The fields of a variable are private. Every mutation goes through one of
//! the [`VariableSet`] entry points, so a raw number can never drift away
//! from the unit it is expressed in:
//!
//! | Entry point | Provenance afterwards |
//! |-------------|-----------------------|
//! | [`set_value`](VariableSet::set_value) | `UserSet` |
//! | [`set_unit`](VariableSet::set_unit) | unchanged (value re-expressed) |
//! | [`set_derived`](VariableSet::set_derived) | `Derived` |
//! | [`clear`](VariableSet::clear) | `Empty` |
//!
//! ## Example
//!
//! ```rust
//! use calc_core::units::{dim, UnitRegistry};
//! use calc_core::variables::{Provenance, VariableDef, VariableSet};
//!
//! let defs = vec![VariableDef::new("v1", "Stock volume", dim::VOLUME, "mL")];
//! let mut vars = VariableSet::new(UnitRegistry::standard(), &defs).unwrap();
//!
//! vars.set_value("v1", 250.0).unwrap();
//! vars.set_unit("v1", "L").unwrap();
//!
//! let v1 = vars.get("v1").unwrap();
//! assert_eq!(v1.provenance(), Provenance::UserSet);
//! assert!((v1.raw_value().unwrap() - 0.25).abs() < 1e-12);
//! ```

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::units::UnitRegistry;

/// Who produced a variable's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provenance {
    /// No value
    #[default]
    Empty,
    /// Typed by the user
    UserSet,
    /// Computed by the resolution engine
    Derived,
}

/// Static declaration of a calculator slot.
///
/// ## JSON Example
///
/// ```json
/// { "id": "c1", "label": "Stock concentration", "dimension": "concentration", "default_unit": "mM" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    /// Stable identifier used by events and equation groups
    pub id: String,

    /// Label shown next to the input
    pub label: String,

    /// Dimension id in the unit registry
    pub dimension: String,

    /// Unit selected when the calculator starts or is cleared
    pub default_unit: String,
}

impl VariableDef {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        dimension: impl Into<String>,
        default_unit: impl Into<String>,
    ) -> Self {
        VariableDef {
            id: id.into(),
            label: label.into(),
            dimension: dimension.into(),
            default_unit: default_unit.into(),
        }
    }
}

/// Live state of one calculator slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    def: VariableDef,
    raw: Option<f64>,
    unit: String,
    provenance: Provenance,
    /// Text the user typed, echoed back until the unit changes
    input_text: Option<String>,
    /// Variables this value was computed from (Derived only)
    supports: Vec<String>,
}

impl Variable {
    fn new(def: VariableDef) -> Self {
        let unit = def.default_unit.clone();
        Variable {
            def,
            raw: None,
            unit,
            provenance: Provenance::Empty,
            input_text: None,
            supports: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn label(&self) -> &str {
        &self.def.label
    }

    pub fn dimension(&self) -> &str {
        &self.def.dimension
    }

    pub fn default_unit(&self) -> &str {
        &self.def.default_unit
    }

    /// Value expressed in [`unit`](Self::unit)
    pub fn raw_value(&self) -> Option<f64> {
        self.raw
    }

    /// Current display unit
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// True when the slot holds a value
    pub fn is_known(&self) -> bool {
        self.raw.is_some()
    }

    pub fn input_text(&self) -> Option<&str> {
        self.input_text.as_deref()
    }

    /// Ids of the variables a Derived value was computed from
    pub fn supports(&self) -> &[String] {
        &self.supports
    }
}

/// All variables of one calculator plus the registry used to convert them.
#[derive(Debug, Clone)]
pub struct VariableSet {
    registry: UnitRegistry,
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
}

impl VariableSet {
    /// Create the set with every variable `Empty` in its default unit.
    ///
    /// Fails with `UnknownUnit` / `UnknownDimension` if a declaration does
    /// not match the registry, and with `InvalidDefinition` on duplicate ids.
    pub fn new(registry: UnitRegistry, defs: &[VariableDef]) -> CalcResult<Self> {
        if defs.is_empty() {
            return Err(CalcError::invalid_definition("a calculator needs at least one variable"));
        }

        let mut variables = Vec::with_capacity(defs.len());
        let mut index = HashMap::with_capacity(defs.len());
        for def in defs {
            if def.id.trim().is_empty() {
                return Err(CalcError::invalid_definition("variable id must not be empty"));
            }
            registry.unit(&def.dimension, &def.default_unit)?;
            if index.insert(def.id.clone(), variables.len()).is_some() {
                return Err(CalcError::invalid_definition(format!(
                    "variable '{}' is declared twice",
                    def.id
                )));
            }
            variables.push(Variable::new(def.clone()));
        }

        Ok(VariableSet {
            registry,
            variables,
            index,
        })
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Variables in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> CalcResult<&Variable> {
        self.index
            .get(id)
            .map(|&i| &self.variables[i])
            .ok_or_else(|| CalcError::unknown_variable(id))
    }

    fn get_mut(&mut self, id: &str) -> CalcResult<&mut Variable> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.variables[i]),
            None => Err(CalcError::unknown_variable(id)),
        }
    }

    /// Value of a variable converted to its dimension's base unit
    pub fn base_value(&self, id: &str) -> CalcResult<Option<f64>> {
        let var = self.get(id)?;
        match var.raw {
            Some(raw) => Ok(Some(self.registry.to_base(var.dimension(), &var.unit, raw)?)),
            None => Ok(None),
        }
    }

    /// Store a user-entered value in the variable's current unit
    pub fn set_value(&mut self, id: &str, raw: f64) -> CalcResult<()> {
        let var = self.get_mut(id)?;
        var.raw = Some(raw);
        var.provenance = Provenance::UserSet;
        var.input_text = None;
        var.supports.clear();
        Ok(())
    }

    /// [`set_value`](Self::set_value), remembering the typed text for display
    pub fn set_input(&mut self, id: &str, raw: f64, text: impl Into<String>) -> CalcResult<()> {
        self.set_value(id, raw)?;
        self.get_mut(id)?.input_text = Some(text.into());
        Ok(())
    }

    /// Switch the display unit, re-expressing the held value.
    ///
    /// The physical quantity does not change, so provenance is kept.
    pub fn set_unit(&mut self, id: &str, unit: &str) -> CalcResult<()> {
        let (dimension, current) = {
            let var = self.get(id)?;
            (var.dimension().to_string(), var.unit.clone())
        };
        let to = self.registry.unit(&dimension, unit)?.clone();
        let from = self.registry.unit(&dimension, &current)?.clone();

        let var = self.get_mut(id)?;
        var.raw = var.raw.map(|raw| to.from_base(from.to_base(raw)));
        var.unit = to.symbol;
        var.input_text = None;
        Ok(())
    }

    /// Store a solver result expressed in `unit`.
    ///
    /// This is a terminal write: it never triggers any evaluation.
    pub fn set_derived(&mut self, id: &str, raw: f64, unit: &str, supports: Vec<String>) -> CalcResult<()> {
        let dimension = self.get(id)?.dimension().to_string();
        self.registry.unit(&dimension, unit)?;

        let var = self.get_mut(id)?;
        var.raw = Some(raw);
        var.unit = unit.to_string();
        var.provenance = Provenance::Derived;
        var.input_text = None;
        var.supports = supports;
        Ok(())
    }

    /// Store a base-unit solver result in the variable's current unit
    pub fn set_derived_base(&mut self, id: &str, base: f64, supports: Vec<String>) -> CalcResult<()> {
        let var = self.get(id)?;
        let unit = var.unit.clone();
        let raw = self.registry.from_base(var.dimension(), &unit, base)?;
        self.set_derived(id, raw, &unit, supports)
    }

    /// Hand a user-entered value over to the solver without changing it
    pub fn demote(&mut self, id: &str) -> CalcResult<()> {
        let var = self.get_mut(id)?;
        if var.provenance == Provenance::UserSet {
            var.provenance = Provenance::Derived;
            var.input_text = None;
        }
        Ok(())
    }

    /// Remove the value; the unit stays as selected
    pub fn clear(&mut self, id: &str) -> CalcResult<()> {
        let var = self.get_mut(id)?;
        var.raw = None;
        var.provenance = Provenance::Empty;
        var.input_text = None;
        var.supports.clear();
        Ok(())
    }

    /// Clear every variable and restore its default unit
    pub fn reset_all(&mut self) {
        for var in &mut self.variables {
            var.raw = None;
            var.provenance = Provenance::Empty;
            var.input_text = None;
            var.supports.clear();
            var.unit = var.def.default_unit.clone();
        }
    }

    /// Derived variables whose value rests, directly or transitively, on any of `roots`.
    ///
    /// The roots themselves are not included.
    pub fn dependents_of(&self, roots: &[&str]) -> BTreeSet<String> {
        let mut tainted: BTreeSet<String> = roots.iter().map(|r| r.to_string()).collect();
        let mut found = BTreeSet::new();
        loop {
            let mut grew = false;
            for var in &self.variables {
                if var.provenance != Provenance::Derived || tainted.contains(var.id()) {
                    continue;
                }
                if var.supports.iter().any(|s| tainted.contains(s)) {
                    tainted.insert(var.id().to_string());
                    found.insert(var.id().to_string());
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }
        found
    }
}
