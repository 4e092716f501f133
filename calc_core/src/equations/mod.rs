//! # Equation Groups
//!
//! An [`EquationGroup`] ties k calculator variables together with one
//! closed-form [`Relation`], the domain [`Constraint`]s its members must
//! respect, and an optional handoff preference used when the user overrides
//! a computed member.
//!
//! Given any k-1 members in base units, [`EquationGroup::solve`] produces the
//! k-th, or reports why it cannot (singularity, domain violation).
//!
//! ## Modules
//!
//! - [`relation`] - relation families and their rearrangements
//! - [`constraint`] - validity predicates
//!
//! ## Example
//!
//! ```rust
//! use calc_core::equations::{Constraint, EquationGroup, Knowns, Relation};
//!
//! let dilution = EquationGroup::new("dilution", "Dilution", Relation::balance("c1", "v1", "c2", "v2"))
//!     .with_formula("C1 * V1 = C2 * V2")
//!     .with_constraint(Constraint::non_negative("v1"));
//!
//! let knowns = Knowns::new().with("c1", 10.0).with("v1", 5.0).with("c2", 2.0);
//! assert_eq!(dilution.solve("v2", &knowns).unwrap(), 25.0);
//! ```

pub mod constraint;
pub mod relation;

pub use constraint::Constraint;
pub use relation::{checked_div, Knowns, Relation, SolveFn};

use std::collections::HashSet;

use crate::errors::{CalcError, CalcResult, DomainErrorKind};
use crate::variables::VariableSet;

/// Relative tolerance used when checking that known members agree
pub const CONSISTENCY_TOLERANCE: f64 = 1e-9;

/// A set of mutually constrained variables plus the closed-form solves relating them.
#[derive(Debug, Clone)]
pub struct EquationGroup {
    /// Stable identifier
    pub id: String,

    /// Display name
    pub label: String,

    /// Formula as shown to users
    pub formula: String,

    relation: Relation,
    constraints: Vec<Constraint>,
    handoff: Vec<String>,
}

impl EquationGroup {
    pub fn new(id: impl Into<String>, label: impl Into<String>, relation: Relation) -> Self {
        EquationGroup {
            id: id.into(),
            label: label.into(),
            formula: relation.formula(),
            relation,
            constraints: Vec::new(),
            handoff: Vec::new(),
        }
    }

    /// Builder: replace the generated formula text
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = formula.into();
        self
    }

    /// Builder: add a domain constraint
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Builder: members to hand back to the solver, in order of preference,
    /// when the user overrides a computed member and every member ends up
    /// user-entered.
    pub fn with_handoff(mut self, preference: &[&str]) -> Self {
        self.handoff = preference.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn handoff(&self) -> &[String] {
        &self.handoff
    }

    /// Member ids in declaration order
    pub fn members(&self) -> Vec<&str> {
        self.relation.members()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members().contains(&id)
    }

    /// Check the known inputs against every applicable constraint
    pub fn check_inputs(&self, knowns: &Knowns) -> CalcResult<()> {
        self.constraints.iter().try_for_each(|c| c.check(knowns))
    }

    /// Solve for `target` in base units and validate the result.
    pub fn solve(&self, target: &str, knowns: &Knowns) -> CalcResult<f64> {
        let value = self.relation.solve(target, knowns)?;
        if !value.is_finite() {
            return Err(CalcError::domain(
                target,
                DomainErrorKind::OutOfRange,
                "result is not a finite number",
            ));
        }

        let mut with_result = knowns.clone();
        with_result.insert(target, value);
        self.check_inputs(&with_result)?;
        Ok(value)
    }

    /// Whether fully known members satisfy the relation.
    ///
    /// Each member in turn is solved from the others and compared with the
    /// value it holds; the first member with a defined rearrangement decides.
    /// The tolerance is relative to the largest magnitude among the members.
    /// If no member can be solved the group is taken as consistent.
    pub fn is_consistent(&self, knowns: &Knowns) -> bool {
        let scale = knowns
            .ids()
            .filter_map(|id| knowns.try_get(id))
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));

        for member in self.members() {
            let actual = match knowns.try_get(member) {
                Some(value) => value,
                None => return true,
            };
            let mut others = knowns.clone();
            others.remove(member);
            if let Ok(expected) = self.relation.solve(member, &others) {
                let tolerance = CONSISTENCY_TOLERANCE * scale.max(expected.abs());
                return (expected - actual).abs() <= tolerance;
            }
        }
        true
    }

    /// First preferred member, other than `edited`, accepted by `eligible`
    pub fn handoff_candidate(&self, edited: &str, eligible: impl Fn(&str) -> bool) -> Option<&str> {
        self.handoff
            .iter()
            .map(String::as_str)
            .find(|&m| m != edited && eligible(m))
    }

    /// Check the group against the variables of a calculator.
    pub fn validate(&self, variables: &VariableSet) -> CalcResult<()> {
        let members = self.members();
        if members.len() < 2 {
            return Err(CalcError::invalid_definition(format!(
                "group '{}' needs at least two members",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for member in &members {
            if !seen.insert(*member) {
                return Err(CalcError::invalid_definition(format!(
                    "group '{}' lists '{}' twice",
                    self.id, member
                )));
            }
            variables.get(member)?;
        }

        let referenced = self
            .constraints
            .iter()
            .flat_map(|c| c.variables())
            .chain(self.handoff.iter().map(String::as_str));
        for id in referenced {
            if !seen.contains(id) {
                return Err(CalcError::invalid_definition(format!(
                    "group '{}' refers to '{}' which is not one of its members",
                    self.id, id
                )));
            }
        }
        Ok(())
    }
}
