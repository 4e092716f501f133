//! # Resolution Engine
//!
//! Decides, after each value edit or clear, which member of each equation
//! group to compute, runs the rearrangement in base units, and writes the
//! result back as a `Derived` value.
//!
//! ## Algorithm
//!
//! 1. Derived values that rest (transitively) on the edited variable are
//!    marked *stale* and treated as unknown for this event.
//! 2. If the user overwrote a value the engine had computed and a group that
//!    contains it is now entirely user-entered, the group's handoff
//!    preference names a member to recompute instead (it becomes stale).
//! 3. Groups touched by the event are evaluated in declaration order:
//!    - more than one unknown: `Underdetermined`
//!    - exactly one unknown: solve it
//!    - none unknown: recompute the single Derived member not yet settled in
//!      this event; if every member is user-entered the group is
//!      `Overdetermined` and nothing is overwritten. With nothing to
//!      recompute, members that contradict the relation also make the group
//!      `Overdetermined`.
//! 4. Step 3 repeats until a pass makes no progress, so a value computed by
//!    a later group can complete an earlier one.
//! 5. Stale values that could not be recomputed are cleared when the event
//!    was a clear, and kept as they were otherwise.
//!
//! Writing a result never triggers another evaluation; the pass loop above
//! is the only driver.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::equations::{EquationGroup, Knowns};
use crate::errors::{CalcError, DomainErrorKind, SingularityKind};
use crate::settings::EngineSettings;
use crate::variables::{Provenance, VariableSet};

/// Result of evaluating one group for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome")]
pub enum SolveOutcome {
    /// `target` was computed; `base_value` is in base units
    Solved { target: String, base_value: f64 },

    /// Every member is known and nothing needed recomputing
    Satisfied,

    /// Fewer than k-1 members are known
    Underdetermined,

    /// All members are user-entered, or the filled members contradict the
    /// relation; no value was overwritten
    Overdetermined,

    /// An input or the result violated a constraint
    DomainError {
        field: String,
        kind: DomainErrorKind,
        message: String,
    },

    /// The rearrangement for `field` is undefined for these inputs
    Singularity {
        field: String,
        kind: SingularityKind,
        message: String,
    },
}

impl SolveOutcome {
    fn from_error(err: CalcError) -> Self {
        match err {
            CalcError::DomainError { field, kind, message } => SolveOutcome::DomainError { field, kind, message },
            CalcError::Singularity { field, kind, message } => SolveOutcome::Singularity { field, kind, message },
            other => {
                // Definition problems are caught at construction; reaching
                // here means a custom solver misread its inputs.
                warn!(error = %other, "solver failed outside its declared error domain");
                SolveOutcome::Underdetermined
            }
        }
    }

    /// The error to show the user, if this outcome is one
    pub fn to_error(&self, group: &str) -> Option<CalcError> {
        match self {
            SolveOutcome::Overdetermined => Some(CalcError::overdetermined(group)),
            SolveOutcome::DomainError { field, kind, message } => Some(CalcError::domain(field, *kind, message)),
            SolveOutcome::Singularity { field, kind, message } => Some(CalcError::Singularity {
                field: field.clone(),
                kind: *kind,
                message: message.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SolveOutcome::Overdetermined | SolveOutcome::DomainError { .. } | SolveOutcome::Singularity { .. }
        )
    }
}

/// Outcome of one group, tagged with the group id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReport {
    pub group: String,
    pub outcome: SolveOutcome,
}

/// The change that triggered a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit<'a> {
    /// A new user value; `was_derived` records the provenance it replaced
    Value { id: &'a str, was_derived: bool },
    /// The field was emptied
    Cleared { id: &'a str },
}

impl<'a> Edit<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            Edit::Value { id, .. } | Edit::Cleared { id } => id,
        }
    }
}

/// Everything one resolution did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Last meaningful outcome of every group the event touched, in declaration order
    pub reports: Vec<GroupReport>,
    /// Evaluation passes used
    pub passes: usize,
    /// Variables written with a new Derived value
    pub derived: Vec<String>,
    /// Variables emptied as a consequence of the event
    pub cleared: Vec<String>,
    /// Variables handed from the user back to the solver
    pub handed_off: Vec<String>,
}

impl Resolution {
    pub fn outcome(&self, group: &str) -> Option<&SolveOutcome> {
        self.reports.iter().find(|r| r.group == group).map(|r| &r.outcome)
    }
}

/// Working state of one resolution
struct Pass<'e> {
    edited: &'e str,
    stale: BTreeSet<String>,
    settled: BTreeSet<String>,
    touched: BTreeSet<String>,
}

/// The solver: equation groups in declaration order plus limits.
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    groups: Vec<EquationGroup>,
    settings: EngineSettings,
}

impl ResolutionEngine {
    pub fn new(groups: Vec<EquationGroup>, settings: EngineSettings) -> Self {
        ResolutionEngine { groups, settings }
    }

    pub fn groups(&self) -> &[EquationGroup] {
        &self.groups
    }

    /// Groups that list `id` as a member
    pub fn groups_containing<'s>(&'s self, id: &'s str) -> impl Iterator<Item = &'s EquationGroup> + 's {
        self.groups.iter().filter(move |g| g.contains(id))
    }

    /// Run the algorithm for one edit. The variable itself must already
    /// hold its new value (or be cleared).
    pub fn resolve(&self, vars: &mut VariableSet, edit: Edit<'_>) -> Resolution {
        let edited = edit.id();
        let mut resolution = Resolution::default();

        let mut pass = Pass {
            edited,
            stale: vars.dependents_of(&[edited]),
            settled: BTreeSet::new(),
            touched: BTreeSet::new(),
        };
        if let Edit::Value { .. } = edit {
            pass.settled.insert(edited.to_string());
        }

        if let Edit::Value { was_derived: true, .. } = edit {
            self.hand_off(vars, &mut pass, &mut resolution);
        }

        pass.touched.insert(edited.to_string());
        pass.touched.extend(pass.stale.iter().cloned());
        trace!(edited, stale = ?pass.stale, "resolution started");

        let mut reports: BTreeMap<usize, SolveOutcome> = BTreeMap::new();
        for _ in 0..self.settings.max_passes {
            resolution.passes += 1;
            let mut progress = false;

            for (index, group) in self.groups.iter().enumerate() {
                if !group.members().iter().any(|m| pass.touched.contains(*m)) {
                    continue;
                }

                let outcome = self.evaluate(group, vars, &mut pass, &mut resolution);
                if let SolveOutcome::Solved { target, .. } = &outcome {
                    pass.touched.insert(target.clone());
                    progress = true;
                }

                let keep_previous = matches!(
                    (reports.get(&index), &outcome),
                    (Some(SolveOutcome::Solved { .. }), SolveOutcome::Satisfied)
                );
                if !keep_previous {
                    reports.insert(index, outcome);
                }
            }

            if !progress {
                break;
            }
        }

        // Leftover stale values: a clear takes its dependents with it
        let leftovers: Vec<String> = pass.stale.iter().cloned().collect();
        for id in leftovers {
            if matches!(edit, Edit::Cleared { .. }) {
                if vars.clear(&id).is_ok() {
                    debug!(variable = %id, "cleared with its support");
                    resolution.cleared.push(id);
                }
            } else {
                trace!(variable = %id, "stale value kept");
            }
        }

        resolution.reports = reports
            .into_iter()
            .map(|(index, outcome)| GroupReport {
                group: self.groups[index].id.clone(),
                outcome,
            })
            .collect();

        for report in &resolution.reports {
            match &report.outcome {
                SolveOutcome::Overdetermined => warn!(group = %report.group, edited, "group is overdetermined"),
                SolveOutcome::DomainError { field, kind, .. } => {
                    warn!(group = %report.group, field = %field, kind = %kind, "domain violation")
                }
                SolveOutcome::Singularity { field, kind, .. } => {
                    warn!(group = %report.group, field = %field, kind = %kind, "singular rearrangement")
                }
                outcome => debug!(group = %report.group, ?outcome, "group evaluated"),
            }
        }
        resolution
    }

    /// Give an all-user group a member to recompute after the user
    /// overwrote a computed value.
    fn hand_off(&self, vars: &mut VariableSet, pass: &mut Pass<'_>, resolution: &mut Resolution) {
        for group in self.groups_containing(pass.edited) {
            let all_user = group.members().iter().all(|m| {
                vars.get(m)
                    .map(|v| v.is_known() && v.provenance() == Provenance::UserSet)
                    .unwrap_or(false)
            });
            if !all_user {
                continue;
            }

            let candidate = group
                .handoff_candidate(pass.edited, |m| {
                    vars.get(m).map(|v| v.provenance() == Provenance::UserSet).unwrap_or(false)
                })
                .map(str::to_string);

            if let Some(candidate) = candidate {
                if vars.demote(&candidate).is_ok() {
                    debug!(group = %group.id, variable = %candidate, "handed back to the solver");
                    pass.stale.extend(vars.dependents_of(&[candidate.as_str()]));
                    pass.stale.insert(candidate.clone());
                    resolution.handed_off.push(candidate);
                }
            }
        }
    }

    fn evaluate(
        &self,
        group: &EquationGroup,
        vars: &mut VariableSet,
        pass: &mut Pass<'_>,
        resolution: &mut Resolution,
    ) -> SolveOutcome {
        let members = group.members();
        let mut knowns = Knowns::new();
        let mut unknown = Vec::new();
        for &member in &members {
            match vars.base_value(member) {
                Ok(Some(value)) if !pass.stale.contains(member) => knowns.insert(member, value),
                Ok(_) => unknown.push(member),
                Err(err) => return SolveOutcome::from_error(err),
            }
        }

        if let Err(err) = group.check_inputs(&knowns) {
            return SolveOutcome::from_error(err);
        }

        let target = match unknown.len() {
            1 => unknown[0],
            0 => {
                let unsettled: Vec<&str> = members
                    .iter()
                    .copied()
                    .filter(|m| {
                        !pass.settled.contains(*m)
                            && vars.get(m).map(|v| v.provenance() == Provenance::Derived).unwrap_or(false)
                    })
                    .collect();
                match unsettled.len() {
                    1 => {
                        knowns.remove(unsettled[0]);
                        unsettled[0]
                    }
                    0 => {
                        let all_user = members
                            .iter()
                            .all(|m| vars.get(m).map(|v| v.provenance() == Provenance::UserSet).unwrap_or(false));
                        if all_user && group.contains(pass.edited) {
                            return SolveOutcome::Overdetermined;
                        }
                        return Self::check_agreement(group, &knowns);
                    }
                    // Several computed members with no unique victim: leave them
                    _ => return Self::check_agreement(group, &knowns),
                }
            }
            _ => return SolveOutcome::Underdetermined,
        };

        match group.solve(target, &knowns) {
            Ok(base_value) => {
                let supports: Vec<String> = knowns.ids().map(str::to_string).collect();
                if let Err(err) = vars.set_derived_base(target, base_value, supports) {
                    return SolveOutcome::from_error(err);
                }
                trace!(group = %group.id, target, base_value, "solved");
                pass.stale.remove(target);
                pass.settled.insert(target.to_string());
                resolution.derived.push(target.to_string());
                SolveOutcome::Solved {
                    target: target.to_string(),
                    base_value,
                }
            }
            // The target keeps whatever it held; the outcome carries the error
            Err(err) => SolveOutcome::from_error(err),
        }
    }

    /// A filled group with nothing left to recompute must still satisfy its relation
    fn check_agreement(group: &EquationGroup, knowns: &Knowns) -> SolveOutcome {
        if group.is_consistent(knowns) {
            SolveOutcome::Satisfied
        } else {
            debug!(group = %group.id, "filled members contradict the relation");
            SolveOutcome::Overdetermined
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equations::{Constraint, Relation};
    use crate::units::{dim, UnitRegistry};
    use crate::variables::VariableDef;

    fn dilution() -> (VariableSet, ResolutionEngine) {
        let defs = vec![
            VariableDef::new("c1", "C1", dim::CONCENTRATION, "M"),
            VariableDef::new("v1", "V1", dim::VOLUME, "L"),
            VariableDef::new("c2", "C2", dim::CONCENTRATION, "M"),
            VariableDef::new("v2", "V2", dim::VOLUME, "L"),
        ];
        let vars = VariableSet::new(UnitRegistry::standard(), &defs).unwrap();
        let group = EquationGroup::new("dilution", "Dilution", Relation::balance("c1", "v1", "c2", "v2"))
            .with_constraint(Constraint::non_negative("v1"));
        (vars, ResolutionEngine::new(vec![group], EngineSettings::default()))
    }

    fn set(vars: &mut VariableSet, engine: &ResolutionEngine, id: &str, value: f64) -> Resolution {
        let was_derived = vars.get(id).unwrap().provenance() == Provenance::Derived;
        vars.set_value(id, value).unwrap();
        engine.resolve(vars, Edit::Value { id, was_derived })
    }

    #[test]
    fn test_underdetermined_then_solved() {
        let (mut vars, engine) = dilution();
        let r = set(&mut vars, &engine, "c1", 10.0);
        assert_eq!(r.outcome("dilution"), Some(&SolveOutcome::Underdetermined));
        set(&mut vars, &engine, "v1", 5.0);
        let r = set(&mut vars, &engine, "c2", 2.0);

        assert_eq!(
            r.outcome("dilution"),
            Some(&SolveOutcome::Solved {
                target: "v2".to_string(),
                base_value: 25.0
            })
        );
        assert_eq!(vars.get("v2").unwrap().provenance(), Provenance::Derived);
        assert_eq!(r.derived, vec!["v2".to_string()]);
    }

    #[test]
    fn test_edit_recomputes_stale_dependent() {
        let (mut vars, engine) = dilution();
        set(&mut vars, &engine, "c1", 10.0);
        set(&mut vars, &engine, "v1", 5.0);
        set(&mut vars, &engine, "c2", 2.0);
        set(&mut vars, &engine, "c1", 4.0);
        assert_eq!(vars.get("v2").unwrap().raw_value(), Some(10.0));
    }

    #[test]
    fn test_clear_cascades() {
        let (mut vars, engine) = dilution();
        set(&mut vars, &engine, "c1", 10.0);
        set(&mut vars, &engine, "v1", 5.0);
        set(&mut vars, &engine, "c2", 2.0);

        vars.clear("c1").unwrap();
        let r = engine.resolve(&mut vars, Edit::Cleared { id: "c1" });
        assert_eq!(r.cleared, vec!["v2".to_string()]);
        assert_eq!(r.outcome("dilution"), Some(&SolveOutcome::Underdetermined));
        assert!(!vars.get("v2").unwrap().is_known());
    }

    #[test]
    fn test_domain_error_on_input() {
        let (mut vars, engine) = dilution();
        let r = set(&mut vars, &engine, "v1", -5.0);
        match r.outcome("dilution") {
            Some(SolveOutcome::DomainError { field, kind, .. }) => {
                assert_eq!(field, "v1");
                assert_eq!(*kind, DomainErrorKind::Negative);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_overdetermined_leaves_values() {
        let (mut vars, engine) = dilution();
        for (id, value) in [("c1", 10.0), ("v1", 5.0), ("c2", 2.0), ("v2", 30.0)] {
            vars.set_value(id, value).unwrap();
        }
        let r = set(&mut vars, &engine, "c1", 12.0);
        assert_eq!(r.outcome("dilution"), Some(&SolveOutcome::Overdetermined));
        assert_eq!(vars.get("v2").unwrap().raw_value(), Some(30.0));
        assert!(r.derived.is_empty());
    }

    #[test]
    fn test_handoff_after_override() {
        let (vars, _) = dilution();
        let group = EquationGroup::new("dilution", "Dilution", Relation::balance("c1", "v1", "c2", "v2"))
            .with_handoff(&["v2", "c2"]);
        let engine = ResolutionEngine::new(vec![group], EngineSettings::default());
        let mut vars = vars;

        set(&mut vars, &engine, "c1", 10.0);
        set(&mut vars, &engine, "v1", 5.0);
        set(&mut vars, &engine, "c2", 2.0);
        // Override the computed V2: C2 is recomputed instead
        let r = set(&mut vars, &engine, "v2", 50.0);
        assert_eq!(r.handed_off, vec!["c2".to_string()]);
        assert_eq!(vars.get("c2").unwrap().raw_value(), Some(1.0));
        assert_eq!(vars.get("c2").unwrap().provenance(), Provenance::Derived);
        assert_eq!(vars.get("v2").unwrap().provenance(), Provenance::UserSet);
    }

    #[test]
    fn test_singular_solve_keeps_previous_value() {
        let (mut vars, engine) = dilution();
        set(&mut vars, &engine, "c1", 10.0);
        set(&mut vars, &engine, "v1", 5.0);
        set(&mut vars, &engine, "c2", 2.0);
        let r = set(&mut vars, &engine, "c1", 0.0);
        match r.outcome("dilution") {
            Some(SolveOutcome::Singularity { field, kind, .. }) => {
                assert_eq!(field, "v2");
                assert_eq!(*kind, SingularityKind::DivisionByZero);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(vars.get("v2").unwrap().raw_value(), Some(25.0));
        assert!(r.cleared.is_empty());
    }

    #[test]
    fn test_contradiction_in_filled_group_is_overdetermined() {
        let defs = vec![
            VariableDef::new("cost", "Cost", dim::MONEY, "¤"),
            VariableDef::new("revenue", "Revenue", dim::MONEY, "¤"),
            VariableDef::new("profit", "Profit", dim::MONEY, "¤"),
            VariableDef::new("margin", "Margin", dim::RATIO, "%"),
        ];
        let mut vars = VariableSet::new(UnitRegistry::standard(), &defs).unwrap();
        let engine = ResolutionEngine::new(
            vec![
                EquationGroup::new("profit", "Profit", Relation::sum("revenue", &["cost", "profit"])),
                EquationGroup::new("margin", "Margin", Relation::product("profit", &["margin", "revenue"])),
            ],
            EngineSettings::default(),
        );

        set(&mut vars, &engine, "cost", 30.0);
        set(&mut vars, &engine, "profit", 20.0);
        assert_eq!(vars.get("revenue").unwrap().raw_value(), Some(50.0));

        // The margin group recomputes revenue as 40, which the profit group
        // cannot accept: 30 + 20 != 40
        let r = set(&mut vars, &engine, "margin", 50.0);
        assert_eq!(vars.get("revenue").unwrap().raw_value(), Some(40.0));
        assert_eq!(r.outcome("profit"), Some(&SolveOutcome::Overdetermined));
        assert_eq!(vars.get("cost").unwrap().raw_value(), Some(30.0));
        assert_eq!(vars.get("profit").unwrap().raw_value(), Some(20.0));
    }

    #[test]
    fn test_pass_limit_respected() {
        let (mut vars, engine) = dilution();
        let r = set(&mut vars, &engine, "c1", 1.0);
        assert!(r.passes >= 1 && r.passes <= EngineSettings::default().max_passes);
    }
}
