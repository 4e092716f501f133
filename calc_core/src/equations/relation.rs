//! # Relation Families
//!
//! Closed-form relations between the members of an equation group. A relation
//! knows how to rearrange itself for any one missing member given the others
//! in base units.
//!
//! | Family | Form | Singular when |
//! |--------|------|---------------|
//! | [`Relation::Sum`] | `total = p1 + p2 + ...` | never |
//! | [`Relation::Product`] | `result = f1 * f2 * ...` | a divisor factor is 0 |
//! | [`Relation::Balance`] | `a * b = c * d` | any known operand is 0 |
//! | [`Relation::Custom`] | one fn per member | as the fn reports |
//!
//! A zero operand in a balance collapses the proportion (`0 * b = c * d`
//! says nothing about the ratio the balance expresses), so every known
//! operand acts as a divisor.

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{CalcError, CalcResult};

/// Closed-form solve for one member of a custom relation.
pub type SolveFn = fn(&Knowns) -> CalcResult<f64>;

/// Known member values in base units, keyed by variable id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Knowns {
    values: BTreeMap<String, f64>,
}

impl Knowns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, base_value: f64) {
        self.values.insert(id.into(), base_value);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, id: &str, base_value: f64) -> Self {
        self.insert(id, base_value);
        self
    }

    pub fn remove(&mut self, id: &str) -> Option<f64> {
        self.values.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    /// Value of a member; asking for a member that is not known is a
    /// definition error (a solver reading its own target).
    pub fn get(&self, id: &str) -> CalcResult<f64> {
        self.values
            .get(id)
            .copied()
            .ok_or_else(|| CalcError::invalid_definition(format!("solver read '{}' which is not known", id)))
    }

    pub fn try_get(&self, id: &str) -> Option<f64> {
        self.values.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// `numerator / denominator`, reporting a zero denominator against `target`.
pub fn checked_div(target: &str, numerator: f64, denominator: f64, divisor: &str) -> CalcResult<f64> {
    if denominator == 0.0 {
        return Err(CalcError::division_by_zero(target, divisor));
    }
    Ok(numerator / denominator)
}

/// A closed-form relation between the members of a group.
#[derive(Clone)]
pub enum Relation {
    /// `total = sum(parts)`
    Sum { total: String, parts: Vec<String> },

    /// `result = product(factors)`
    Product { result: String, factors: Vec<String> },

    /// `left[0] * left[1] = right[0] * right[1]`
    Balance { left: [String; 2], right: [String; 2] },

    /// One explicit rearrangement per member, in member order
    Custom(Vec<(String, SolveFn)>),
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Sum { total, parts } => f.debug_struct("Sum").field("total", total).field("parts", parts).finish(),
            Relation::Product { result, factors } => f
                .debug_struct("Product")
                .field("result", result)
                .field("factors", factors)
                .finish(),
            Relation::Balance { left, right } => f.debug_struct("Balance").field("left", left).field("right", right).finish(),
            Relation::Custom(solvers) => f
                .debug_tuple("Custom")
                .field(&solvers.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

impl Relation {
    pub fn sum(total: &str, parts: &[&str]) -> Self {
        Relation::Sum {
            total: total.to_string(),
            parts: parts.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn product(result: &str, factors: &[&str]) -> Self {
        Relation::Product {
            result: result.to_string(),
            factors: factors.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn balance(a: &str, b: &str, c: &str, d: &str) -> Self {
        Relation::Balance {
            left: [a.to_string(), b.to_string()],
            right: [c.to_string(), d.to_string()],
        }
    }

    pub fn custom(solvers: &[(&str, SolveFn)]) -> Self {
        Relation::Custom(solvers.iter().map(|(id, f)| (id.to_string(), *f)).collect())
    }

    /// Member ids in declaration order
    pub fn members(&self) -> Vec<&str> {
        match self {
            Relation::Sum { total, parts } => std::iter::once(total.as_str())
                .chain(parts.iter().map(String::as_str))
                .collect(),
            Relation::Product { result, factors } => std::iter::once(result.as_str())
                .chain(factors.iter().map(String::as_str))
                .collect(),
            Relation::Balance { left, right } => left.iter().chain(right.iter()).map(String::as_str).collect(),
            Relation::Custom(solvers) => solvers.iter().map(|(id, _)| id.as_str()).collect(),
        }
    }

    /// Plain-text form used when a group declares no formula of its own
    pub fn formula(&self) -> String {
        match self {
            Relation::Sum { total, parts } => format!("{} = {}", total, parts.join(" + ")),
            Relation::Product { result, factors } => format!("{} = {}", result, factors.join(" * ")),
            Relation::Balance { left, right } => {
                format!("{} * {} = {} * {}", left[0], left[1], right[0], right[1])
            }
            Relation::Custom(solvers) => format!(
                "closed form in {}",
                solvers.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>().join(", ")
            ),
        }
    }

    /// Solve for `target` from the other members' base values.
    pub fn solve(&self, target: &str, knowns: &Knowns) -> CalcResult<f64> {
        match self {
            Relation::Sum { total, parts } => {
                if target == total {
                    parts
                        .iter()
                        .try_fold(0.0, |acc, p| -> CalcResult<f64> { Ok(acc + knowns.get(p)?) })
                } else {
                    let mut value = knowns.get(total)?;
                    for part in parts.iter().filter(|p| p.as_str() != target) {
                        value -= knowns.get(part)?;
                    }
                    Ok(value)
                }
            }
            Relation::Product { result, factors } => {
                if target == result {
                    factors
                        .iter()
                        .try_fold(1.0, |acc, f| -> CalcResult<f64> { Ok(acc * knowns.get(f)?) })
                } else {
                    let mut divisor = 1.0;
                    for factor in factors.iter().filter(|f| f.as_str() != target) {
                        let value = knowns.get(factor)?;
                        if value == 0.0 {
                            return Err(CalcError::division_by_zero(target, factor));
                        }
                        divisor *= value;
                    }
                    checked_div(target, knowns.get(result)?, divisor, result)
                }
            }
            Relation::Balance { left, right } => {
                for operand in left.iter().chain(right.iter()).filter(|o| o.as_str() != target) {
                    if knowns.get(operand)? == 0.0 {
                        return Err(CalcError::division_by_zero(target, operand));
                    }
                }
                let (same_side, other_side) = if left.iter().any(|m| m == target) {
                    (left, right)
                } else {
                    (right, left)
                };
                let partner = if same_side[0] == target { &same_side[1] } else { &same_side[0] };
                let product = knowns.get(&other_side[0])? * knowns.get(&other_side[1])?;
                checked_div(target, product, knowns.get(partner)?, partner)
            }
            Relation::Custom(solvers) => {
                let (_, solve) = solvers
                    .iter()
                    .find(|(id, _)| id == target)
                    .ok_or_else(|| CalcError::invalid_definition(format!("no rearrangement for '{}'", target)))?;
                solve(knowns)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SingularityKind;

    #[test]
    fn test_sum_rearrangements() {
        let rel = Relation::sum("revenue", &["cost", "profit"]);
        let k = Knowns::new().with("cost", 30.0).with("profit", 20.0);
        assert_eq!(rel.solve("revenue", &k).unwrap(), 50.0);

        let k = Knowns::new().with("revenue", 50.0).with("cost", 30.0);
        assert_eq!(rel.solve("profit", &k).unwrap(), 20.0);
        assert_eq!(rel.members(), vec!["revenue", "cost", "profit"]);
    }

    #[test]
    fn test_product_rearrangements() {
        let rel = Relation::product("v", &["i", "r"]);
        let k = Knowns::new().with("i", 2.0).with("r", 6.0);
        assert_eq!(rel.solve("v", &k).unwrap(), 12.0);

        let k = Knowns::new().with("v", 12.0).with("r", 6.0);
        assert_eq!(rel.solve("i", &k).unwrap(), 2.0);

        let k = Knowns::new().with("v", 12.0).with("r", 0.0);
        match rel.solve("i", &k).unwrap_err() {
            CalcError::Singularity { field, kind, .. } => {
                assert_eq!(field, "i");
                assert_eq!(kind, SingularityKind::DivisionByZero);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_balance_rearrangements() {
        let rel = Relation::balance("c1", "v1", "c2", "v2");
        let k = Knowns::new().with("c1", 10.0).with("v1", 5.0).with("c2", 2.0);
        assert_eq!(rel.solve("v2", &k).unwrap(), 25.0);

        let k = Knowns::new().with("c1", 10.0).with("v1", 5.0).with("v2", 25.0);
        assert_eq!(rel.solve("c2", &k).unwrap(), 2.0);

        let k = Knowns::new().with("c2", 2.0).with("v1", 5.0).with("v2", 25.0);
        assert_eq!(rel.solve("c1", &k).unwrap(), 10.0);
    }

    #[test]
    fn test_balance_zero_operand_is_singular() {
        let rel = Relation::balance("c1", "v1", "c2", "v2");
        let k = Knowns::new().with("c1", 0.0).with("v1", 5.0).with("c2", 2.0);
        let err = rel.solve("v2", &k).unwrap_err();
        assert_eq!(err, CalcError::division_by_zero("v2", "c1"));
    }

    #[test]
    fn test_custom_relation() {
        fn double(k: &Knowns) -> CalcResult<f64> {
            Ok(k.get("a")? * 2.0)
        }
        fn half(k: &Knowns) -> CalcResult<f64> {
            Ok(k.get("b")? / 2.0)
        }
        let rel = Relation::custom(&[("a", half), ("b", double)]);
        assert_eq!(rel.solve("b", &Knowns::new().with("a", 4.0)).unwrap(), 8.0);
        assert_eq!(rel.solve("a", &Knowns::new().with("b", 4.0)).unwrap(), 2.0);
        assert_eq!(rel.solve("c", &Knowns::new()).unwrap_err().error_code(), "INVALID_DEFINITION");
        assert_eq!(format!("{:?}", rel), "Custom([\"a\", \"b\"])");
    }

    #[test]
    fn test_formula_text() {
        assert_eq!(Relation::balance("c1", "v1", "c2", "v2").formula(), "c1 * v1 = c2 * v2");
        assert_eq!(Relation::sum("a", &["z", "n"]).formula(), "a = z + n");
    }
}
