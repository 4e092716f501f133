//! # Domain Constraints
//!
//! Validity predicates attached to an equation group. They are evaluated in
//! base units, first against the known inputs and again against the solved
//! result, and map one-to-one onto [`DomainErrorKind`].

use crate::equations::relation::Knowns;
use crate::errors::{CalcError, CalcResult, DomainErrorKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// `var > 0`
    Positive(String),

    /// `var >= 0`
    NonNegative(String),

    /// `0 <= var <= 1`
    Fraction(String),

    /// `var < limit`
    Below { var: String, limit: f64 },

    /// `var >= other`
    AtLeast { var: String, other: String },
}

impl Constraint {
    pub fn positive(var: &str) -> Self {
        Constraint::Positive(var.to_string())
    }

    pub fn non_negative(var: &str) -> Self {
        Constraint::NonNegative(var.to_string())
    }

    pub fn fraction(var: &str) -> Self {
        Constraint::Fraction(var.to_string())
    }

    pub fn below(var: &str, limit: f64) -> Self {
        Constraint::Below {
            var: var.to_string(),
            limit,
        }
    }

    pub fn at_least(var: &str, other: &str) -> Self {
        Constraint::AtLeast {
            var: var.to_string(),
            other: other.to_string(),
        }
    }

    /// The variable an error is reported against
    pub fn subject(&self) -> &str {
        match self {
            Constraint::Positive(var)
            | Constraint::NonNegative(var)
            | Constraint::Fraction(var)
            | Constraint::Below { var, .. }
            | Constraint::AtLeast { var, .. } => var,
        }
    }

    /// Every variable the predicate reads
    pub fn variables(&self) -> Vec<&str> {
        match self {
            Constraint::AtLeast { var, other } => vec![var.as_str(), other.as_str()],
            _ => vec![self.subject()],
        }
    }

    /// Human-readable statement of the rule
    pub fn describe(&self) -> String {
        match self {
            Constraint::Positive(var) => format!("{} > 0", var),
            Constraint::NonNegative(var) => format!("{} >= 0", var),
            Constraint::Fraction(var) => format!("0 <= {} <= 1", var),
            Constraint::Below { var, limit } => format!("{} < {}", var, limit),
            Constraint::AtLeast { var, other } => format!("{} >= {}", var, other),
        }
    }

    /// Check the predicate. Constraints over values that are not all
    /// present are skipped.
    pub fn check(&self, values: &Knowns) -> CalcResult<()> {
        match self {
            Constraint::Positive(var) => match values.try_get(var) {
                Some(v) if v <= 0.0 => Err(CalcError::domain(var, DomainErrorKind::NonPositive, "must be greater than zero")),
                _ => Ok(()),
            },
            Constraint::NonNegative(var) => match values.try_get(var) {
                Some(v) if v < 0.0 => Err(CalcError::domain(var, DomainErrorKind::Negative, "must not be negative")),
                _ => Ok(()),
            },
            Constraint::Fraction(var) => match values.try_get(var) {
                Some(v) if !(0.0..=1.0).contains(&v) => Err(CalcError::domain(
                    var,
                    DomainErrorKind::OutOfRange,
                    "must lie between 0 and 1 (0 % to 100 %)",
                )),
                _ => Ok(()),
            },
            Constraint::Below { var, limit } => match values.try_get(var) {
                Some(v) if v >= *limit => Err(CalcError::domain(
                    var,
                    DomainErrorKind::RatioExceeded,
                    format!("must be below {}", limit),
                )),
                _ => Ok(()),
            },
            Constraint::AtLeast { var, other } => match (values.try_get(var), values.try_get(other)) {
                (Some(v), Some(o)) if v < o => Err(CalcError::domain(
                    var,
                    DomainErrorKind::OrderingViolated,
                    format!("must not be less than '{}'", other),
                )),
                _ => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(result: CalcResult<()>) -> Option<DomainErrorKind> {
        match result {
            Err(CalcError::DomainError { kind, .. }) => Some(kind),
            _ => None,
        }
    }

    #[test]
    fn test_sign_constraints() {
        let k = Knowns::new().with("t", 0.0).with("m", -1.0);
        assert_eq!(kind_of(Constraint::positive("t").check(&k)), Some(DomainErrorKind::NonPositive));
        assert_eq!(kind_of(Constraint::non_negative("t").check(&k)), None);
        assert_eq!(kind_of(Constraint::non_negative("m").check(&k)), Some(DomainErrorKind::Negative));
    }

    #[test]
    fn test_ratio_constraints() {
        let k = Knowns::new().with("p", 1.2).with("margin", 1.0);
        assert_eq!(kind_of(Constraint::fraction("p").check(&k)), Some(DomainErrorKind::OutOfRange));
        assert_eq!(kind_of(Constraint::below("margin", 1.0).check(&k)), Some(DomainErrorKind::RatioExceeded));
        assert_eq!(kind_of(Constraint::below("margin", 1.5).check(&k)), None);
    }

    #[test]
    fn test_ordering_constraint() {
        let rule = Constraint::at_least("a", "z");
        assert_eq!(
            kind_of(rule.check(&Knowns::new().with("a", 6.0).with("z", 8.0))),
            Some(DomainErrorKind::OrderingViolated)
        );
        assert_eq!(kind_of(rule.check(&Knowns::new().with("a", 12.0).with("z", 6.0))), None);
        // Skipped while one side is unknown
        assert_eq!(kind_of(rule.check(&Knowns::new().with("a", 1.0))), None);
        assert_eq!(rule.variables(), vec!["a", "z"]);
    }

    #[test]
    fn test_missing_value_is_skipped() {
        assert!(Constraint::positive("x").check(&Knowns::new()).is_ok());
    }
}
