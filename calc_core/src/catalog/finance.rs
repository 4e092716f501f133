//! Finance calculators.

use std::f64::consts::LN_2;

use super::{CalculatorDefinition, CatalogCategory, CatalogId};
use crate::equations::{checked_div, Constraint, EquationGroup, Knowns, Relation};
use crate::errors::CalcResult;
use crate::units::{dim, SECONDS_PER_YEAR};
use crate::variables::VariableDef;

// ============================================================================
// Margin
// ============================================================================

fn revenue_from_margin(k: &Knowns) -> CalcResult<f64> {
    checked_div("revenue", k.get("cost")?, 1.0 - k.get("margin")?, "margin")
}

fn margin_from_cost(k: &Knowns) -> CalcResult<f64> {
    Ok(1.0 - checked_div("margin", k.get("cost")?, k.get("revenue")?, "revenue")?)
}

fn cost_from_margin(k: &Knowns) -> CalcResult<f64> {
    Ok(k.get("revenue")? * (1.0 - k.get("margin")?))
}

/// Cost, revenue, profit and margin on revenue
///
/// Three groups share the four fields: `revenue = cost + profit`,
/// `profit = margin * revenue`, and the cost/margin form that relates the
/// two without going through profit. All three hand `revenue` back to the
/// solver when the user overrides a computed field.
pub(super) fn margin() -> CalculatorDefinition {
    CalculatorDefinition {
        id: CatalogId::Margin,
        name: "Profit Margin",
        description: "Gross profit and margin on revenue from any two of cost, revenue, profit and margin.",
        category: CatalogCategory::Finance,
        variables: vec![
            VariableDef::new("cost", "Cost", dim::MONEY, "¤"),
            VariableDef::new("revenue", "Revenue", dim::MONEY, "¤"),
            VariableDef::new("profit", "Profit", dim::MONEY, "¤"),
            VariableDef::new("margin", "Margin", dim::RATIO, "%"),
        ],
        groups: vec![
            EquationGroup::new("profit", "Profit", Relation::sum("revenue", &["cost", "profit"]))
                .with_formula("revenue = cost + profit")
                .with_constraint(Constraint::non_negative("cost"))
                .with_handoff(&["revenue"]),
            EquationGroup::new("margin", "Margin", Relation::product("profit", &["margin", "revenue"]))
                .with_formula("profit = margin * revenue")
                .with_constraint(Constraint::positive("revenue"))
                .with_handoff(&["revenue"]),
            EquationGroup::new(
                "markup",
                "Price from cost",
                Relation::custom(&[
                    ("cost", cost_from_margin),
                    ("revenue", revenue_from_margin),
                    ("margin", margin_from_cost),
                ]),
            )
            .with_formula("revenue = cost / (1 - margin)")
            .with_constraint(Constraint::below("margin", 1.0))
            .with_constraint(Constraint::positive("revenue"))
            .with_constraint(Constraint::non_negative("cost"))
            .with_handoff(&["revenue"]),
        ],
    }
}

// ============================================================================
// Doubling time
// ============================================================================

fn doubling_from_rate(k: &Knowns) -> CalcResult<f64> {
    let rate = k.get("rate")?;
    checked_div("doubling", SECONDS_PER_YEAR * LN_2, rate.ln_1p(), "rate")
}

fn rate_from_doubling(k: &Knowns) -> CalcResult<f64> {
    let years = checked_div("rate", SECONDS_PER_YEAR, k.get("doubling")?, "doubling")?;
    Ok((LN_2 * years).exp_m1())
}

/// Time for a quantity to double at a compound annual growth rate
pub(super) fn doubling_time() -> CalculatorDefinition {
    CalculatorDefinition {
        id: CatalogId::DoublingTime,
        name: "Doubling Time",
        description: "Years to double at a compound annual rate, or the rate that doubles in a given time.",
        category: CatalogCategory::Finance,
        variables: vec![
            VariableDef::new("rate", "Annual growth rate", dim::RATIO, "%"),
            VariableDef::new("doubling", "Doubling time", dim::TIME, "yr"),
        ],
        groups: vec![
            EquationGroup::new(
                "doubling",
                "Doubling time",
                Relation::custom(&[("rate", rate_from_doubling), ("doubling", doubling_from_rate)]),
            )
            .with_formula("T = ln 2 / ln(1 + r)")
            .with_constraint(Constraint::positive("rate"))
            .with_constraint(Constraint::positive("doubling"))
            .with_handoff(&["doubling", "rate"]),
        ],
    }
}
