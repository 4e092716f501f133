//! # calc_core - Reactive Unit-Aware Equation Solver
//!
//! `calc_core` drives small calculator forms: a handful of related
//! quantities, each shown in a unit the user picks, where filling in enough
//! of them computes the rest. All state and results are JSON-serializable,
//! so a front end only has to forward events and render the returned
//! [`UiState`].
//!
//! ## Design Philosophy
//!
//! - **Event-driven**: four events in, one snapshot out; a unit change never solves
//! - **Base units inside**: every equation works on base-unit values
//! - **Rich Errors**: structured error types shown next to the field they concern
//! - **Data-defined**: unit tables, variables and equation groups are plain values
//!
//! ## Quick Start
//!
//! ```rust
//! use calc_core::catalog::CatalogId;
//!
//! let mut calc = CatalogId::Margin.definition().instantiate().unwrap();
//! calc.on_field_change("cost", "30");
//! let state = calc.on_field_change("revenue", "50");
//!
//! assert_eq!(state.field("profit").unwrap().display_value, "20");
//! assert_eq!(state.field("margin").unwrap().display_value, "40");
//!
//! // Serialize for transmission to a front end
//! let json = serde_json::to_string_pretty(&state).unwrap();
//! assert!(json.contains("\"unit\": \"%\""));
//! ```
//!
//! ## Modules
//!
//! - [`units`] - Unit registry: dimensions, units and base-unit conversion
//! - [`variables`] - Variable set: values, units and provenance
//! - [`equations`] - Equation groups, relation families and constraints
//! - [`engine`] - Resolution engine deciding what to compute after an edit
//! - [`calculator`] - Reactive update controller and public event API
//! - [`format`] - Number parsing and rendering
//! - [`settings`] - Formatting and engine configuration
//! - [`catalog`] - Ready-made calculators and their markdown reference
//! - [`errors`] - Structured error types

pub mod calculator;
pub mod catalog;
pub mod engine;
pub mod equations;
pub mod errors;
pub mod format;
pub mod settings;
pub mod units;
pub mod variables;

// Re-export commonly used types at crate root for convenience
pub use calculator::{create_calculator, CalculatorInstance, FieldState, UiState};
pub use catalog::{CalculatorDefinition, CatalogId};
pub use equations::{Constraint, EquationGroup, Relation};
pub use errors::{CalcError, CalcResult, DomainErrorKind, SingularityKind};
pub use settings::CalculatorSettings;
pub use units::{DimensionTable, UnitDef, UnitRegistry};
pub use variables::{Provenance, VariableDef};
