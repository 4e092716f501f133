//! # Calculator Catalog
//!
//! Ready-made calculator definitions. Each entry bundles its variables (with
//! dimensions and default units) and its equation groups, and can be turned
//! into a live [`CalculatorInstance`] with [`CalculatorDefinition::instantiate`].
//!
//! ## Usage
//!
//! ```rust
//! use calc_core::catalog::CatalogId;
//!
//! let mut calc = CatalogId::Speed.definition().instantiate().unwrap();
//! calc.on_field_change("speed", "60");
//! let state = calc.on_field_change("time", "2");
//! assert_eq!(state.field("distance").unwrap().display_value, "120");
//!
//! assert_eq!(CatalogId::from_slug("dilution"), Some(CatalogId::Dilution));
//! ```

mod chemistry;
mod finance;
mod physics;
pub mod reference;

pub use reference::generate_catalog_markdown;

use serde::{Deserialize, Serialize};

use crate::calculator::CalculatorInstance;
use crate::equations::EquationGroup;
use crate::errors::CalcResult;
use crate::settings::CalculatorSettings;
use crate::units::UnitRegistry;
use crate::variables::VariableDef;

// ============================================================================
// Categories
// ============================================================================

/// Sections of the catalog reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogCategory {
    Chemistry,
    Finance,
    Physics,
}

impl CatalogCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            CatalogCategory::Chemistry => "Chemistry",
            CatalogCategory::Finance => "Finance",
            CatalogCategory::Physics => "Physics",
        }
    }

    pub fn all() -> [CatalogCategory; 3] {
        [CatalogCategory::Chemistry, CatalogCategory::Finance, CatalogCategory::Physics]
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// Everything needed to build one calculator.
#[derive(Debug, Clone)]
pub struct CalculatorDefinition {
    pub id: CatalogId,
    pub name: &'static str,
    pub description: &'static str,
    pub category: CatalogCategory,
    pub variables: Vec<VariableDef>,
    pub groups: Vec<EquationGroup>,
}

impl CalculatorDefinition {
    /// Build a calculator over the standard unit registry
    pub fn instantiate(&self) -> CalcResult<CalculatorInstance> {
        self.instantiate_with(CalculatorSettings::default())
    }

    pub fn instantiate_with(&self, settings: CalculatorSettings) -> CalcResult<CalculatorInstance> {
        CalculatorInstance::new(&self.variables, UnitRegistry::standard(), self.groups.clone(), settings)
    }
}

/// Identifier of a built-in calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogId {
    Dilution,
    CharlesLaw,
    Nucleons,
    Margin,
    DoublingTime,
    OhmsLaw,
    Density,
    Speed,
}

impl CatalogId {
    pub fn all() -> &'static [CatalogId] {
        &[
            CatalogId::Dilution,
            CatalogId::CharlesLaw,
            CatalogId::Nucleons,
            CatalogId::Margin,
            CatalogId::DoublingTime,
            CatalogId::OhmsLaw,
            CatalogId::Density,
            CatalogId::Speed,
        ]
    }

    /// Command-line name
    pub fn slug(&self) -> &'static str {
        match self {
            CatalogId::Dilution => "dilution",
            CatalogId::CharlesLaw => "charles-law",
            CatalogId::Nucleons => "nucleons",
            CatalogId::Margin => "margin",
            CatalogId::DoublingTime => "doubling-time",
            CatalogId::OhmsLaw => "ohms-law",
            CatalogId::Density => "density",
            CatalogId::Speed => "speed",
        }
    }

    pub fn from_slug(slug: &str) -> Option<CatalogId> {
        let slug = slug.trim().to_ascii_lowercase().replace('_', "-");
        Self::all().iter().copied().find(|id| id.slug() == slug)
    }

    pub fn category(&self) -> CatalogCategory {
        match self {
            CatalogId::Dilution | CatalogId::CharlesLaw | CatalogId::Nucleons => CatalogCategory::Chemistry,
            CatalogId::Margin | CatalogId::DoublingTime => CatalogCategory::Finance,
            CatalogId::OhmsLaw | CatalogId::Density | CatalogId::Speed => CatalogCategory::Physics,
        }
    }

    pub fn in_category(category: CatalogCategory) -> Vec<CatalogId> {
        Self::all().iter().copied().filter(|id| id.category() == category).collect()
    }

    pub fn definition(&self) -> CalculatorDefinition {
        match self {
            CatalogId::Dilution => chemistry::dilution(),
            CatalogId::CharlesLaw => chemistry::charles_law(),
            CatalogId::Nucleons => chemistry::nucleons(),
            CatalogId::Margin => finance::margin(),
            CatalogId::DoublingTime => finance::doubling_time(),
            CatalogId::OhmsLaw => physics::ohms_law(),
            CatalogId::Density => physics::density(),
            CatalogId::Speed => physics::speed(),
        }
    }
}
