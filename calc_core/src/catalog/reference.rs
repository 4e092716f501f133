//! # Catalog Reference
//!
//! Renders the built-in calculators as a markdown document: variables with
//! their dimensions and selectable units, and every equation group with its
//! formula, constraints and handoff order.

use super::{CatalogCategory, CatalogId};
use crate::units::UnitRegistry;

/// Generate the CATALOG.md reference for every built-in calculator.
///
/// # Example
///
/// ```rust
/// use calc_core::catalog::generate_catalog_markdown;
///
/// let markdown = generate_catalog_markdown();
/// assert!(markdown.contains("# Calculator Catalog"));
/// assert!(markdown.contains("C1 * V1 = C2 * V2"));
/// ```
pub fn generate_catalog_markdown() -> String {
    let registry = UnitRegistry::standard();
    let mut output = String::with_capacity(16_000);

    output.push_str(
        r#"# Calculator Catalog

> **Auto-generated from source code. Do not edit manually.**
>
> Regenerate with: `cargo run --bin gen-catalog`

Every calculator below accepts values for any subset of its fields. When an
equation group has exactly one empty field, that field is computed and shown
in the unit selected for it. Values are converted to the base unit of their
dimension before solving.

---

"#,
    );

    for category in CatalogCategory::all() {
        let ids = CatalogId::in_category(category);
        if ids.is_empty() {
            continue;
        }
        output.push_str(&format!("## {}\n\n", category.display_name()));

        for id in ids {
            let def = id.definition();
            output.push_str(&format!("### {}\n\n", def.name));
            output.push_str(&format!("{}\n\n", def.description));
            output.push_str(&format!("**Run:** `calc_cli run {}`\n\n", id.slug()));

            output.push_str("| Field | Label | Dimension | Default | Units |\n");
            output.push_str("|-------|-------|-----------|---------|-------|\n");
            for var in &def.variables {
                let units = registry
                    .dimension(&var.dimension)
                    .map(|table| table.symbols().join(", "))
                    .unwrap_or_default();
                output.push_str(&format!(
                    "| `{}` | {} | {} | {} | {} |\n",
                    var.id, var.label, var.dimension, var.default_unit, units
                ));
            }
            output.push('\n');

            for group in &def.groups {
                output.push_str(&format!("**{}:** `{}`\n\n", group.label, group.formula));
                for constraint in group.constraints() {
                    output.push_str(&format!("- {}\n", constraint.describe()));
                }
                if !group.handoff().is_empty() {
                    output.push_str(&format!(
                        "- When every field is user-entered and a computed one is overwritten, `{}` is recomputed first\n",
                        group.handoff().join("`, then `")
                    ));
                }
                output.push('\n');
            }

            output.push_str("---\n\n");
        }
    }

    output
}
