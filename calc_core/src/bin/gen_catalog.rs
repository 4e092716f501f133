//! Writes the calculator reference page.
//!
//! Every entry of [`CatalogId::all`] is rendered with its fields and
//! formulas. The page lands in `calc_core/CATALOG.md` unless another path
//! is passed:
//!
//! ```bash
//! cargo run --bin gen-catalog
//! cargo run --bin gen-catalog -- /tmp/calculators.md
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use calc_core::catalog::{generate_catalog_markdown, CatalogId};

const DEFAULT_TARGET: &str = "calc_core/CATALOG.md";

fn main() -> ExitCode {
    let target = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET));

    let page = generate_catalog_markdown();
    if let Err(e) = fs::write(&target, &page) {
        eprintln!("cannot write {}: {}", target.display(), e);
        return ExitCode::FAILURE;
    }

    println!("{} calculators documented in {}", CatalogId::all().len(), target.display());
    ExitCode::SUCCESS
}
