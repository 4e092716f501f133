//! # calc_cli - Terminal Calculator
//!
//! Drives one catalog calculator from stdin. Each line is an event
//! (`set`, `unit`, `clear`, `reset`) and the resulting state is printed as a
//! table, or as JSON with `--json`.
//!
//! ```bash
//! calc_cli list
//! calc_cli run dilution
//! RUST_LOG=calc_core=debug calc_cli run margin --json
//! ```

mod repl;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use calc_core::catalog::{CatalogCategory, CatalogId};
use calc_core::{CalculatorSettings, UiState};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use repl::{apply, render_table, Command, Reply};

/// Unit-aware calculator forms in the terminal
#[derive(Parser)]
#[command(name = "calc_cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in calculators
    List,

    /// Start an interactive session with one calculator
    Run {
        /// Calculator name as shown by `list`
        calculator: String,

        /// Print every state as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Settings file (JSON)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::List => {
            list();
            Ok(())
        }
        Commands::Run {
            calculator,
            json,
            settings,
        } => run(&calculator, json, settings),
    }
}

fn list() {
    for category in CatalogCategory::all() {
        println!("{}", category.display_name());
        for id in CatalogId::in_category(category) {
            let def = id.definition();
            println!("  {:<14} {}", id.slug(), def.description);
        }
    }
}

fn run(name: &str, json: bool, settings_path: Option<PathBuf>) -> Result<()> {
    let id = CatalogId::from_slug(name).ok_or_else(|| anyhow!("no calculator named '{}' (see `calc_cli list`)", name))?;
    let settings = match settings_path {
        Some(path) => CalculatorSettings::load(&path).with_context(|| format!("loading {}", path.display()))?,
        None => CalculatorSettings::default(),
    };

    let def = id.definition();
    let mut calc = def
        .instantiate_with(settings)
        .with_context(|| format!("building calculator '{}'", id.slug()))?;
    info!(calculator = id.slug(), session = %calc.session_id(), "session started");

    println!("{} - {}", def.name, def.description);
    for group in calc.groups() {
        println!("  {}", group.formula);
    }
    println!("Type 'help' for commands.");
    print_state(&calc.snapshot(), json)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        debug!(?command, "command");

        match apply(&mut calc, command) {
            Ok(Reply::State(state)) => print_state(&state, json)?,
            Ok(Reply::Text(text)) => println!("{}", text),
            Ok(Reply::Quit) => break,
            Err(e) => eprintln!("{}", e),
        }
    }

    info!(solver_runs = calc.solver_runs(), "session finished");
    Ok(())
}

fn print_state(state: &UiState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(state)?);
    } else {
        print!("{}", render_table(state));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use repl::HELP;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from(["calc_cli", "run", "margin", "--json", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Run { calculator, json, settings } => {
                assert_eq!(calculator, "margin");
                assert!(json);
                assert!(settings.is_none());
            }
            Commands::List => panic!("expected run"),
        }
    }

    #[test]
    fn test_help_mentions_every_command() {
        for word in ["set", "unit", "clear", "reset", "show", "units", "help", "quit"] {
            assert!(HELP.contains(word), "help is missing {}", word);
        }
    }
}
