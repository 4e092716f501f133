//! Line commands of the interactive session and their rendering.

use anyhow::{bail, Result};
use calc_core::{CalculatorInstance, Provenance, UiState};

pub const HELP: &str = "\
Commands:
  set <field> <value>   enter a value (an empty value clears the field)
  unit <field> <unit>   show a field in another unit
  clear <field>         empty one field
  reset                 empty every field and restore default units
  show                  print the current state
  units <field>         list the units a field accepts
  help                  print this message
  quit                  leave";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set { field: String, value: String },
    Unit { field: String, unit: String },
    Clear { field: String },
    Reset,
    Show,
    Units { field: String },
    Help,
    Quit,
}

impl Command {
    /// Parse a line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "set" => {
                let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Command::Set {
                    field: required(field, "set <field> <value>")?,
                    value: value.trim().to_string(),
                }
            }
            "unit" => {
                let (field, unit) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Command::Unit {
                    field: required(field, "unit <field> <unit>")?,
                    unit: required(unit.trim(), "unit <field> <unit>")?,
                }
            }
            "clear" => Command::Clear {
                field: required(rest, "clear <field>")?,
            },
            "units" => Command::Units {
                field: required(rest, "units <field>")?,
            },
            "reset" => Command::Reset,
            "show" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command '{}' (try 'help')", other),
        };
        Ok(Some(command))
    }
}

fn required(value: &str, usage: &str) -> Result<String> {
    if value.is_empty() {
        bail!("usage: {}", usage);
    }
    Ok(value.to_string())
}

/// What the session should print after a command.
pub enum Reply {
    State(UiState),
    Text(String),
    Quit,
}

/// Apply a command to the calculator.
pub fn apply(calc: &mut CalculatorInstance, command: Command) -> Result<Reply> {
    let reply = match command {
        Command::Set { field, value } => Reply::State(calc.on_field_change(&field, &value)),
        Command::Unit { field, unit } => Reply::State(calc.on_unit_change(&field, &unit)),
        Command::Clear { field } => Reply::State(calc.on_clear_field(&field)),
        Command::Reset => Reply::State(calc.on_clear_all()),
        Command::Show => Reply::State(calc.snapshot()),
        Command::Units { field } => Reply::Text(calc.units_for(&field)?.join(", ")),
        Command::Help => Reply::Text(HELP.to_string()),
        Command::Quit => Reply::Quit,
    };
    Ok(reply)
}

/// Plain-text table of a state.
pub fn render_table(state: &UiState) -> String {
    let id_width = state.fields.iter().map(|f| f.id.chars().count()).max().unwrap_or(0).max(5);
    let value_width = state
        .fields
        .iter()
        .map(|f| f.display_value.chars().count())
        .max()
        .unwrap_or(0)
        .max(5);

    let mut out = String::new();
    for field in &state.fields {
        let marker = match field.provenance {
            Provenance::UserSet => "  ",
            Provenance::Derived => "= ",
            Provenance::Empty => "  ",
        };
        out.push_str(&format!(
            "{}{:<id_width$}  {:>value_width$} {:<8} {}\n",
            marker,
            field.id,
            field.display_value,
            field.unit,
            field.label,
            id_width = id_width,
            value_width = value_width,
        ));
        for error in &field.errors {
            out.push_str(&format!("    ! {}\n", error));
        }
        for notice in &field.notices {
            out.push_str(&format!("    ~ {}\n", notice));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use calc_core::CatalogId;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("set c1 1,000").unwrap(),
            Some(Command::Set {
                field: "c1".to_string(),
                value: "1,000".to_string()
            })
        );
        assert_eq!(
            Command::parse("set c1").unwrap(),
            Some(Command::Set {
                field: "c1".to_string(),
                value: String::new()
            })
        );
        assert_eq!(
            Command::parse("  UNIT v1 fl oz ").unwrap(),
            Some(Command::Unit {
                field: "v1".to_string(),
                unit: "fl oz".to_string()
            })
        );
        assert_eq!(Command::parse("q").unwrap(), Some(Command::Quit));
        assert_eq!(Command::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("frobnicate").is_err());
        assert!(Command::parse("clear").is_err());
        assert!(Command::parse("unit v1").is_err());
    }

    #[test]
    fn test_apply_and_render() {
        let mut calc = CatalogId::Dilution.definition().instantiate().unwrap();
        for line in ["set c1 10", "set v1 5", "set c2 2"] {
            let command = Command::parse(line).unwrap().unwrap();
            apply(&mut calc, command).unwrap();
        }
        let table = match apply(&mut calc, Command::Show).unwrap() {
            Reply::State(state) => render_table(&state),
            _ => panic!("show must return a state"),
        };
        assert!(table.contains("= v2"));
        assert!(table.contains("25 mL"));

        match apply(&mut calc, Command::parse("units v1").unwrap().unwrap()).unwrap() {
            Reply::Text(text) => assert!(text.starts_with("L, µL, mL")),
            _ => panic!("units must return text"),
        }
        assert!(apply(&mut calc, Command::parse("units nope").unwrap().unwrap()).is_err());
    }

    #[test]
    fn test_render_marks_handed_off_field() {
        let mut calc = CatalogId::Margin.definition().instantiate().unwrap();
        for line in ["set cost 30", "set revenue 50"] {
            apply(&mut calc, Command::parse(line).unwrap().unwrap()).unwrap();
        }
        let table = match apply(&mut calc, Command::parse("set profit 70").unwrap().unwrap()).unwrap() {
            Reply::State(state) => render_table(&state),
            _ => panic!("set must return a state"),
        };
        assert!(table.contains("= revenue"));
        assert!(table.contains("    ~ recomputed: was user-entered\n"));
        assert!(!table.contains("    ! "));
    }
}
