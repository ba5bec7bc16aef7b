//! formula command implementation

use anyhow::Result;
use clap::{Args, Subcommand};
use xwander_core::formula::{Formula, FormulaValue};
use xwander_core::AppResult;

#[derive(Args, Debug)]
pub struct FormulaArgs {
    #[command(subcommand)]
    pub command: FormulaCommand,

    /// Print the percent-encoded form for `filterByFormula`
    #[arg(long, global = true)]
    pub encode: bool,
}

#[derive(Subcommand, Debug)]
pub enum FormulaCommand {
    /// FIELD equals any of the values
    InList {
        field: String,
        #[arg(required = true)]
        values: Vec<String>,
        /// Negate: FIELD equals none of the values
        #[arg(long)]
        not: bool,
    },

    /// FIELD equals VALUE
    Equals { field: String, value: String },

    /// FIELD is not empty
    NotEmpty { field: String },

    /// Linked record FIELD contains RECORD_ID
    Linked { field: String, record_id: String },
}

/// Numbers and booleans typed on the command line compare as such
fn parse_value(raw: &str) -> FormulaValue {
    if let Ok(n) = raw.parse::<i64>() {
        return n.into();
    }
    match raw {
        "true" => true.into(),
        "false" => false.into(),
        _ => raw.into(),
    }
}

pub fn render(command: &FormulaCommand) -> AppResult<Formula> {
    match command {
        FormulaCommand::InList { field, values, not } => {
            let values: Vec<FormulaValue> = values.iter().map(|v| parse_value(v)).collect();
            if *not {
                Formula::not_in_list(field, values)
            } else {
                Formula::in_list(field, values)
            }
        }
        FormulaCommand::Equals { field, value } => Ok(Formula::equals(field, parse_value(value))),
        FormulaCommand::NotEmpty { field } => Ok(Formula::not_empty(field)),
        FormulaCommand::Linked { field, record_id } => Ok(Formula::linked_record_id(field, record_id)),
    }
}

pub fn run(args: FormulaArgs) -> Result<()> {
    let formula = render(&args.command)?;
    if args.encode {
        println!("{}", formula.encode());
    } else {
        println!("{}", formula);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_list() {
        let formula = render(&FormulaCommand::InList {
            field: "Status".into(),
            values: vec!["Active".into(), "Pending".into()],
            not: false,
        })
        .unwrap();
        assert_eq!(formula.build(), r#"OR({Status} = "Active", {Status} = "Pending")"#);
    }

    #[test]
    fn test_numbers_stay_unquoted() {
        let formula = render(&FormulaCommand::Equals {
            field: "Seats".into(),
            value: "4".into(),
        })
        .unwrap();
        assert_eq!(formula.build(), "{Seats} = 4");
    }

    #[test]
    fn test_not_in_list() {
        let formula = render(&FormulaCommand::InList {
            field: "Status".into(),
            values: vec!["Cancelled".into()],
            not: true,
        })
        .unwrap();
        assert_eq!(formula.build(), r#"{Status} != "Cancelled""#);
    }
}
