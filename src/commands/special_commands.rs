//! Special commands parser for the interactive workbench
//!
//! Lines typed in `insighthub chat` are queries unless they start with `/`.
//! Special commands let the user:
//! - Export the current result (`/export csv|excel`)
//! - Ask for AI insights on it (`/insights`)
//! - Review recent queries (`/history`)
//! - Check the current plan (`/plan`) or browse plans (`/plans`)
//! - List example queries, show help, or leave
//!
//! Commands are case-insensitive.

use thiserror::Error;

use crate::service::ExportFormat;

/// Queries offered to new users.
pub const EXAMPLE_QUERIES: &[&str] = &[
    "Show top 10 customers by revenue",
    "What is the average sales by region?",
    "Count total orders this month",
    "Find customers with orders above $1000",
    "Display monthly sales trends",
];

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed in the interactive workbench
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Export the current result in the given format
    Export(ExportFormat),

    /// Generate AI insights for the current result
    Insights,

    /// Show the most recent queries, newest first
    History,

    /// Show the plan currently in effect
    ShowPlan,

    /// List available plans
    Plans,

    /// List example queries
    Examples,

    /// Run the numbered example query (1-based)
    RunExample(usize),

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; submit the input as a query
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not a valid command.
/// Returns CommandError::UnsupportedArgument if a command receives an invalid argument.
/// Returns CommandError::MissingArgument if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use insighthub::commands::special_commands::{parse_special_command, SpecialCommand};
/// use insighthub::service::ExportFormat;
///
/// let cmd = parse_special_command("/export excel").unwrap();
/// assert_eq!(cmd, SpecialCommand::Export(ExportFormat::Excel));
///
/// let cmd = parse_special_command("Show top 10 customers by revenue").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's a query (except exit/quit)
    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    match lower.as_str() {
        "/export" => Err(CommandError::MissingArgument {
            command: "/export".to_string(),
            usage: "/export <csv|excel>".to_string(),
        }),
        input if input.starts_with("/export ") => {
            let arg = input[8..].trim();
            ExportFormat::parse_str(arg)
                .map(SpecialCommand::Export)
                .ok_or_else(|| CommandError::UnsupportedArgument {
                    command: "/export".to_string(),
                    arg: arg.to_string(),
                })
        }

        "/insights" | "/analyze" => Ok(SpecialCommand::Insights),
        "/history" => Ok(SpecialCommand::History),
        "/plan" => Ok(SpecialCommand::ShowPlan),
        "/plans" | "/pricing" => Ok(SpecialCommand::Plans),

        "/examples" => Ok(SpecialCommand::Examples),
        input if input.starts_with("/examples ") || input.starts_with("/example ") => {
            let arg = input
                .split_once(' ')
                .map(|(_, rest)| rest.trim())
                .unwrap_or_default();
            match arg.parse::<usize>() {
                Ok(n) if (1..=EXAMPLE_QUERIES.len()).contains(&n) => {
                    Ok(SpecialCommand::RunExample(n))
                }
                _ => Err(CommandError::UnsupportedArgument {
                    command: "/examples".to_string(),
                    arg: arg.to_string(),
                }),
            }
        }

        "/help" | "/?" => Ok(SpecialCommand::Help),

        // Exit commands
        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),

        // Unknown command starting with "/"
        input => {
            let cmd = input.split_whitespace().next().unwrap_or(input);
            Err(CommandError::UnknownCommand(cmd.to_string()))
        }
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for the Interactive Workbench
==============================================

RESULTS:
  /export csv     - Export the current result as CSV
  /export excel   - Export the current result as Excel (.xlsx)
  /insights       - Generate AI insights for the current result
  /analyze        - Same as /insights

SESSION INFORMATION:
  /history        - Show your most recent queries
  /plan           - Show your current plan
  /plans          - List available plans and prices
  /examples       - List example queries
  /examples <n>   - Run example query number n
  /help           - Show this help message
  /?              - Same as /help

SESSION CONTROL:
  exit            - Exit interactive mode
  quit            - Same as exit

NOTES:
  - Commands are case-insensitive
  - Anything else you type is run as a natural-language query
  - Export and AI insights are available on the Pro and Business plans
"#
    );
}

/// Display the example queries, numbered from 1
pub fn print_examples() {
    println!("\nExample Queries:");
    for (i, example) in EXAMPLE_QUERIES.iter().enumerate() {
        println!("  {}. {}", i + 1, example);
    }
    println!();
}
