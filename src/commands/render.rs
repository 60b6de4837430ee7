//! Terminal rendering for workbench output
//!
//! Tables go through `prettytable`, emphasis through `colored`. Every `print_*`
//! function writes to stdout except [`print_failure`], which uses stderr.

use colored::Colorize;
use prettytable::{row, Cell, Row as TableRow, Table};
use serde_json::{Map, Value};

use crate::error::{InsightHubError, Result};
use crate::service::{Insight, Plan, PlanCatalogue, QueryResult};
use crate::workbench::{Entitlement, Failure, FailureKind};

/// Text shown in a table cell for a JSON value.
///
/// Strings print without quotes; a missing or null value prints empty.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Builds the results table.
///
/// Columns come from the first row. Later rows that lack a column get an
/// empty cell; extra keys are not shown.
pub fn result_table(result: &QueryResult) -> Table {
    let columns = result.columns();
    let mut table = Table::new();
    table.set_titles(TableRow::new(
        columns.iter().map(|c| Cell::new(c)).collect(),
    ));
    for row in &result.results {
        table.add_row(TableRow::new(
            columns
                .iter()
                .map(|c| Cell::new(&cell_text(row.get(*c))))
                .collect(),
        ));
    }
    table
}

/// Prints a query result: summary, rows, suggestions, and the executed query.
pub fn print_result(result: &QueryResult) {
    println!();
    if let Some(summary) = &result.summary {
        println!("{}", summary.bold());
        println!();
    }

    if result.is_empty() {
        println!("{}", "No rows returned.".yellow());
    } else {
        result_table(result).printstd();
        println!("{} row(s)", result.row_count());
    }

    if let Some(sql) = &result.executed_query {
        println!();
        println!("{} {}", "Executed query:".dimmed(), sql.dimmed());
    }

    if !result.suggestions.is_empty() {
        println!();
        println!("{}", "Suggested follow-ups:".cyan());
        for suggestion in &result.suggestions {
            println!("  - {}", suggestion);
        }
    }
    println!();
}

/// Prints AI insights section by section, skipping empty sections.
pub fn print_insight(insight: &Insight) {
    println!();
    println!("{}", "AI Insights".bold().magenta());

    print_bullets("Insights", &insight.insights);
    print_bullets("Recommendations", &insight.recommendations);

    if !insight.statistics.is_empty() {
        println!();
        println!("{}", "Statistics:".cyan());
        let mut table = Table::new();
        for (name, value) in &insight.statistics {
            table.add_row(row![name, cell_text(Some(value))]);
        }
        table.printstd();
    }

    if !insight.trends.is_empty() {
        println!();
        println!("{}", "Trends:".cyan());
        for trend in &insight.trends {
            println!("  - {}", cell_text(Some(trend)));
        }
    }
    println!();
}

fn print_bullets(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{}", format!("{}:", title).cyan());
    for item in items {
        println!("  - {}", item);
    }
}

/// Prints recent queries, newest first.
pub fn print_history(recent: &[String]) {
    if recent.is_empty() {
        println!("{}", "No queries yet.".yellow());
        return;
    }
    println!("\nRecent Queries:");
    for query in recent {
        println!("  {}", query.cyan());
    }
    println!();
}

/// One-line description of the plan in effect.
pub fn entitlement_line(entitlement: Option<Entitlement>) -> String {
    match entitlement {
        Some(e) => format!("Plan: {} ({})", e.plan.as_str().to_uppercase(), e.source),
        None => "Plan: unknown (not logged in)".to_string(),
    }
}

/// Prints the plan in effect.
pub fn print_entitlement(entitlement: Option<Entitlement>) {
    println!("{}", entitlement_line(entitlement).bold());
    if let Some(e) = entitlement {
        if !e.allows_premium_features() {
            println!(
                "{}",
                "Export and AI Insights require the Pro or Business plan.".yellow()
            );
        }
    }
}

/// Comma-separated summary of a plan's feature flags.
pub fn feature_summary(features: &Map<String, Value>) -> String {
    let parts: Vec<String> = features
        .iter()
        .filter_map(|(name, value)| match value {
            Value::Bool(true) => Some(name.clone()),
            Value::Bool(false) | Value::Null => None,
            other => Some(format!("{}: {}", name, cell_text(Some(other)))),
        })
        .collect();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

/// Prints the plan catalogue, marking `current`.
pub fn print_plans(catalogue: &PlanCatalogue, current: Option<Plan>) {
    let mut table = Table::new();
    table.add_row(row!["Plan", "Price", "Features"]);
    for (key, offer) in catalogue.by_tier() {
        let is_current = current.map(|p| p.as_str() == key).unwrap_or(false);
        let name = if is_current {
            format!("{} (current)", offer.name).green().to_string()
        } else {
            offer.name.clone()
        };
        table.add_row(row![name, offer.price, feature_summary(&offer.features)]);
    }

    println!("\nAvailable plans:\n");
    table.printstd();
    println!();
}

/// Prints a failure to stderr, colored by category.
pub fn print_failure(failure: &Failure) {
    let text = failure.user_message();
    let text = match failure.kind {
        FailureKind::Validation => text.yellow(),
        FailureKind::Entitlement => text.magenta(),
        FailureKind::Connectivity | FailureKind::Generic => text.red(),
    };
    eprintln!("{}", text);
}

/// Prints `value` as pretty JSON.
///
/// # Errors
///
/// Returns `InsightHubError::Serialization` if serialization fails
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(InsightHubError::Serialization)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_result;
    use crate::workbench::EntitlementSource;
    use serde_json::json;

    fn cell(table: &Table, row: usize, col: usize) -> String {
        table
            .get_row(row)
            .and_then(|r| r.get_cell(col))
            .map(|c| c.get_content())
            .unwrap()
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(Some(&json!("Alice"))), "Alice");
        assert_eq!(cell_text(Some(&json!(42))), "42");
        assert_eq!(cell_text(Some(&json!(true))), "true");
        assert_eq!(cell_text(Some(&Value::Null)), "");
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&json!([1, 2]))), "[1,2]");
    }

    #[test]
    fn test_result_table_follows_first_row_columns() {
        let mut result = sample_result(2);
        result.results[1].remove("marks");
        result.results[1].insert("extra".to_string(), json!("hidden"));

        let table = result_table(&result);
        assert_eq!(table.len(), 2);
        assert_eq!(cell(&table, 0, 0), "Student 1");
        assert_eq!(cell(&table, 0, 1), "95");
        assert_eq!(cell(&table, 1, 1), "");
        assert!(table.get_row(1).and_then(|r| r.get_cell(3)).is_none());
    }

    #[test]
    fn test_result_table_empty() {
        let table = result_table(&QueryResult::default());
        assert!(table.is_empty());
    }

    #[test]
    fn test_entitlement_line() {
        assert_eq!(entitlement_line(None), "Plan: unknown (not logged in)");
        let line = entitlement_line(Some(Entitlement {
            plan: Plan::Pro,
            source: EntitlementSource::Authoritative,
        }));
        assert_eq!(line, "Plan: PRO (authoritative)");
    }

    #[test]
    fn test_feature_summary() {
        let features = json!({"export": true, "ai_insights": false, "queries_per_month": 50});
        assert_eq!(
            feature_summary(features.as_object().unwrap()),
            "export, queries_per_month: 50"
        );
        assert_eq!(feature_summary(&Map::new()), "-");
    }
}
