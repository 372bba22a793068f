pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Rows of the primary table in a command result, if it has one.
///
/// Coverage tables carry `rows`, trend tables `series`. A dashboard has
/// several tables; the last (municipality) one is the primary table.
pub(crate) fn primary_rows(result: &Value) -> Option<&Vec<Value>> {
    if let Some(Value::Array(rows)) = result.get("rows") {
        return Some(rows);
    }
    if let Some(Value::Array(series)) = result.get("series") {
        return Some(series);
    }
    match result.get("tables") {
        Some(Value::Array(tables)) => tables.last().and_then(|t| t.get("rows")).and_then(Value::as_array),
        _ => None,
    }
}

/// Percent values serialize as decimal strings; accept numbers too.
pub(crate) fn as_percent(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
