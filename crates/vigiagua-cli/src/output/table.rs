use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::as_percent;

const METRICS_HEADER: [&str; 5] = ["Year", "CRS", "% treated", "Population", "CRS groups"];
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result(result);
                print_footer(map);
            } else if map.contains_key("type") && map.contains_key("features") {
                print_feature_summary(value);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result(result: &Value) {
    if let Some(Value::Array(tables)) = result.get("tables") {
        print_metrics(result);
        for table in tables {
            println!();
            print_summary_table(table);
        }
    } else if result.get("rows").is_some() {
        print_summary_table(result);
    } else if let Some(Value::Array(series)) = result.get("series") {
        print_trend_table(result, series);
    } else {
        print_flat_object(result);
    }
}

fn print_metrics(result: &Value) {
    let mut builder = Builder::default();
    builder.push_record(METRICS_HEADER);
    let metrics = result.get("metrics").unwrap_or(&Value::Null);
    builder.push_record([
        format_value(result.get("year").unwrap_or(&Value::Null)),
        format_value(result.get("crs").unwrap_or(&Value::Null)),
        format_percent(metrics.get("percent_treated").unwrap_or(&Value::Null)),
        format_value(metrics.get("population").unwrap_or(&Value::Null)),
        format_value(metrics.get("groups").unwrap_or(&Value::Null)),
    ]);
    println!("{}", Table::from(builder));
}

fn print_summary_table(table: &Value) {
    if let Some(Value::String(title)) = table.get("title") {
        println!("{}", title.bold());
    }
    let rows = match table.get("rows") {
        Some(Value::Array(rows)) if !rows.is_empty() => rows,
        _ => {
            println!("(empty)");
            return;
        }
    };

    let mut builder = Builder::default();
    builder.push_record(["Name", "Population", "% treated", "History"]);
    for row in rows {
        let history = match row.get("history") {
            Some(Value::Array(points)) => sparkline(points),
            _ => String::new(),
        };
        builder.push_record([
            format_value(row.get("label").unwrap_or(&Value::Null)),
            format_value(row.get("population").unwrap_or(&Value::Null)),
            format_percent(row.get("percent_treated").unwrap_or(&Value::Null)),
            history,
        ]);
    }
    println!("{}", Table::from(builder));
}

fn print_trend_table(result: &Value, series: &[Value]) {
    let years: Vec<String> = match result.get("axis") {
        Some(Value::Array(years)) => years.iter().map(format_value).collect(),
        _ => Vec::new(),
    };

    let mut builder = Builder::default();
    let mut header = vec!["Name".to_string()];
    header.extend(years.iter().cloned());
    header.push("Trend".to_string());
    builder.push_record(header);

    for s in series {
        let values: Vec<Value> = match s.get("points") {
            Some(Value::Array(points)) => points
                .iter()
                .map(|p| p.get("percent_treated").cloned().unwrap_or(Value::Null))
                .collect(),
            _ => Vec::new(),
        };
        let mut row = vec![format_value(s.get("label").unwrap_or(&Value::Null))];
        row.extend(values.iter().map(format_percent));
        row.push(sparkline(&values));
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

fn print_feature_summary(value: &Value) {
    let features = match value.get("features") {
        Some(Value::Array(features)) => features,
        _ => return,
    };
    let mut builder = Builder::default();
    builder.push_record(["Code", "Name", "% treated", "Population"]);
    for feature in features {
        let props = feature.get("properties").unwrap_or(&Value::Null);
        builder.push_record([
            format_value(props.get("code").unwrap_or(&Value::Null)),
            format_value(props.get("name").unwrap_or(&Value::Null)),
            format_percent(props.get("percent_treated").unwrap_or(&Value::Null)),
            format_value(props.get("population").unwrap_or(&Value::Null)),
        ]);
    }
    println!("{}", Table::from(builder));
}

fn print_footer(envelope: &serde_json::Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s.yellow());
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }
        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

/// One block per year on a fixed 0-100 scale; `·` marks a year without data.
pub(crate) fn sparkline(points: &[Value]) -> String {
    points
        .iter()
        .map(|p| match as_percent(p) {
            Some(pct) => {
                let idx = ((pct.clamp(0.0, 100.0) / 100.0) * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
                SPARK_LEVELS[idx]
            }
            None => '·',
        })
        .collect()
}

fn format_percent(value: &Value) -> String {
    match value {
        Value::String(s) => match s.parse::<Decimal>() {
            Ok(pct) => format!("{:.2}", pct.round_dp(2)),
            Err(_) => s.clone(),
        },
        Value::Number(n) => format!("{:.2}", n.as_f64().unwrap_or_default()),
        _ => "n/a".to_string(),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sparkline_marks_missing_years() {
        let line = sparkline(&[json!("0"), json!(null), json!("100.00")]);
        assert_eq!(line, "▁·█");
    }

    #[test]
    fn test_sparkline_accepts_numbers() {
        assert_eq!(sparkline(&[json!(50.0)]).chars().count(), 1);
    }

    #[test]
    fn test_metrics_group_count_is_labelled_as_crs() {
        assert_eq!(METRICS_HEADER[4], "CRS groups");
        assert!(!METRICS_HEADER.contains(&"Municipalities"));
    }

    #[test]
    fn test_format_percent_null_is_na() {
        assert_eq!(format_percent(&Value::Null), "n/a");
        assert_eq!(format_percent(&json!("66.666")), "66.67");
    }
}
