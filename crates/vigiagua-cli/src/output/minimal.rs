use serde_json::Value;

/// Print just the headline value of the output.
///
/// Dashboard results reduce to the selected scope's percent treated;
/// anything else falls back to the first field of the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(metrics) = result_obj.get("metrics") {
        match metrics.get("percent_treated") {
            Some(Value::Null) | None => println!("n/a"),
            Some(val) => println!("{}", format_minimal(val)),
        }
        return;
    }

    let priority_keys = ["written", "latest", "percent_treated"];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    if let Value::Array(items) = result_obj {
        for item in items {
            match item.get("key") {
                Some(key) => println!("{}", format_minimal(key)),
                None => println!("{}", format_minimal(item)),
            }
        }
        return;
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
