use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{flatten, format_scalar, result_of};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    let result = result_of(value);
    match result {
        Value::Object(map) => {
            print_field_table(map);
            for key in ["schedule", "rate", "down_payment"] {
                if let Some(Value::Array(rows)) = find_array(map, key) {
                    println!("\n{}:", section_title(key));
                    print_array_table(rows);
                }
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", format_scalar(result)),
    }

    if let Some(envelope) = value.as_object() {
        print_notes(envelope);
    }
}

fn print_field_table(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flatten(map) {
        builder.push_record([key, val]);
    }
    println!("{}", Table::from(builder));
}

/// Top-level arrays live on the result; sensitivity curves one level down.
fn find_array<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.get("sensitivity")
            .and_then(Value::as_object)
            .and_then(|s| s.get(key))
    })
}

fn section_title(key: &str) -> &'static str {
    match key {
        "schedule" => "Amortization Schedule",
        "rate" => "Rate Sensitivity",
        _ => "Down Payment Sensitivity",
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
                    .map(|h| map.get(h.as_str()).map(format_scalar).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_scalar(item));
        }
    }
}

fn print_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
