use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{as_rows, format_scalar, result_of};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    let result = result_of(value);
    if let Some(rows) = as_rows(result) {
        print_rows(&rows);
    } else if let Value::Object(map) = result {
        print_fields(map);
    } else {
        println!("{}", format_scalar(result));
    }

    let Some(envelope) = value.as_object() else {
        return;
    };
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }
    if let Some(Value::String(methodology)) = envelope.get("methodology") {
        println!("\nMethodology: {methodology}");
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_scalar(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Map<String, Value>]) {
    let Some(first) = rows.first() else {
        println!("(empty)");
        return;
    };
    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for row in rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| row.get(h.as_str()).map(format_scalar).unwrap_or_default())
            .collect();
        builder.push_record(cells);
    }
    println!("{}", Table::from(builder));
}
