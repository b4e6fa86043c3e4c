use serde_json::{Map, Value};
use std::io;

use super::{as_rows, format_scalar, result_of};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write the envelope's result as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = result_of(value);
    if let Some(rows) = as_rows(result) {
        write_rows(&mut wtr, &rows);
    } else if let Value::Object(map) = result {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in map {
            let _ = wtr.write_record([key.as_str(), &csv_cell(val)]);
        }
    } else {
        let _ = wtr.write_record([&csv_cell(result)]);
    }

    let _ = wtr.flush();
}

fn write_rows(wtr: &mut StdoutWriter<'_>, rows: &[Map<String, Value>]) {
    let Some(first) = rows.first() else {
        return;
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let _ = wtr.write_record(&headers);
    for row in rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| row.get(*h).map(csv_cell).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&cells);
    }
}

/// Null cells stay empty in CSV.
fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
        other => format_scalar(other),
    }
}
