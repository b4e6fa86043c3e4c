pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` member of an output envelope, or the value itself.
pub(crate) fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Rows for tabular output: arrays of objects as-is, and maps of objects
/// (keyed scenario results) with the key as a leading `key` column.
pub(crate) fn as_rows(value: &Value) -> Option<Vec<Map<String, Value>>> {
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => Some(
            items
                .iter()
                .filter_map(|v| v.as_object().cloned())
                .collect(),
        ),
        Value::Object(map) if !map.is_empty() && map.values().all(Value::is_object) => Some(
            map.iter()
                .filter_map(|(key, v)| {
                    let mut row = Map::new();
                    row.insert("key".to_string(), Value::String(key.clone()));
                    for (k, field) in v.as_object()? {
                        row.insert(k.clone(), field.clone());
                    }
                    Some(row)
                })
                .collect(),
        ),
        _ => None,
    }
}

pub(crate) fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => arr.iter().map(format_scalar).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_result_of_unwraps_envelope() {
        let envelope = json!({"result": {"var": 0.02}, "methodology": "historical"});
        assert_eq!(result_of(&envelope), &json!({"var": 0.02}));
        let bare = json!([1, 2]);
        assert_eq!(result_of(&bare), &bare);
    }

    #[test]
    fn test_keyed_results_gain_key_column() {
        let keyed = json!({
            "GFC_2008": {"portfolio_impact": -54000.0},
            "COVID_2020": {"portfolio_impact": -40000.0},
        });
        let rows = as_rows(&keyed).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["key"], json!("COVID_2020"));
        assert_eq!(rows[1]["portfolio_impact"], json!(-54000.0));
    }

    #[test]
    fn test_scalars_and_flat_objects_are_not_rows() {
        assert!(as_rows(&json!({"var": 0.02})).is_none());
        assert!(as_rows(&json!([])).is_none());
        assert!(as_rows(&json!([1, 2])).is_none());
        assert_eq!(as_rows(&json!([{"a": 1}])).unwrap().len(), 1);
    }

    #[test]
    fn test_format_scalar() {
        assert_eq!(format_scalar(&json!("SPY")), "SPY");
        assert_eq!(format_scalar(&json!(0.25)), "0.25");
        assert_eq!(format_scalar(&json!(null)), "null");
        assert_eq!(format_scalar(&json!([1, "a"])), "1, a");
        assert_eq!(format_scalar(&json!({"x": 1})), "{\"x\":1}");
    }
}
