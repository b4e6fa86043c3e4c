use serde_json::Value;

use super::{format_scalar, result_of};

/// Headline fields, most specific first.
const PRIORITY_KEYS: [&str; 12] = [
    "var",
    "sharpe_ratio",
    "portfolio_impact",
    "excess_return",
    "total_cost_bps",
    "liquidity_score",
    "mean_final_value",
    "volatility",
    "expected_return",
    "weights",
    "posterior_returns",
    "cvar",
];

/// Print just the key answer value from the output.
///
/// Takes the first non-null priority field of the result, else the first
/// field. Arrays print one line per element.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    match result {
        Value::Object(map) => {
            let picked = PRIORITY_KEYS
                .iter()
                .find_map(|k| map.get(*k).filter(|v| !v.is_null()).map(|v| (*k, v)));
            match picked {
                Some((_, v)) => print_value(v),
                None => {
                    if let Some((key, val)) = map.iter().next() {
                        println!("{}: {}", key, format_scalar(val));
                    }
                }
            }
        }
        other => print_value(other),
    }
}

fn print_value(value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(obj) => {
                        let line: Vec<String> = obj.values().map(format_scalar).collect();
                        println!("{}", line.join(" "));
                    }
                    other => println!("{}", format_scalar(other)),
                }
            }
        }
        other => println!("{}", format_scalar(other)),
    }
}
