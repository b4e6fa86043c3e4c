use serde_json::Value;

/// Pretty-printed JSON on stdout. Non-finite floats have already become `null`.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("JSON serialization error: {e}"),
    }
}
