pub mod config;
pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use serde_json::Value;

type StdinResult = Result<Option<Value>, Box<dyn std::error::Error>>;

/// Deserialize a command document from `--input <file>` or piped stdin.
/// Errors are prefixed with `what`, the command's label.
pub fn load<T: DeserializeOwned>(path: &Option<String>, what: &str) -> Result<T, Box<dyn std::error::Error>> {
    load_with(path, what, stdin::read_stdin)
}

fn load_with<T: DeserializeOwned>(
    path: &Option<String>,
    what: &str,
    read_stdin: impl FnOnce() -> StdinResult,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(ref path) = path {
        file::read_json(path).map_err(|e| format!("{what}: {e}").into())
    } else if let Some(data) = read_stdin()? {
        serde_json::from_value(data).map_err(|e| format!("{what}: invalid stdin document: {e}").into())
    } else {
        Err(format!("--input <file.json> or stdin required for {what}").into())
    }
}
