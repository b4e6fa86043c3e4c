pub mod attribution;
pub mod liquidity;
pub mod optimization;
pub mod risk;
pub mod stress;

use portfolio_analytics_core::types::with_metadata;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

pub type CommandResult = Result<Value, Box<dyn std::error::Error>>;

/// Wrap a computation result in the standard output envelope.
pub(crate) fn envelope<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    started: Instant,
    result: T,
) -> CommandResult {
    let elapsed_us = started.elapsed().as_micros() as u64;
    let output = with_metadata(methodology, assumptions, warnings, elapsed_us, result);
    Ok(serde_json::to_value(output)?)
}
