use serde::{Deserialize, Serialize};

/// Monetary amounts (market values, NAV, P&L).
pub type Money = f64;

/// Rates and returns expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = f64;

/// Basis points (100 bps = 1%).
pub type Bps = f64;

/// Return computation convention for a price series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnMethod {
    Simple,
    #[default]
    Log,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_metadata_envelope() {
        let out = with_metadata(
            "Test methodology",
            &serde_json::json!({ "alpha": 1 }),
            vec!["careful".into()],
            12,
            3.5_f64,
        );
        assert_eq!(out.result, 3.5);
        assert_eq!(out.methodology, "Test methodology");
        assert_eq!(out.assumptions["alpha"], 1);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.metadata.precision, "ieee754_f64");
    }

    #[test]
    fn test_return_method_serde() {
        let m: ReturnMethod = serde_json::from_str("\"simple\"").unwrap();
        assert_eq!(m, ReturnMethod::Simple);
        assert_eq!(ReturnMethod::default(), ReturnMethod::Log);
    }
}
