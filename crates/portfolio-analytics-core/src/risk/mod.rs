pub mod engine;
pub mod metrics;

pub use engine::{
    calculate_returns, CaptureRatios, CorrelationMatrix, DrawdownResult, RiskEngine, VarMethod,
};
pub use metrics::{BenchmarkMetrics, RiskMetrics};
