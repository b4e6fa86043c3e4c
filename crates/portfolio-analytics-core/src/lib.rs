pub mod config;
pub mod error;
pub mod linalg;
pub mod stats;
pub mod types;

#[cfg(feature = "risk")]
pub mod risk;

#[cfg(feature = "optimization")]
pub mod optimization;

#[cfg(feature = "attribution")]
pub mod attribution;

#[cfg(feature = "stress")]
pub mod stress;

#[cfg(feature = "liquidity")]
pub mod liquidity;

pub use config::{AnalyticsConfig, SolverConfig};
pub use error::AnalyticsError;
pub use types::*;

/// Standard result type for all analytics operations
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
