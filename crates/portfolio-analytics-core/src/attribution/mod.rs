pub mod analysis;
pub mod brinson;
pub mod decomposition;
pub mod factor;
pub mod ideas;

pub use analysis::{AttributionInput, AttributionResult};
pub use brinson::{brinson_fachler, SectorAttribution};
pub use decomposition::{
    timing_contribution, transaction_cost_impact, AlphaBetaDecomposition, AttributionEngine, Trade,
};
pub use factor::{factor_attribution, FactorAttribution};
pub use ideas::{Idea, IdeaPerformance, IdeaStatus, IdeaTracker};
