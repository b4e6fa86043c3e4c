pub mod engine;
pub mod impact;
#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;
pub mod scenario;

pub use engine::{ScenarioExposures, ScenarioResult, StressEngine};
pub use impact::{
    commodity_impact, equity_impact, fixed_income_impact, fx_impact, EquityExposure,
    FixedIncomeExposure, ImpactBreakdown,
};
#[cfg(feature = "monte_carlo")]
pub use monte_carlo::SimulationResult;
pub use scenario::{
    default_catalog, historical_scenarios, hypothetical_scenarios, Scenario, ScenarioCatalog,
    ScenarioType,
};
