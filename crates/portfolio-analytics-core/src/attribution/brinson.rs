use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::Rate;

/// Brinson-Fachler effects for one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorAttribution {
    pub sector: String,
    pub portfolio_weight: f64,
    pub benchmark_weight: f64,
    pub portfolio_return: Rate,
    pub benchmark_return: Rate,
    /// (w_p - w_b) * (r_b - R_b)
    pub allocation_effect: f64,
    /// w_b * (r_p - r_b)
    pub selection_effect: f64,
    /// (w_p - w_b) * (r_p - r_b)
    pub interaction_effect: f64,
    pub total_effect: f64,
}

/// Single-period Brinson-Fachler attribution over the union of sectors held
/// by either weight map. A sector missing from a map contributes weight or
/// return 0; sectors that only appear in a returns map are ignored.
///
/// Sectors come back in name order.
pub fn brinson_fachler(
    portfolio_weights: &BTreeMap<String, f64>,
    benchmark_weights: &BTreeMap<String, f64>,
    portfolio_returns: &BTreeMap<String, Rate>,
    benchmark_returns: &BTreeMap<String, Rate>,
) -> Vec<SectorAttribution> {
    let get = |m: &BTreeMap<String, f64>, k: &str| m.get(k).copied().unwrap_or(0.0);

    let total_benchmark_return: f64 = benchmark_weights
        .iter()
        .map(|(s, w)| w * get(benchmark_returns, s))
        .sum();

    let sectors: BTreeSet<&String> = portfolio_weights
        .keys()
        .chain(benchmark_weights.keys())
        .collect();

    sectors
        .into_iter()
        .map(|sector| {
            let pw = get(portfolio_weights, sector);
            let bw = get(benchmark_weights, sector);
            let pr = get(portfolio_returns, sector);
            let br = get(benchmark_returns, sector);

            let allocation_effect = (pw - bw) * (br - total_benchmark_return);
            let selection_effect = bw * (pr - br);
            let interaction_effect = (pw - bw) * (pr - br);
            SectorAttribution {
                sector: sector.clone(),
                portfolio_weight: pw,
                benchmark_weight: bw,
                portfolio_return: pr,
                benchmark_return: br,
                allocation_effect,
                selection_effect,
                interaction_effect,
                total_effect: allocation_effect + selection_effect + interaction_effect,
            }
        })
        .collect()
}
