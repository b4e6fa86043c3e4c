use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::AnalyticsError;
use crate::stats;
use crate::types::Rate;
use crate::AnalyticsResult;

const TRADING_DAYS: f64 = 252.0;
const DEFAULT_CONVICTION: u8 = 3;

/// Lifecycle state of an investment idea.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    #[default]
    Active,
    Closed,
    Stopped,
}

fn default_conviction() -> u8 {
    DEFAULT_CONVICTION
}

/// An investment thesis on one security, with its price levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub symbol: String,
    pub thesis: String,
    #[serde(default)]
    pub catalysts: Vec<String>,
    /// KPI name -> latest reading
    #[serde(default)]
    pub kpis: BTreeMap<String, f64>,
    /// 1 (low) to 5 (high)
    #[serde(default = "default_conviction")]
    pub conviction: u8,
    #[serde(default)]
    pub entry_date: Option<NaiveDate>,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub stop_price: Option<f64>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub status: IdeaStatus,
    #[serde(default)]
    pub analyst: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl Idea {
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, thesis: impl Into<String>) -> Self {
        Idea {
            id: id.into(),
            symbol: symbol.into(),
            thesis: thesis.into(),
            catalysts: Vec::new(),
            kpis: BTreeMap::new(),
            conviction: DEFAULT_CONVICTION,
            entry_date: None,
            entry_price: None,
            target_price: None,
            stop_price: None,
            current_price: None,
            status: IdeaStatus::Active,
            analyst: None,
            notes: String::new(),
        }
    }

    pub fn conviction(mut self, conviction: u8) -> Self {
        self.conviction = conviction;
        self
    }

    pub fn entry(mut self, date: NaiveDate, price: f64) -> Self {
        self.entry_date = Some(date);
        self.entry_price = Some(price);
        self
    }

    pub fn target(mut self, price: f64) -> Self {
        self.target_price = Some(price);
        self
    }

    pub fn stop(mut self, price: f64) -> Self {
        self.stop_price = Some(price);
        self
    }

    /// Return since entry at the current price.
    pub fn return_pct(&self) -> Option<Rate> {
        let entry = nonzero(self.entry_price)?;
        let current = nonzero(self.current_price)?;
        Some((current - entry) / entry)
    }

    /// Remaining move from the current price to target.
    pub fn upside_pct(&self) -> Option<Rate> {
        let target = nonzero(self.target_price)?;
        let current = nonzero(self.current_price)?;
        Some((target - current) / current)
    }

    /// `(target - entry) / (entry - stop)`, defined only when the stop sits
    /// below entry.
    pub fn risk_reward_ratio(&self) -> Option<f64> {
        let entry = nonzero(self.entry_price)?;
        let target = nonzero(self.target_price)?;
        let stop = nonzero(self.stop_price)?;
        let downside = entry - stop;
        (downside > 0.0).then(|| (target - entry) / downside)
    }
}

fn nonzero(price: Option<f64>) -> Option<f64> {
    price.filter(|p| *p != 0.0)
}

/// Price behaviour of an idea from its entry date onward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaPerformance {
    pub total_return: Rate,
    /// Annualized population std of daily returns
    pub volatility: Rate,
    pub max_price: f64,
    pub min_price: f64,
    /// Worst peak-to-trough decline, negative or zero
    pub max_drawdown: Rate,
    /// Number of price observations on or after entry
    pub days_held: usize,
}

/// Book of investment ideas keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdeaTracker {
    ideas: BTreeMap<String, Idea>,
}

impl IdeaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an idea under its id.
    pub fn add_idea(&mut self, idea: Idea) -> AnalyticsResult<()> {
        if idea.id.is_empty() {
            return Err(AnalyticsError::invalid("id", "idea id must not be empty"));
        }
        if !(1..=5).contains(&idea.conviction) {
            return Err(AnalyticsError::invalid(
                "conviction",
                format!("must lie in 1..=5, got {}", idea.conviction),
            ));
        }
        self.ideas.insert(idea.id.clone(), idea);
        Ok(())
    }

    pub fn get_idea(&self, idea_id: &str) -> Option<&Idea> {
        self.ideas.get(idea_id)
    }

    /// Set the current price of every idea whose symbol is quoted.
    pub fn update_prices(&mut self, prices: &BTreeMap<String, f64>) {
        for idea in self.ideas.values_mut() {
            if let Some(price) = prices.get(&idea.symbol) {
                idea.current_price = Some(*price);
            }
        }
    }

    pub fn active_ideas(&self) -> Vec<&Idea> {
        self.ideas
            .values()
            .filter(|i| i.status == IdeaStatus::Active)
            .collect()
    }

    pub fn ideas_by_conviction(&self, min_conviction: u8) -> Vec<&Idea> {
        self.ideas
            .values()
            .filter(|i| i.conviction >= min_conviction)
            .collect()
    }

    /// Performance of an idea over `prices`, starting at the first date on
    /// or after its entry date. `dates` must be ascending and aligned with
    /// `prices`.
    ///
    /// `Ok(None)` when the idea has no entry date or every date precedes it.
    pub fn calculate_idea_performance(
        &self,
        idea_id: &str,
        prices: &[f64],
        dates: &[NaiveDate],
    ) -> AnalyticsResult<Option<IdeaPerformance>> {
        let idea = self
            .get_idea(idea_id)
            .ok_or_else(|| AnalyticsError::invalid("idea_id", format!("unknown idea '{idea_id}'")))?;
        if prices.len() != dates.len() {
            return Err(AnalyticsError::invalid(
                "prices",
                format!("{} prices for {} dates", prices.len(), dates.len()),
            ));
        }
        if prices.iter().any(|p| !(p.is_finite() && *p > 0.0)) {
            return Err(AnalyticsError::invalid("prices", "prices must be positive"));
        }

        let Some(entry_date) = idea.entry_date else {
            return Ok(None);
        };
        let Some(start) = dates.iter().position(|d| *d >= entry_date) else {
            return Ok(None);
        };

        let held = &prices[start..];
        let returns: Vec<f64> = held.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        let volatility = if returns.is_empty() {
            0.0
        } else {
            stats::population_std(&returns) * TRADING_DAYS.sqrt()
        };

        let mut peak = held[0];
        let mut max_drawdown: f64 = 0.0;
        for p in held {
            peak = peak.max(*p);
            max_drawdown = max_drawdown.min((p - peak) / peak);
        }

        debug!(idea = idea_id, days = held.len(), "idea performance");
        Ok(Some(IdeaPerformance {
            total_return: held[held.len() - 1] / held[0] - 1.0,
            volatility,
            max_price: held.iter().copied().fold(f64::MIN, f64::max),
            min_price: held.iter().copied().fold(f64::MAX, f64::min),
            max_drawdown,
            days_held: held.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn tracker() -> IdeaTracker {
        let mut t = IdeaTracker::new();
        t.add_idea(
            Idea::new("msft-cloud", "MSFT", "Azure share gains")
                .conviction(5)
                .entry(day(4), 400.0)
                .target(480.0)
                .stop(370.0),
        )
        .unwrap();
        t.add_idea(Idea::new("xom-capex", "XOM", "Capex discipline").conviction(2))
            .unwrap();
        let mut closed = Idea::new("t-dividend", "T", "Dividend safety").conviction(4);
        closed.status = IdeaStatus::Closed;
        t.add_idea(closed).unwrap();
        t
    }

    #[test]
    fn test_derived_levels() {
        let mut idea = Idea::new("a", "MSFT", "").entry(day(1), 400.0).target(480.0).stop(370.0);
        assert_eq!(idea.return_pct(), None);
        idea.current_price = Some(420.0);
        assert_relative_eq!(idea.return_pct().unwrap(), 0.05, epsilon = 1e-12);
        assert_relative_eq!(idea.upside_pct().unwrap(), 60.0 / 420.0, epsilon = 1e-12);
        assert_relative_eq!(idea.risk_reward_ratio().unwrap(), 80.0 / 30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_risk_reward_needs_stop_below_entry() {
        let idea = Idea::new("a", "X", "").entry(day(1), 100.0).target(120.0).stop(105.0);
        assert_eq!(idea.risk_reward_ratio(), None);
        let zero_entry = Idea::new("b", "X", "").entry(day(1), 0.0).target(120.0).stop(90.0);
        assert_eq!(zero_entry.risk_reward_ratio(), None);
    }

    #[test]
    fn test_filters() {
        let t = tracker();
        let active: Vec<&str> = t.active_ideas().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(active, vec!["msft-cloud", "xom-capex"]);
        let high: Vec<&str> = t.ideas_by_conviction(4).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(high, vec!["msft-cloud", "t-dividend"]);
    }

    #[test]
    fn test_update_prices_only_touches_quoted_symbols() {
        let mut t = tracker();
        let quotes: BTreeMap<String, f64> = [("MSFT".to_string(), 440.0)].into_iter().collect();
        t.update_prices(&quotes);
        assert_eq!(t.get_idea("msft-cloud").unwrap().current_price, Some(440.0));
        assert_eq!(t.get_idea("xom-capex").unwrap().current_price, None);
        assert_relative_eq!(
            t.get_idea("msft-cloud").unwrap().return_pct().unwrap(),
            0.10,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_add_idea_validation() {
        let mut t = IdeaTracker::new();
        assert!(t.add_idea(Idea::new("", "X", "")).is_err());
        assert!(t.add_idea(Idea::new("a", "X", "").conviction(0)).is_err());
        assert!(t.add_idea(Idea::new("a", "X", "").conviction(6)).is_err());
        assert!(t.get_idea("a").is_none());
    }

    #[test]
    fn test_performance_starts_at_entry() {
        let t = tracker();
        let dates = [day(1), day(4), day(5), day(6), day(7)];
        let prices = [390.0, 400.0, 420.0, 399.0, 410.0];
        let perf = t
            .calculate_idea_performance("msft-cloud", &prices, &dates)
            .unwrap()
            .unwrap();
        assert_eq!(perf.days_held, 4);
        assert_relative_eq!(perf.total_return, 0.025, epsilon = 1e-12);
        assert_eq!(perf.max_price, 420.0);
        assert_eq!(perf.min_price, 399.0);
        assert_relative_eq!(perf.max_drawdown, -21.0 / 420.0, epsilon = 1e-12);
        assert!(perf.volatility > 0.0);
    }

    #[test]
    fn test_performance_without_window() {
        let t = tracker();
        let dates = [day(1), day(2)];
        let prices = [100.0, 101.0];
        // no entry date
        assert_eq!(t.calculate_idea_performance("xom-capex", &prices, &dates).unwrap(), None);
        // every date before entry
        assert_eq!(t.calculate_idea_performance("msft-cloud", &prices, &dates).unwrap(), None);
        assert!(t.calculate_idea_performance("missing", &prices, &dates).is_err());
        assert!(t.calculate_idea_performance("msft-cloud", &prices, &dates[..1]).is_err());
    }

    #[test]
    fn test_idea_defaults_from_json() {
        let idea: Idea =
            serde_json::from_str(r#"{"id": "a", "symbol": "AAPL", "thesis": "services mix"}"#).unwrap();
        assert_eq!(idea.conviction, 3);
        assert_eq!(idea.status, IdeaStatus::Active);
        assert!(idea.catalysts.is_empty());
    }
}
