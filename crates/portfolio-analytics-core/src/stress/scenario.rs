use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AnalyticsError;
use crate::types::{Bps, Rate};

/// Scenario keys mapped to their definitions.
pub type ScenarioCatalog = BTreeMap<String, Scenario>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    /// Replay of a past market event.
    Historical,
    /// Stylised shock with no specific date.
    Hypothetical,
    /// User-defined.
    Custom,
}

impl FromStr for ScenarioType {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "historical" => Ok(ScenarioType::Historical),
            "hypothetical" => Ok(ScenarioType::Hypothetical),
            "custom" => Ok(ScenarioType::Custom),
            other => Err(AnalyticsError::invalid(
                "scenario_type",
                format!("Unknown scenario type: {other}"),
            )),
        }
    }
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScenarioType::Historical => "historical",
            ScenarioType::Hypothetical => "hypothetical",
            ScenarioType::Custom => "custom",
        })
    }
}

/// A set of simultaneous market shocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub scenario_type: ScenarioType,
    #[serde(default)]
    pub description: String,
    /// Equity market move as a fraction (-0.20 = -20%).
    #[serde(default)]
    pub equity_shock: Rate,
    #[serde(default)]
    pub rates_shock_bps: Bps,
    #[serde(default)]
    pub credit_spread_shock_bps: Bps,
    /// Currency pair -> fractional move.
    #[serde(default)]
    pub fx_shocks: BTreeMap<String, Rate>,
    /// Commodity -> fractional move.
    #[serde(default)]
    pub commodity_shocks: BTreeMap<String, Rate>,
    /// Implied volatility change in vol points.
    #[serde(default)]
    pub volatility_shock: f64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl Scenario {
    /// A scenario with every shock at zero.
    pub fn new(name: impl Into<String>, scenario_type: ScenarioType, description: impl Into<String>) -> Self {
        Scenario {
            name: name.into(),
            scenario_type,
            description: description.into(),
            equity_shock: 0.0,
            rates_shock_bps: 0.0,
            credit_spread_shock_bps: 0.0,
            fx_shocks: BTreeMap::new(),
            commodity_shocks: BTreeMap::new(),
            volatility_shock: 0.0,
            start_date: None,
            end_date: None,
        }
    }

    pub fn equity(mut self, shock: Rate) -> Self {
        self.equity_shock = shock;
        self
    }

    pub fn rates(mut self, bps: Bps) -> Self {
        self.rates_shock_bps = bps;
        self
    }

    pub fn credit(mut self, bps: Bps) -> Self {
        self.credit_spread_shock_bps = bps;
        self
    }

    pub fn volatility(mut self, points: f64) -> Self {
        self.volatility_shock = points;
        self
    }

    pub fn fx(mut self, shocks: &[(&str, Rate)]) -> Self {
        self.fx_shocks = to_map(shocks);
        self
    }

    pub fn commodities(mut self, shocks: &[(&str, Rate)]) -> Self {
        self.commodity_shocks = to_map(shocks);
        self
    }

    pub fn period(mut self, start: (i32, u32, u32), end: (i32, u32, u32)) -> Self {
        self.start_date = NaiveDate::from_ymd_opt(start.0, start.1, start.2);
        self.end_date = NaiveDate::from_ymd_opt(end.0, end.1, end.2);
        self
    }
}

fn to_map(entries: &[(&str, Rate)]) -> BTreeMap<String, Rate> {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Replays of past market events.
pub fn historical_scenarios() -> ScenarioCatalog {
    use ScenarioType::Historical;
    [
        (
            "GFC_2008",
            Scenario::new("Global Financial Crisis 2008", Historical, "Sept-Nov 2008 financial crisis period")
                .equity(-0.45)
                .rates(-200.0)
                .credit(500.0)
                .volatility(60.0)
                .period((2008, 9, 15), (2008, 11, 20)),
        ),
        (
            "COVID_2020",
            Scenario::new("COVID Crash 2020", Historical, "Feb-Mar 2020 pandemic crash")
                .equity(-0.35)
                .rates(-150.0)
                .credit(350.0)
                .volatility(65.0)
                .period((2020, 2, 19), (2020, 3, 23)),
        ),
        (
            "DOTCOM_2000",
            Scenario::new("Dot-Com Crash 2000", Historical, "Tech bubble burst 2000-2002")
                .equity(-0.50)
                .rates(-300.0)
                .credit(200.0)
                .volatility(30.0)
                .period((2000, 3, 10), (2002, 10, 9)),
        ),
        (
            "INFLATION_2022",
            Scenario::new("Inflation Spike 2022", Historical, "2022 inflation and rate hiking cycle")
                .equity(-0.25)
                .rates(300.0)
                .credit(150.0)
                .volatility(15.0)
                .period((2022, 1, 1), (2022, 10, 12)),
        ),
        (
            "FED_TAPER_2013",
            Scenario::new("Taper Tantrum 2013", Historical, "Fed tightening announcement shock")
                .equity(-0.08)
                .rates(100.0)
                .credit(50.0)
                .volatility(8.0)
                .period((2013, 5, 22), (2013, 8, 30)),
        ),
        (
            "OIL_CRASH_2014",
            Scenario::new("Oil Price Crash 2014-2015", Historical, "Oil price collapse from $100+ to below $30")
                .equity(-0.10)
                .rates(-50.0)
                .credit(200.0)
                .commodities(&[("OIL", -0.70), ("NATURAL_GAS", -0.30)])
                .period((2014, 6, 20), (2016, 2, 11)),
        ),
        (
            "CHINA_DEVALUATION_2015",
            Scenario::new("China Devaluation 2015", Historical, "China CNY devaluation and growth concerns")
                .equity(-0.12)
                .rates(-25.0)
                .credit(100.0)
                .fx(&[("USD/CNY", 0.05), ("USD/EUR", -0.03)])
                .period((2015, 8, 11), (2016, 2, 11)),
        ),
    ]
    .into_iter()
    .map(|(k, s)| (k.to_string(), s))
    .collect()
}

/// Stylised shocks not tied to a date.
pub fn hypothetical_scenarios() -> ScenarioCatalog {
    use ScenarioType::Hypothetical;
    [
        (
            "RATES_UP_200",
            Scenario::new("Rates +200bps", Hypothetical, "Parallel shift up in rates by 200 basis points")
                .equity(-0.10)
                .rates(200.0)
                .credit(50.0),
        ),
        (
            "RATES_DOWN_200",
            Scenario::new("Rates -200bps", Hypothetical, "Parallel shift down in rates by 200 basis points")
                .equity(0.05)
                .rates(-200.0)
                .credit(-25.0),
        ),
        (
            "EQUITY_VOL_40",
            Scenario::new("Equity Vol +40", Hypothetical, "VIX spike to 40")
                .equity(-0.15)
                .volatility(40.0)
                .credit(100.0),
        ),
        (
            "EQUITY_VOL_80",
            Scenario::new("Equity Vol +80", Hypothetical, "VIX spike to 80 (crisis level)")
                .equity(-0.30)
                .volatility(80.0)
                .credit(250.0),
        ),
        (
            "EQUITY_VOL_120",
            Scenario::new("Equity Vol +120", Hypothetical, "VIX spike to 120 (extreme crisis)")
                .equity(-0.45)
                .volatility(120.0)
                .credit(500.0),
        ),
        (
            "CREDIT_CRISIS",
            Scenario::new("Credit Crisis", Hypothetical, "Major credit spread widening")
                .equity(-0.20)
                .rates(-100.0)
                .credit(400.0),
        ),
        (
            "STAGFLATION",
            Scenario::new("Stagflation", Hypothetical, "High inflation with weak growth")
                .equity(-0.25)
                .rates(150.0)
                .credit(200.0)
                .commodities(&[("OIL", 0.40), ("GOLD", 0.20)]),
        ),
        (
            "USD_CRISIS",
            Scenario::new("USD Crisis", Hypothetical, "Major USD weakness")
                .equity(-0.10)
                .rates(50.0)
                .fx(&[("USD/EUR", -0.15), ("USD/JPY", -0.10), ("USD/GBP", -0.12)]),
        ),
        (
            "EM_CONTAGION",
            Scenario::new("EM Contagion", Hypothetical, "Emerging market crisis with contagion")
                .equity(-0.20)
                .rates(-50.0)
                .credit(300.0)
                .fx(&[("USD/BRL", 0.25), ("USD/MXN", 0.20), ("USD/ZAR", 0.30)]),
        ),
        (
            "COMMODITY_CRASH",
            Scenario::new("Commodity Crash", Hypothetical, "Broad commodity price collapse")
                .equity(-0.15)
                .rates(-100.0)
                .commodities(&[("OIL", -0.40), ("COPPER", -0.30), ("IRON_ORE", -0.35)]),
        ),
    ]
    .into_iter()
    .map(|(k, s)| (k.to_string(), s))
    .collect()
}

/// Historical and hypothetical scenarios together.
pub fn default_catalog() -> ScenarioCatalog {
    let mut catalog = historical_scenarios();
    catalog.extend(hypothetical_scenarios());
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_sizes() {
        assert_eq!(historical_scenarios().len(), 7);
        assert_eq!(hypothetical_scenarios().len(), 10);
        assert_eq!(default_catalog().len(), 17);
    }

    #[test]
    fn test_gfc_definition() {
        let cat = historical_scenarios();
        let gfc = &cat["GFC_2008"];
        assert_eq!(gfc.equity_shock, -0.45);
        assert_eq!(gfc.rates_shock_bps, -200.0);
        assert_eq!(gfc.credit_spread_shock_bps, 500.0);
        assert_eq!(gfc.volatility_shock, 60.0);
        assert_eq!(gfc.start_date, NaiveDate::from_ymd_opt(2008, 9, 15));
        assert_eq!(gfc.end_date, NaiveDate::from_ymd_opt(2008, 11, 20));
    }

    #[test]
    fn test_hypothetical_have_no_dates() {
        for s in hypothetical_scenarios().values() {
            assert_eq!(s.scenario_type, ScenarioType::Hypothetical);
            assert!(s.start_date.is_none());
        }
    }

    #[test]
    fn test_shock_maps() {
        let cat = default_catalog();
        assert_eq!(cat["USD_CRISIS"].fx_shocks.len(), 3);
        assert_eq!(cat["OIL_CRASH_2014"].commodity_shocks["OIL"], -0.70);
        assert!(cat["GFC_2008"].fx_shocks.is_empty());
    }

    #[test]
    fn test_custom_scenario_from_json() {
        let s: Scenario = serde_json::from_str(
            r#"{ "name": "Tech selloff", "scenario_type": "custom", "equity_shock": -0.3 }"#,
        )
        .unwrap();
        assert_eq!(s.scenario_type, ScenarioType::Custom);
        assert_eq!(s.rates_shock_bps, 0.0);
        assert!(s.commodity_shocks.is_empty());
    }

    #[test]
    fn test_scenario_type_parse() {
        assert_eq!("Historical".parse::<ScenarioType>().unwrap(), ScenarioType::Historical);
        assert!("imaginary".parse::<ScenarioType>().is_err());
    }
}
