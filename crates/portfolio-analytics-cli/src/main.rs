mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::attribution::{AttributionArgs, IdeasArgs};
use commands::liquidity::{LiquidityArgs, MarketImpactArgs};
use commands::optimization::{
    BlackLittermanArgs, FrontierArgs, OptimizeArgs, RiskContributionArgs, RiskParityArgs,
};
use commands::risk::{RiskMetricsArgs, VarArgs};
use commands::stress::{MonteCarloArgs, ScenariosArgs, StressArgs};

/// Portfolio risk, optimization, attribution and stress analytics
#[derive(Parser)]
#[command(
    name = "pa",
    version,
    about = "Portfolio risk, optimization, attribution and stress analytics",
    long_about = "A CLI for portfolio quantitative analytics: VaR and risk ratios, \
                  constrained mean-variance, risk parity and Black-Litterman \
                  optimization, Brinson and factor attribution, scenario stress \
                  tests, Monte Carlo simulation and liquidity estimates."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// YAML file with engine configuration
    #[arg(long, global = true)]
    config: Option<String>,

    /// Annual risk-free rate, overriding the configuration
    #[arg(long, global = true, allow_hyphen_values = true)]
    risk_free_rate: Option<f64>,

    /// Random seed for Monte Carlo computations, overriding the configuration
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full risk metric set for a return series
    RiskMetrics(RiskMetricsArgs),
    /// Value at Risk and expected shortfall
    Var(VarArgs),
    /// Constrained mean-variance optimization
    Optimize(OptimizeArgs),
    /// Risk-parity (equal or budgeted risk contribution) weights
    RiskParity(RiskParityArgs),
    /// Black-Litterman posterior returns and allocation
    BlackLitterman(BlackLittermanArgs),
    /// Trace the efficient frontier
    Frontier(FrontierArgs),
    /// Marginal and total risk contribution of a portfolio
    RiskContribution(RiskContributionArgs),
    /// Sector, factor, alpha/beta, timing and cost attribution
    Attribution(AttributionArgs),
    /// Investment idea book with return, upside and risk/reward
    Ideas(IdeasArgs),
    /// Apply stress scenarios to portfolio exposures
    Stress(StressArgs),
    /// List the built-in stress scenarios
    Scenarios(ScenariosArgs),
    /// Monte Carlo simulation of portfolio value
    MonteCarlo(MonteCarloArgs),
    /// Estimate market impact of a single order
    MarketImpact(MarketImpactArgs),
    /// Portfolio liquidity score and crowding
    Liquidity(LiquidityArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = match input::config::load_config(cli.config.as_deref(), cli.risk_free_rate, cli.seed) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::RiskMetrics(args) => commands::risk::run_risk_metrics(args, &config),
        Commands::Var(args) => commands::risk::run_var(args, &config),
        Commands::Optimize(args) => commands::optimization::run_optimize(args, &config),
        Commands::RiskParity(args) => commands::optimization::run_risk_parity(args, &config),
        Commands::BlackLitterman(args) => commands::optimization::run_black_litterman(args, &config),
        Commands::Frontier(args) => commands::optimization::run_frontier(args, &config),
        Commands::RiskContribution(args) => commands::optimization::run_risk_contribution(args, &config),
        Commands::Attribution(args) => commands::attribution::run_attribution(args, &config),
        Commands::Ideas(args) => commands::attribution::run_ideas(args),
        Commands::Stress(args) => commands::stress::run_stress(args, &config),
        Commands::Scenarios(args) => commands::stress::run_scenarios(args, &config),
        Commands::MonteCarlo(args) => commands::stress::run_monte_carlo(args, &config),
        Commands::MarketImpact(args) => commands::liquidity::run_market_impact(args),
        Commands::Liquidity(args) => commands::liquidity::run_liquidity(args),
        Commands::Version => {
            println!("pa {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
