// src/pricing.rs
//! Public entry points of the pricing core
//!
//! These three functions are the whole surface the surrounding application
//! (command line, file I/O, reporting) is expected to call.

use crate::analytics::bs_analytic;
use crate::error::SdeResult;
use crate::mc::mc_engine::PricingResult;
use crate::mc::paths::PathGenerator;
use crate::params::{JumpParameters, MarketParameters, OptionSpec, ParameterSet, SimulationConfig};
use crate::strategy::PricingMethod;

/// Monte Carlo price of `option` under jump-diffusion dynamics.
///
/// # Errors
///
/// - validation errors when `config.horizon()` differs from the maturity
/// - `NumericalInstability` when any path or payoff is not finite
/// - `BudgetExceeded` when the configured budget runs out first
pub fn compute_price(
    market: MarketParameters,
    jumps: JumpParameters,
    option: OptionSpec,
    config: SimulationConfig,
) -> SdeResult<PricingResult> {
    let params = ParameterSet::new(market, jumps, option, config)?;
    PricingMethod::MonteCarlo.price(&params)
}

/// Closed-form Black-Scholes-Merton price, ignoring jumps.
pub fn compute_reference_price(market: MarketParameters, option: OptionSpec) -> f64 {
    bs_analytic::reference_price(&market, &option)
}

/// Lazy stream of `config.paths()` simulated terminal prices at
/// `config.horizon()`.
pub fn stream_terminal_prices(
    market: MarketParameters,
    jumps: JumpParameters,
    config: SimulationConfig,
) -> SdeResult<PathGenerator> {
    PathGenerator::new(&market, &jumps, &config)
}
