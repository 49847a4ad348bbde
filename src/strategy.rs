// src/strategy.rs
//! Pricing method selection
//!
//! The set of supported methods is closed: adding one means adding a
//! variant and its arm in `PricingMethod::price`.

use crate::analytics::{bs_analytic, merton_series};
use crate::error::SdeResult;
use crate::math_utils::Timer;
use crate::mc::mc_engine::{MonteCarloPricer, PricingResult};
use crate::mc::parallel;
use crate::mc::paths::PathGenerator;
use crate::params::{ParameterSet, Parallelism};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingMethod {
    /// Euler-Maruyama jump-diffusion simulation, sequential or sharded per
    /// the simulation config.
    MonteCarlo,
    /// Diffusion-only Black-Scholes-Merton; ignores the jump parameters.
    BlackScholes,
    /// Merton (1976) closed-form series for lognormal jumps.
    MertonSeries,
}

impl PricingMethod {
    pub const ALL: [PricingMethod; 3] = [
        PricingMethod::MonteCarlo,
        PricingMethod::BlackScholes,
        PricingMethod::MertonSeries,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PricingMethod::MonteCarlo => "monte-carlo",
            PricingMethod::BlackScholes => "black-scholes",
            PricingMethod::MertonSeries => "merton-series",
        }
    }

    pub fn is_analytic(&self) -> bool {
        !matches!(self, PricingMethod::MonteCarlo)
    }

    pub fn price(&self, params: &ParameterSet) -> SdeResult<PricingResult> {
        match self {
            PricingMethod::MonteCarlo => match params.config().parallelism() {
                Parallelism::Sequential => {
                    let generator =
                        PathGenerator::new(params.market(), params.jumps(), params.config())?;
                    MonteCarloPricer::new(params).price(generator)
                }
                Parallelism::Sharded { shards, threads } => {
                    parallel::price_sharded(params, shards, threads)
                }
            },
            PricingMethod::BlackScholes => {
                let timer = Timer::new();
                let price = bs_analytic::reference_price(params.market(), params.option());
                let result = PricingResult::analytic(price, self.name(), timer.elapsed());
                info!(price = result.price, method = self.name(), "analytic pricing finished");
                Ok(result)
            }
            PricingMethod::MertonSeries => {
                let timer = Timer::new();
                let price =
                    merton_series::merton_price(params.market(), params.jumps(), params.option())?;
                let result = PricingResult::analytic(price, self.name(), timer.elapsed());
                info!(price = result.price, method = self.name(), "analytic pricing finished");
                Ok(result)
            }
        }
    }
}

impl std::str::FromStr for PricingMethod {
    type Err = crate::error::SdeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PricingMethod::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| crate::error::SdeError::InvalidConfiguration {
                field: "method".to_string(),
                reason: format!("unknown pricing method '{}'", s),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{JumpParameters, MarketParameters, OptionSpec, SimulationConfig};

    #[test]
    fn test_names_round_trip() {
        for method in PricingMethod::ALL {
            assert_eq!(method.name().parse::<PricingMethod>().unwrap(), method);
        }
        assert!("binomial".parse::<PricingMethod>().unwrap_err().is_validation());
    }

    #[test]
    fn test_analytic_methods_report_no_sampling_error() {
        let params = ParameterSet::new(
            MarketParameters::new(100.0, 0.05, 0.0, 0.2).unwrap(),
            JumpParameters::new(0.5, -0.1, 0.1).unwrap(),
            OptionSpec::call(100.0, 1.0).unwrap(),
            SimulationConfig::new(10, 10, 1.0).unwrap(),
        )
        .unwrap();
        for method in [PricingMethod::BlackScholes, PricingMethod::MertonSeries] {
            let result = method.price(&params).unwrap();
            assert!(method.is_analytic());
            assert_eq!(result.std_error, 0.0);
            assert_eq!(result.paths, 0);
            assert_eq!(result.method, method.name());
        }
    }
}
