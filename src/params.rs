// src/params.rs
//! Market, jump, contract and simulation parameters
//!
//! Every type here is validated once, at construction, and is read-only
//! afterwards: fields are private and there are no setters, so a value that
//! exists is a value that passed validation. Builder-style `with_*` methods
//! consume `self` and re-validate whatever they change.

use crate::error::{validation::*, SdeError, SdeResult};
use serde::Deserialize;
use std::time::Duration;

/// Spot, rates and diffusion volatility of the underlying.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketParameters {
    spot: f64,
    rate: f64,
    dividend_yield: f64,
    volatility: f64,
}

impl MarketParameters {
    pub fn new(spot: f64, rate: f64, dividend_yield: f64, volatility: f64) -> SdeResult<Self> {
        validate_positive("spot", spot)?;
        validate_finite("rate", rate)?;
        validate_non_negative("dividend_yield", dividend_yield)?;
        validate_non_negative("volatility", volatility)?;
        Ok(Self {
            spot,
            rate,
            dividend_yield,
            volatility,
        })
    }

    pub fn spot(&self) -> f64 {
        self.spot
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn dividend_yield(&self) -> f64 {
        self.dividend_yield
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }
}

/// Compound-Poisson jump component with lognormal jump multipliers.
///
/// Log-jump sizes are Normal(μⱼ, σⱼ²), arriving at rate λ per year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpParameters {
    intensity: f64,
    mean: f64,
    volatility: f64,
}

impl JumpParameters {
    pub fn new(intensity: f64, mean: f64, volatility: f64) -> SdeResult<Self> {
        validate_non_negative("jump_intensity", intensity)?;
        validate_finite("jump_mean", mean)?;
        validate_non_negative("jump_volatility", volatility)?;
        Ok(Self {
            intensity,
            mean,
            volatility,
        })
    }

    /// Pure diffusion: no jumps ever arrive.
    pub fn none() -> Self {
        Self {
            intensity: 0.0,
            mean: 0.0,
            volatility: 0.0,
        }
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Expected relative jump size κ = E[e^J − 1] = exp(μⱼ + σⱼ²/2) − 1.
    ///
    /// Overflows to +inf for extreme σⱼ; callers check finiteness.
    pub fn compensator(&self) -> f64 {
        (self.mean + 0.5 * self.volatility * self.volatility).exp_m1()
    }

    /// Drift correction λκ that keeps the discounted price a martingale.
    ///
    /// Exactly zero without jumps, even when κ itself is not finite.
    pub fn drift_compensation(&self) -> f64 {
        if self.intensity == 0.0 {
            0.0
        } else {
            self.intensity * self.compensator()
        }
    }

    pub fn has_jumps(&self) -> bool {
        self.intensity > 0.0
    }
}

impl Default for JumpParameters {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

/// European option terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionSpec {
    strike: f64,
    maturity: f64,
    kind: OptionKind,
}

impl OptionSpec {
    pub fn new(strike: f64, maturity: f64, kind: OptionKind) -> SdeResult<Self> {
        validate_positive("strike", strike)?;
        validate_positive("maturity", maturity)?;
        Ok(Self {
            strike,
            maturity,
            kind,
        })
    }

    pub fn call(strike: f64, maturity: f64) -> SdeResult<Self> {
        Self::new(strike, maturity, OptionKind::Call)
    }

    pub fn put(strike: f64, maturity: f64) -> SdeResult<Self> {
        Self::new(strike, maturity, OptionKind::Put)
    }

    pub fn strike(&self) -> f64 {
        self.strike
    }

    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    pub fn kind(&self) -> OptionKind {
        self.kind
    }
}

/// Cooperative cancellation limits for one pricing call.
///
/// A run that would need more paths, more Euler steps or more wall-clock time
/// than allowed aborts with `SdeError::BudgetExceeded` instead of returning an
/// estimate built from a truncated sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Budget {
    max_paths: Option<usize>,
    max_steps: Option<u64>,
    time_limit: Option<Duration>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = Some(max_paths);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }

    pub fn max_paths(&self) -> Option<usize> {
        self.max_paths
    }

    pub fn max_steps(&self) -> Option<u64> {
        self.max_steps
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_paths.is_none() && self.max_steps.is_none() && self.time_limit.is_none()
    }
}

/// How the path count is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// One random stream, paths simulated in order.
    #[default]
    Sequential,
    /// Paths split into `shards` independently seeded streams, run on a
    /// pool of `threads` workers and reduced in shard order.
    Sharded { shards: usize, threads: usize },
}

impl Parallelism {
    /// Shard across every available core.
    pub fn sharded(shards: usize) -> Self {
        Parallelism::Sharded {
            shards,
            threads: num_cpus::get(),
        }
    }
}

/// Discretization and sampling settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    steps: usize,
    paths: usize,
    horizon: f64,
    seed: Option<u64>,
    budget: Budget,
    parallelism: Parallelism,
}

impl SimulationConfig {
    pub fn new(steps: usize, paths: usize, horizon: f64) -> SdeResult<Self> {
        validate_steps(steps)?;
        validate_paths(paths)?;
        validate_positive("horizon", horizon)?;
        Ok(Self {
            steps,
            paths,
            horizon,
            seed: None,
            budget: Budget::unlimited(),
            parallelism: Parallelism::Sequential,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> SdeResult<Self> {
        if let Parallelism::Sharded { shards, threads } = parallelism {
            if shards == 0 {
                return Err(SdeError::InvalidConfiguration {
                    field: "shards".to_string(),
                    reason: "must be greater than 0".to_string(),
                });
            }
            if threads == 0 {
                return Err(SdeError::InvalidConfiguration {
                    field: "threads".to_string(),
                    reason: "must be greater than 0".to_string(),
                });
            }
        }
        self.parallelism = parallelism;
        Ok(self)
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn paths(&self) -> usize {
        self.paths
    }

    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    pub fn parallelism(&self) -> Parallelism {
        self.parallelism
    }

    /// Euler step size Δt = T / n.
    pub fn dt(&self) -> f64 {
        self.horizon / self.steps as f64
    }
}

/// The complete, mutually consistent input of one pricing call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSet {
    market: MarketParameters,
    jumps: JumpParameters,
    option: OptionSpec,
    config: SimulationConfig,
}

impl ParameterSet {
    pub fn new(
        market: MarketParameters,
        jumps: JumpParameters,
        option: OptionSpec,
        config: SimulationConfig,
    ) -> SdeResult<Self> {
        let tolerance = 1e-12 * option.maturity().max(1.0);
        if (option.maturity() - config.horizon()).abs() > tolerance {
            return Err(SdeError::InvalidParameters {
                parameter: "horizon".to_string(),
                value: config.horizon(),
                constraint: format!("must equal option maturity ({})", option.maturity()),
            });
        }
        Ok(Self {
            market,
            jumps,
            option,
            config,
        })
    }

    pub fn market(&self) -> &MarketParameters {
        &self.market
    }

    pub fn jumps(&self) -> &JumpParameters {
        &self.jumps
    }

    pub fn option(&self) -> &OptionSpec {
        &self.option
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}
