// src/config.rs
//! TOML pricing requests
//!
//! ```toml
//! [market]
//! spot = 100.0
//! rate = 0.05
//! dividend_yield = 0.0
//! volatility = 0.2
//!
//! [jumps]
//! intensity = 0.75
//! mean = -0.6
//! volatility = 0.25
//!
//! [option]
//! strike = 100.0
//! maturity = 1.0
//! kind = "call"
//!
//! [simulation]
//! steps = 50
//! paths = 200000
//! seed = 42
//! shards = 8
//!
//! [budget]
//! time_limit_ms = 30000
//! ```
//!
//! The simulation horizon is the option maturity. `[jumps]` and `[budget]`
//! are optional; omitting `shards` runs sequentially.

use crate::error::{SdeError, SdeResult};
use crate::params::{
    Budget, JumpParameters, MarketParameters, OptionKind, OptionSpec, ParameterSet, Parallelism,
    SimulationConfig,
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarketSection {
    pub spot: f64,
    pub rate: f64,
    #[serde(default)]
    pub dividend_yield: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JumpSection {
    #[serde(default)]
    pub intensity: f64,
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub volatility: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionSection {
    pub strike: f64,
    pub maturity: f64,
    #[serde(default = "default_kind")]
    pub kind: OptionKind,
}

fn default_kind() -> OptionKind {
    OptionKind::Call
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    pub steps: usize,
    pub paths: usize,
    pub seed: Option<u64>,
    /// Number of independently seeded shards; absent means sequential.
    pub shards: Option<usize>,
    /// Worker threads for sharded runs (default: all cores).
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetSection {
    pub max_paths: Option<usize>,
    pub max_steps: Option<u64>,
    pub time_limit_ms: Option<u64>,
}

/// Complete pricing request as read from a TOML file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PricingRequest {
    pub market: MarketSection,
    #[serde(default)]
    pub jumps: JumpSection,
    pub option: OptionSection,
    pub simulation: SimulationSection,
    #[serde(default)]
    pub budget: BudgetSection,
}

impl PricingRequest {
    pub fn from_toml_str(s: &str) -> SdeResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> SdeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SdeError::Config {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn budget(&self) -> Budget {
        let mut budget = Budget::unlimited();
        if let Some(max_paths) = self.budget.max_paths {
            budget = budget.with_max_paths(max_paths);
        }
        if let Some(max_steps) = self.budget.max_steps {
            budget = budget.with_max_steps(max_steps);
        }
        if let Some(ms) = self.budget.time_limit_ms {
            budget = budget.with_time_limit(Duration::from_millis(ms));
        }
        budget
    }

    pub fn parallelism(&self) -> Parallelism {
        match (self.simulation.shards, self.simulation.threads) {
            (None, _) => Parallelism::Sequential,
            (Some(shards), None) => Parallelism::sharded(shards),
            (Some(shards), Some(threads)) => Parallelism::Sharded { shards, threads },
        }
    }

    /// Run every constructor's validation and bundle the result.
    pub fn into_parameter_set(&self) -> SdeResult<ParameterSet> {
        let market = MarketParameters::new(
            self.market.spot,
            self.market.rate,
            self.market.dividend_yield,
            self.market.volatility,
        )?;
        let jumps = JumpParameters::new(
            self.jumps.intensity,
            self.jumps.mean,
            self.jumps.volatility,
        )?;
        let option = OptionSpec::new(self.option.strike, self.option.maturity, self.option.kind)?;

        let mut config =
            SimulationConfig::new(self.simulation.steps, self.simulation.paths, option.maturity())?
                .with_budget(self.budget())
                .with_parallelism(self.parallelism())?;
        if let Some(seed) = self.simulation.seed {
            config = config.with_seed(seed);
        }

        ParameterSet::new(market, jumps, option, config)
    }
}
