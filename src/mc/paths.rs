// src/mc/paths.rs
//! Lazy Path Generation
//!
//! `PathGenerator` yields one terminal price per requested path, simulating
//! each path only when the consumer asks for it. Only the running
//! `PathState` of the current path is held in memory.
//!
//! A generator is single-use: once it has yielded `paths` values (or an
//! error) it stays exhausted. Restarting means building a new generator,
//! which with the same seed replays the same sequence.
//!
//! `SamplePaths` and `collect_paths` expose full intermediate price paths for
//! plotting and diagnostics; pricing never needs them.

use crate::error::{SdeError, SdeResult};
use crate::models::merton::MertonJumpDiffusion;
use crate::params::{JumpParameters, MarketParameters, SimulationConfig};
use crate::rng::RngFactory;
use crate::solvers::euler_maruyama::{EulerMaruyama, PathState};
use ndarray::Array2;
use rand::rngs::StdRng;
use std::iter::FusedIterator;
use std::ops::Range;
use tracing::debug;

/// Scheme plus the random stream shared by every path it simulates.
#[derive(Debug, Clone)]
struct Simulator {
    spot: f64,
    steps: usize,
    scheme: EulerMaruyama,
    rng: StdRng,
}

impl Simulator {
    fn new(
        market: &MarketParameters,
        jumps: &JumpParameters,
        steps: usize,
        horizon: f64,
        rng: StdRng,
    ) -> SdeResult<Self> {
        let model = MertonJumpDiffusion::new(*market, *jumps);
        let scheme = EulerMaruyama::new(&model, horizon / steps as f64)?;
        Ok(Simulator {
            spot: market.spot(),
            steps,
            scheme,
            rng,
        })
    }

    /// Run path `path` to maturity, reporting the price after every step.
    fn simulate<F: FnMut(f64)>(&mut self, path: usize, mut observe: F) -> SdeResult<f64> {
        let mut state = PathState::new(path);
        for _ in 0..self.steps {
            self.scheme.step(&mut state, &mut self.rng)?;
            observe(state.price(self.spot));
        }
        let terminal = state.price(self.spot);
        if !terminal.is_finite() {
            return Err(SdeError::instability(
                path,
                self.steps - 1,
                format!(
                    "terminal price overflowed (log-price {})",
                    state.log_price
                ),
            ));
        }
        Ok(terminal)
    }
}

/// Lazy, finite stream of simulated terminal prices
#[derive(Debug, Clone)]
pub struct PathGenerator {
    simulator: Simulator,
    first_path: usize,
    paths: usize,
    next_path: usize,
    exhausted: bool,
}

impl PathGenerator {
    /// Generator over `config.paths()` paths of `config.steps()` Euler steps
    /// to `config.horizon()`, drawing from the configured seed (or entropy).
    pub fn new(
        market: &MarketParameters,
        jumps: &JumpParameters,
        config: &SimulationConfig,
    ) -> SdeResult<Self> {
        let rng = RngFactory::new(config.seed()).create_std_rng();
        debug!(
            spot = market.spot(),
            volatility = market.volatility(),
            intensity = jumps.intensity(),
            jump_mean = jumps.mean(),
            jump_volatility = jumps.volatility(),
            steps = config.steps(),
            paths = config.paths(),
            seed = ?config.seed(),
            "path generator created"
        );
        Self::with_rng(
            market,
            jumps,
            config.steps(),
            0..config.paths(),
            config.horizon(),
            rng,
        )
    }

    /// Generator over the global path indices `paths`, drawing from a
    /// caller-supplied stream (used by shards).
    pub(crate) fn with_rng(
        market: &MarketParameters,
        jumps: &JumpParameters,
        steps: usize,
        paths: Range<usize>,
        horizon: f64,
        rng: StdRng,
    ) -> SdeResult<Self> {
        let first_path = paths.start;
        let paths = paths.len();
        Ok(PathGenerator {
            simulator: Simulator::new(market, jumps, steps, horizon, rng)?,
            first_path,
            paths,
            next_path: 0,
            exhausted: paths == 0,
        })
    }

    /// Paths still to be produced.
    pub fn remaining(&self) -> usize {
        if self.exhausted {
            0
        } else {
            self.paths - self.next_path
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl Iterator for PathGenerator {
    type Item = SdeResult<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let path = self.first_path + self.next_path;
        let result = self.simulator.simulate(path, |_| {});
        self.next_path += 1;
        if result.is_err() || self.next_path >= self.paths {
            self.exhausted = true;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl FusedIterator for PathGenerator {}

/// Lazy stream of full price paths `[S_0, S_Δt, ..., S_T]`
#[derive(Debug, Clone)]
pub struct SamplePaths {
    simulator: Simulator,
    paths: usize,
    next_path: usize,
    exhausted: bool,
}

impl SamplePaths {
    pub fn new(
        market: &MarketParameters,
        jumps: &JumpParameters,
        config: &SimulationConfig,
    ) -> SdeResult<Self> {
        let rng = RngFactory::new(config.seed()).create_std_rng();
        Ok(SamplePaths {
            simulator: Simulator::new(
                market,
                jumps,
                config.steps(),
                config.horizon(),
                rng,
            )?,
            paths: config.paths(),
            next_path: 0,
            exhausted: false,
        })
    }
}

impl Iterator for SamplePaths {
    type Item = SdeResult<Vec<f64>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let path = self.next_path;
        let mut prices = Vec::with_capacity(self.simulator.steps + 1);
        prices.push(self.simulator.spot);
        let result = self
            .simulator
            .simulate(path, |price| prices.push(price))
            .map(|_| prices);
        self.next_path += 1;
        if result.is_err() || self.next_path >= self.paths {
            self.exhausted = true;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.exhausted {
            0
        } else {
            self.paths - self.next_path
        };
        (remaining, Some(remaining))
    }
}

impl FusedIterator for SamplePaths {}

/// Materialize the first `n` paths (capped at `config.paths()`) as an
/// `n × (steps + 1)` array, one path per row.
pub fn collect_paths(
    market: &MarketParameters,
    jumps: &JumpParameters,
    config: &SimulationConfig,
    n: usize,
) -> SdeResult<Array2<f64>> {
    let rows = n.min(config.paths());
    let mut out = Array2::<f64>::zeros((rows, config.steps() + 1));
    let paths = SamplePaths::new(market, jumps, config)?;
    for (mut row, path) in out.rows_mut().into_iter().zip(paths.take(rows)) {
        let path = path?;
        for (cell, price) in row.iter_mut().zip(path) {
            *cell = price;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(seed: u64, paths: usize) -> (MarketParameters, JumpParameters, SimulationConfig) {
        (
            MarketParameters::new(100.0, 0.05, 0.0, 0.2).unwrap(),
            JumpParameters::new(0.75, -0.6, 0.25).unwrap(),
            SimulationConfig::new(12, paths, 1.0).unwrap().with_seed(seed),
        )
    }

    #[test]
    fn test_generator_yields_exactly_paths_values() {
        let (market, jumps, config) = inputs(1, 25);
        let mut generator = PathGenerator::new(&market, &jumps, &config).unwrap();
        assert_eq!(generator.size_hint(), (25, Some(25)));

        let values: Vec<f64> = generator.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(values.len(), 25);
        assert!(values.iter().all(|s| *s > 0.0));
        assert!(generator.is_exhausted());
        assert!(generator.next().is_none());
        assert_eq!(generator.remaining(), 0);
    }

    #[test]
    fn test_sample_paths_end_at_generator_terminals() {
        let (market, jumps, config) = inputs(11, 8);
        let terminals: Vec<f64> = PathGenerator::new(&market, &jumps, &config)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        let paths: Vec<Vec<f64>> = SamplePaths::new(&market, &jumps, &config)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(paths.len(), 8);
        for (path, terminal) in paths.iter().zip(&terminals) {
            assert_eq!(path.len(), 13);
            assert_eq!(path[0], 100.0);
            assert_eq!(path.last().copied(), Some(*terminal));
        }
    }

    #[test]
    fn test_collect_paths_shape() {
        let (market, jumps, config) = inputs(5, 10);
        let paths = collect_paths(&market, &jumps, &config, 4).unwrap();
        assert_eq!(paths.dim(), (4, 13));
        assert!(paths.column(0).iter().all(|&s| s == 100.0));

        let capped = collect_paths(&market, &jumps, &config, 50).unwrap();
        assert_eq!(capped.nrows(), 10);
    }

    #[test]
    fn test_generator_stops_after_instability() {
        let market = MarketParameters::new(100.0, 0.05, 0.0, 0.2).unwrap();
        let jumps = JumpParameters::new(0.75, -0.6, 50.0).unwrap();
        let config = SimulationConfig::new(10, 100, 1.0).unwrap().with_seed(3);
        let mut generator = PathGenerator::new(&market, &jumps, &config).unwrap();

        let first = generator.next().unwrap();
        assert!(first.unwrap_err().is_numerical_instability());
        assert!(generator.next().is_none());
    }
}
