//! # jump-sde: Monte Carlo pricing under Merton jump-diffusion
//!
//! Prices European options on an asset whose log-price follows a diffusion
//! with compound-Poisson lognormal jumps:
//!
//! ```text
//! d ln S_t = (r - q - σ²/2 - λκ) dt + σ dW_t + dJ_t,   κ = exp(μⱼ + σⱼ²/2) - 1
//! ```
//!
//! Terminal prices are produced lazily by an Euler-Maruyama stream, so memory
//! stays flat in the number of paths, and can be priced sequentially or in
//! independently seeded shards on a rayon pool. Black-Scholes-Merton and the
//! Merton (1976) series give closed-form cross-checks.
//!
//! ## Quick Start
//!
//! ```rust
//! use jump_sde::{compute_price, compute_reference_price};
//! use jump_sde::{JumpParameters, MarketParameters, OptionSpec, SimulationConfig};
//!
//! let market = MarketParameters::new(100.0, 0.05, 0.0, 0.2)?;
//! let jumps = JumpParameters::new(0.75, -0.6, 0.25)?;
//! let option = OptionSpec::call(100.0, 1.0)?;
//! let config = SimulationConfig::new(10, 20_000, 1.0)?.with_seed(42);
//!
//! let result = compute_price(market, jumps, option, config)?;
//! let bs = compute_reference_price(market, option);
//! println!("jump-diffusion {:.4} ± {:.4}, Black-Scholes {:.4}", result.price, result.std_error, bs);
//! assert!(result.price > bs);
//! # Ok::<(), jump_sde::SdeError>(())
//! ```
//!
//! ## Layout
//!
//! - [`params`] validated market, jump, option and simulation inputs
//! - [`config`] TOML pricing requests
//! - [`models`] and [`solvers`] the dynamics and the per-step scheme
//! - [`mc`] lazy path streams, payoff accumulation, sharded pricing
//! - [`analytics`] closed-form prices
//! - [`strategy`] selection between the pricing methods
//! - [`output`] CSV export, [`logging`] subscriber setup for binaries

pub mod error;
pub mod rng;
pub mod math_utils;
pub mod params;
pub mod config;
pub mod models;
pub mod solvers;
pub mod mc;
pub mod analytics;
pub mod strategy;
pub mod pricing;
pub mod output;
pub mod logging;

pub use error::{SdeError, SdeResult};
pub use mc::mc_engine::PricingResult;
pub use mc::paths::PathGenerator;
pub use params::{
    Budget, JumpParameters, MarketParameters, OptionKind, OptionSpec, ParameterSet, Parallelism,
    SimulationConfig,
};
pub use pricing::{compute_price, compute_reference_price, stream_terminal_prices};
pub use strategy::PricingMethod;
