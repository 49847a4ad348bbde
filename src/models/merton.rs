// src/models/merton.rs
//! Merton (1976) Jump-Diffusion Model
//!
//! # Mathematical Framework
//!
//! Under the risk-neutral measure the log-price follows
//! ```text
//! d ln S_t = (r - q - σ²/2 - λκ) dt + σ dW_t + dJ_t
//! ```
//! where `J_t` is a compound Poisson process with intensity λ whose jumps are
//! Normal(μⱼ, σⱼ²) in log space, and
//! ```text
//! κ = E[e^Y - 1] = exp(μⱼ + σⱼ²/2) - 1
//! ```
//! is the expected relative jump size. Subtracting λκ from the drift makes
//! `e^{-(r-q)t} S_t` a martingale, so `E[S_T] = S_0 e^{(r-q)T}` whatever the
//! jump parameters are.

use crate::params::{JumpParameters, MarketParameters};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MertonJumpDiffusion {
    pub market: MarketParameters,
    pub jumps: JumpParameters,
}

impl MertonJumpDiffusion {
    pub fn new(market: MarketParameters, jumps: JumpParameters) -> Self {
        MertonJumpDiffusion { market, jumps }
    }

    pub fn spot(&self) -> f64 {
        self.market.spot()
    }

    /// Compensated log-drift per unit time: r − q − σ²/2 − λκ.
    ///
    /// Not finite when κ overflows; the time-stepping scheme reports that as
    /// numerical instability on the first step.
    pub fn log_drift(&self) -> f64 {
        let sigma = self.market.volatility();
        self.market.rate() - self.market.dividend_yield() - 0.5 * sigma * sigma
            - self.jumps.drift_compensation()
    }

    pub fn diffusion(&self) -> f64 {
        self.market.volatility()
    }

    /// E[ln(S_t / S_0)] including the mean jump contribution λμⱼt.
    pub fn expected_log_return(&self, t: f64) -> f64 {
        (self.log_drift() + self.jumps.intensity() * self.jumps.mean()) * t
    }

    /// Risk-neutral forward E[S_t] = S_0 e^{(r−q)t}.
    pub fn forward(&self, t: f64) -> f64 {
        self.spot() * ((self.market.rate() - self.market.dividend_yield()) * t).exp()
    }
}
