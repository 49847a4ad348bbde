// src/mc/payoffs.rs
//! Option Payoff Functions
//!
//! # Mathematical Definitions
//!
//! - **Call**: max(S_T - K, 0)
//! - **Put**: max(K - S_T, 0)
//!
//! `PayoffEvaluator` binds a payoff to the discount factor e^(-rT) so the
//! pricer can map each terminal price straight to a present value.

use crate::params::{MarketParameters, OptionKind, OptionSpec};
use std::f64;

/// Enumeration of supported European payoffs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payoff {
    /// European call option: max(S_T - K, 0)
    EuropeanCall { k: f64 },

    /// European put option: max(K - S_T, 0)
    EuropeanPut { k: f64 },
}

impl Payoff {
    pub fn from_spec(option: &OptionSpec) -> Self {
        match option.kind() {
            OptionKind::Call => Payoff::EuropeanCall { k: option.strike() },
            OptionKind::Put => Payoff::EuropeanPut { k: option.strike() },
        }
    }

    /// Undiscounted payoff at terminal price `s_t`.
    ///
    /// Non-finite input propagates (NaN stays NaN, +inf call payoff is +inf).
    pub fn calculate(&self, s_t: f64) -> f64 {
        match self {
            Payoff::EuropeanCall { k } => (s_t - k).max(0.0),
            Payoff::EuropeanPut { k } => (k - s_t).max(0.0),
        }
    }
}

/// Maps a terminal price to its discounted payoff e^(-rT) · payoff(S_T)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoffEvaluator {
    payoff: Payoff,
    discount: f64,
}

impl PayoffEvaluator {
    pub fn new(payoff: Payoff, rate: f64, maturity: f64) -> Self {
        PayoffEvaluator {
            payoff,
            discount: (-rate * maturity).exp(),
        }
    }

    pub fn for_option(option: &OptionSpec, market: &MarketParameters) -> Self {
        Self::new(Payoff::from_spec(option), market.rate(), option.maturity())
    }

    pub fn payoff(&self) -> Payoff {
        self.payoff
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn discounted(&self, s_t: f64) -> f64 {
        // f64::max drops NaN, so propagate it explicitly
        if s_t.is_nan() {
            return f64::NAN;
        }
        self.discount * self.payoff.calculate(s_t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_and_put_payoffs() {
        let call = Payoff::EuropeanCall { k: 100.0 };
        let put = Payoff::EuropeanPut { k: 100.0 };
        assert_eq!(call.calculate(120.0), 20.0);
        assert_eq!(call.calculate(80.0), 0.0);
        assert_eq!(put.calculate(80.0), 20.0);
        assert_eq!(put.calculate(120.0), 0.0);
    }

    #[test]
    fn test_discounting() {
        let evaluator = PayoffEvaluator::new(Payoff::EuropeanCall { k: 100.0 }, 0.05, 2.0);
        let expected = (-0.1_f64).exp() * 10.0;
        assert!((evaluator.discounted(110.0) - expected).abs() < 1e-12);
        assert_eq!(evaluator.discounted(90.0), 0.0);
    }

    #[test]
    fn test_non_finite_inputs_propagate() {
        let evaluator = PayoffEvaluator::new(Payoff::EuropeanCall { k: 100.0 }, 0.05, 1.0);
        assert!(evaluator.discounted(f64::NAN).is_nan());
        assert!(evaluator.discounted(f64::INFINITY).is_infinite());
    }

    #[test]
    fn test_from_spec() {
        let put = OptionSpec::put(95.0, 0.5).unwrap();
        assert_eq!(Payoff::from_spec(&put), Payoff::EuropeanPut { k: 95.0 });
    }
}
