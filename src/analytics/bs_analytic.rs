// src/analytics/bs_analytic.rs
//! Analytical Black-Scholes-Merton formulas for European options
//!
//! # Mathematical Foundation
//!
//! With a continuous dividend yield q the underlying follows
//! ```text
//! dS_t = (r - q) S_t dt + σ S_t dW_t
//! ```
//!
//! and European options have closed-form prices in terms of the cumulative
//! normal distribution Φ(x). These are the λ = 0 limit of the jump-diffusion
//! and serve as an independent check on the simulation.

use crate::math_utils::norm_cdf;
use crate::params::{MarketParameters, OptionKind, OptionSpec};

/// d₁ and d₂ of the Black-Scholes-Merton formula
///
/// ```text
/// d₁ = [ln(S/K) + (r - q + σ²/2)T] / (σ√T)
/// d₂ = d₁ - σ√T
/// ```
fn d1_d2(s: f64, k: f64, r: f64, q: f64, sigma: f64, t: f64) -> (f64, f64) {
    let sigma_sqrt_t = sigma * t.sqrt();
    let d1 = ((s / k).ln() + (r - q + 0.5 * sigma * sigma) * t) / sigma_sqrt_t;
    (d1, d1 - sigma_sqrt_t)
}

/// Black-Scholes-Merton European call price
///
/// # Formula
/// ```text
/// C = S e^(-qT) Φ(d₁) - K e^(-rT) Φ(d₂)
/// ```
///
/// With σ√T = 0 the price is the discounted forward intrinsic value
/// max(S e^(-qT) - K e^(-rT), 0).
pub fn bsm_call_price(s: f64, k: f64, r: f64, q: f64, sigma: f64, t: f64) -> f64 {
    let fwd_spot = s * (-q * t).exp();
    let pv_strike = k * (-r * t).exp();
    if sigma * t.sqrt() == 0.0 {
        return (fwd_spot - pv_strike).max(0.0);
    }
    let (d1, d2) = d1_d2(s, k, r, q, sigma, t);
    fwd_spot * norm_cdf(d1) - pv_strike * norm_cdf(d2)
}

/// Black-Scholes-Merton European put price
///
/// # Formula
/// ```text
/// P = K e^(-rT) Φ(-d₂) - S e^(-qT) Φ(-d₁)
/// ```
pub fn bsm_put_price(s: f64, k: f64, r: f64, q: f64, sigma: f64, t: f64) -> f64 {
    let fwd_spot = s * (-q * t).exp();
    let pv_strike = k * (-r * t).exp();
    if sigma * t.sqrt() == 0.0 {
        return (pv_strike - fwd_spot).max(0.0);
    }
    let (d1, d2) = d1_d2(s, k, r, q, sigma, t);
    pv_strike * norm_cdf(-d2) - fwd_spot * norm_cdf(-d1)
}

/// Black-Scholes European call price without dividends
pub fn bs_call_price(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    bsm_call_price(s, k, r, 0.0, sigma, t)
}

/// Closed-form diffusion-only price of `option` under `market`.
pub fn reference_price(market: &MarketParameters, option: &OptionSpec) -> f64 {
    let (s, k, r, q, sigma, t) = (
        market.spot(),
        option.strike(),
        market.rate(),
        market.dividend_yield(),
        market.volatility(),
        option.maturity(),
    );
    match option.kind() {
        OptionKind::Call => bsm_call_price(s, k, r, q, sigma, t),
        OptionKind::Put => bsm_put_price(s, k, r, q, sigma, t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textbook_call_value() {
        // S=100, K=100, r=5%, σ=20%, T=1
        let c = bs_call_price(100.0, 100.0, 0.05, 0.2, 1.0);
        assert!((c - 10.450_583_572).abs() < 1e-6, "got {}", c);
    }

    #[test]
    fn test_put_call_parity_with_dividends() {
        let (s, k, r, q, sigma, t) = (105.0, 95.0, 0.03, 0.02, 0.25, 0.75);
        let c = bsm_call_price(s, k, r, q, sigma, t);
        let p = bsm_put_price(s, k, r, q, sigma, t);
        let parity = s * (-q * t).exp() - k * (-r * t).exp();
        assert!((c - p - parity).abs() < 1e-10);
    }

    #[test]
    fn test_dividend_yield_lowers_call() {
        let no_div = bsm_call_price(100.0, 100.0, 0.05, 0.0, 0.2, 1.0);
        let div = bsm_call_price(100.0, 100.0, 0.05, 0.03, 0.2, 1.0);
        assert!(div < no_div);
    }

    #[test]
    fn test_zero_volatility_is_discounted_intrinsic() {
        let c = bsm_call_price(100.0, 90.0, 0.05, 0.0, 0.0, 1.0);
        assert!((c - (100.0 - 90.0 * (-0.05_f64).exp())).abs() < 1e-12);
        assert_eq!(bsm_put_price(100.0, 90.0, 0.05, 0.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_reference_price_dispatches_on_kind() {
        let market = MarketParameters::new(100.0, 0.05, 0.0, 0.2).unwrap();
        let call = OptionSpec::call(100.0, 1.0).unwrap();
        let put = OptionSpec::put(100.0, 1.0).unwrap();
        assert_eq!(reference_price(&market, &call), bs_call_price(100.0, 100.0, 0.05, 0.2, 1.0));
        assert!(reference_price(&market, &put) < reference_price(&market, &call));
    }
}
