// src/analytics/merton_series.rs
//! Merton (1976) series price for lognormal jumps
//!
//! # Formula
//!
//! Conditioning on the number of jumps n in [0, T] turns the jump-diffusion
//! into a Black-Scholes-Merton world with adjusted rate and volatility:
//! ```text
//! V = Σ_{n≥0} e^{-λ'T} (λ'T)^n / n! · BSM(S, K, r_n, q, σ_n, T)
//!
//! λ'    = λ (1 + κ)
//! r_n   = r - λκ + n ln(1 + κ) / T,   ln(1 + κ) = μⱼ + σⱼ²/2
//! σ_n²  = σ² + n σⱼ² / T
//! ```
//!
//! Poisson weights are evaluated in log space so large λ'T does not
//! overflow the factorial.

use crate::analytics::bs_analytic::{bsm_call_price, bsm_put_price, reference_price};
use crate::error::{SdeError, SdeResult};
use crate::params::{JumpParameters, MarketParameters, OptionKind, OptionSpec};
use statrs::function::factorial::ln_factorial;

const MAX_TERMS: u64 = 1_000;
const WEIGHT_TOLERANCE: f64 = 1e-14;
const NEGLIGIBLE_WEIGHT: f64 = 1e-16;

/// Closed-form price of a European option under Merton jump-diffusion.
///
/// # Errors
///
/// `NumericalInstability` when the jump parameters push λ'T or a term of
/// the series outside floating-point range, or when the Poisson weights have
/// not converged within `MAX_TERMS` terms.
pub fn merton_price(
    market: &MarketParameters,
    jumps: &JumpParameters,
    option: &OptionSpec,
) -> SdeResult<f64> {
    if !jumps.has_jumps() {
        return Ok(reference_price(market, option));
    }

    let t = option.maturity();
    let log_one_plus_kappa = jumps.mean() + 0.5 * jumps.volatility() * jumps.volatility();
    let lambda_t = jumps.intensity() * log_one_plus_kappa.exp() * t;
    let compensation = jumps.drift_compensation();
    if !lambda_t.is_finite() || !compensation.is_finite() {
        return Err(SdeError::NumericalInstability {
            path: None,
            step: None,
            reason: format!(
                "jump-adjusted intensity λ'T = {} is outside floating-point range",
                lambda_t
            ),
        });
    }

    let sigma_sq = market.volatility() * market.volatility();
    let jump_var = jumps.volatility() * jumps.volatility();
    let ln_lambda_t = lambda_t.ln();

    let mut price = 0.0;
    let mut cumulative_weight = 0.0;
    let mut converged = false;
    for n in 0..MAX_TERMS {
        let nf = n as f64;
        let weight = if n == 0 {
            (-lambda_t).exp()
        } else {
            (-lambda_t + nf * ln_lambda_t - ln_factorial(n)).exp()
        };
        let r_n = market.rate() - compensation + nf * log_one_plus_kappa / t;
        let sigma_n = (sigma_sq + nf * jump_var / t).sqrt();

        let term = match option.kind() {
            OptionKind::Call => bsm_call_price(
                market.spot(),
                option.strike(),
                r_n,
                market.dividend_yield(),
                sigma_n,
                t,
            ),
            OptionKind::Put => bsm_put_price(
                market.spot(),
                option.strike(),
                r_n,
                market.dividend_yield(),
                sigma_n,
                t,
            ),
        };

        if weight > 0.0 {
            price += weight * term;
        }
        cumulative_weight += weight;
        // past the Poisson mode the weights only shrink
        if nf > lambda_t
            && (cumulative_weight >= 1.0 - WEIGHT_TOLERANCE || weight < NEGLIGIBLE_WEIGHT)
        {
            converged = true;
            break;
        }
    }

    if !converged {
        return Err(SdeError::NumericalInstability {
            path: None,
            step: None,
            reason: format!(
                "Merton series not converged after {} terms (λ'T = {}, cumulative weight {})",
                MAX_TERMS, lambda_t, cumulative_weight
            ),
        });
    }

    if !price.is_finite() {
        return Err(SdeError::NumericalInstability {
            path: None,
            step: None,
            reason: format!("Merton series diverged to {}", price),
        });
    }
    Ok(price)
}
