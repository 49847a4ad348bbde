// src/mc/mc_engine.rs
use crate::error::{SdeError, SdeResult};
use crate::math_utils::Timer;
use crate::mc::payoffs::PayoffEvaluator;
use crate::params::{Budget, ParameterSet};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Running count, mean and sum of squared deviations (m2) of discounted
/// payoffs, updated with Welford's recurrence.
///
/// ```text
/// δ = x - mean,   mean += δ / n,   m2 += δ (x - mean)
/// ```
///
/// `merge` combines two accumulators with Chan's pairwise update
/// ```text
/// δ = mean_b - mean_a,   m2 = m2_a + m2_b + δ² n_a n_b / n
/// ```
/// which is associative and commutative, so shards can be reduced in any
/// grouping; only floating-point rounding differs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PayoffAccumulator {
    count: usize,
    mean: f64,
    m2: f64,
}

impl PayoffAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn merge(self, other: PayoffAccumulator) -> PayoffAccumulator {
        if other.count == 0 {
            return self;
        }
        if self.count == 0 {
            return other;
        }
        let (na, nb) = (self.count as f64, other.count as f64);
        let count = self.count + other.count;
        let n = count as f64;
        let delta = other.mean - self.mean;
        PayoffAccumulator {
            count,
            mean: self.mean + delta * nb / n,
            m2: self.m2 + other.m2 + delta * delta * na * nb / n,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Unbiased sample variance m2 / (n - 1), zero for fewer than two samples.
    ///
    /// # Errors
    ///
    /// `NumericalInstability` when the deviations overflowed.
    pub fn variance(&self) -> SdeResult<f64> {
        if self.count < 2 {
            return Ok(0.0);
        }
        let variance = self.m2 / (self.count - 1) as f64;
        if !variance.is_finite() {
            return Err(SdeError::NumericalInstability {
                path: None,
                step: None,
                reason: format!("Variance estimate is not finite: {}", variance),
            });
        }
        // each m2 update is non-negative up to rounding
        Ok(variance.max(0.0))
    }

    /// Standard error of the mean: sample standard deviation / √n.
    pub fn std_error(&self) -> SdeResult<f64> {
        if self.count == 0 {
            return Ok(0.0);
        }
        Ok((self.variance()? / self.count as f64).sqrt())
    }
}

/// Outcome of one pricing call
#[derive(Debug, Clone, PartialEq)]
pub struct PricingResult {
    pub price: f64,
    pub std_error: f64,
    pub paths: usize,
    pub elapsed: Duration,
    pub method: &'static str,
    pub computed_at: DateTime<Utc>,
}

impl PricingResult {
    pub fn from_accumulator(
        acc: &PayoffAccumulator,
        method: &'static str,
        elapsed: Duration,
    ) -> SdeResult<Self> {
        let price = acc.mean();
        let std_error = acc.std_error()?;

        // Final validation of results
        if !price.is_finite() {
            return Err(SdeError::NumericalInstability {
                path: None,
                step: None,
                reason: format!("Price estimate is not finite: {}", price),
            });
        }
        if !std_error.is_finite() {
            return Err(SdeError::NumericalInstability {
                path: None,
                step: None,
                reason: format!("Standard error is not finite: {}", std_error),
            });
        }

        Ok(PricingResult {
            price,
            std_error,
            paths: acc.count(),
            elapsed,
            method,
            computed_at: Utc::now(),
        })
    }

    /// A closed-form value: no sampling error, no paths.
    pub fn analytic(price: f64, method: &'static str, elapsed: Duration) -> Self {
        PricingResult {
            price,
            std_error: 0.0,
            paths: 0,
            elapsed,
            method,
            computed_at: Utc::now(),
        }
    }

    /// Symmetric interval price ± z · std_error.
    pub fn confidence_interval(&self, z: f64) -> (f64, f64) {
        (self.price - z * self.std_error, self.price + z * self.std_error)
    }
}

impl fmt::Display for PricingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.6} ± {:.6} ({} paths, {:.3} ms)",
            self.method,
            self.price,
            self.std_error,
            self.paths,
            self.elapsed.as_secs_f64() * 1000.0
        )
    }
}

/// Shared cooperative-cancellation state for one pricing call.
///
/// Every path is claimed before it is simulated; a claim fails once any
/// budget limit is reached or another worker has cancelled the call.
#[derive(Debug)]
pub(crate) struct BudgetGuard {
    budget: Budget,
    steps_per_path: u64,
    requested: usize,
    started: Instant,
    claimed: AtomicUsize,
    completed: AtomicUsize,
    cancelled: AtomicBool,
    reason: OnceLock<String>,
}

impl BudgetGuard {
    pub(crate) fn new(budget: Budget, steps_per_path: usize, requested: usize) -> Self {
        BudgetGuard {
            budget,
            steps_per_path: steps_per_path as u64,
            requested,
            started: Instant::now(),
            claimed: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            reason: OnceLock::new(),
        }
    }

    /// Claim the next path, or fail with `BudgetExceeded`.
    pub(crate) fn acquire(&self) -> SdeResult<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(self.exceeded());
        }
        let already_claimed = self.claimed.fetch_add(1, Ordering::Relaxed);

        if let Some(max_paths) = self.budget.max_paths() {
            if already_claimed >= max_paths {
                return Err(self.cancel_with(format!("max_paths = {}", max_paths)));
            }
        }
        if let Some(max_steps) = self.budget.max_steps() {
            let needed = (already_claimed as u64 + 1).saturating_mul(self.steps_per_path);
            if needed > max_steps {
                return Err(self.cancel_with(format!("max_steps = {}", max_steps)));
            }
        }
        if let Some(limit) = self.budget.time_limit() {
            if self.started.elapsed() >= limit {
                return Err(self.cancel_with(format!("time_limit = {:?}", limit)));
            }
        }
        Ok(())
    }

    pub(crate) fn complete(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Stop every worker sharing this guard.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn cancel_with(&self, limit: String) -> SdeError {
        let _ = self.reason.set(limit);
        self.cancel();
        self.exceeded()
    }

    pub(crate) fn exceeded(&self) -> SdeError {
        SdeError::BudgetExceeded {
            completed: self.completed.load(Ordering::Relaxed),
            requested: self.requested,
            limit: self
                .reason
                .get()
                .cloned()
                .unwrap_or_else(|| "cancelled".to_string()),
        }
    }
}

/// Monte Carlo estimator of a discounted European payoff
///
/// # Estimator
///
/// ```text
/// price     = (1/m) Σ e^(-rT) payoff(S_T^(i))
/// std_error = s / √m,   s² = Σ (x_i - x̄)² / (m - 1)
/// ```
///
/// The terminal-price stream is consumed exactly once and completely. A
/// failing path aborts the whole call: dropping it would bias the estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloPricer {
    evaluator: PayoffEvaluator,
    budget: Budget,
    steps_per_path: usize,
}

impl MonteCarloPricer {
    pub fn new(params: &ParameterSet) -> Self {
        MonteCarloPricer {
            evaluator: PayoffEvaluator::for_option(params.option(), params.market()),
            budget: params.config().budget(),
            steps_per_path: params.config().steps(),
        }
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn evaluator(&self) -> &PayoffEvaluator {
        &self.evaluator
    }

    /// Price from a stream of simulated terminal prices.
    ///
    /// # Errors
    ///
    /// - `NumericalInstability` from the stream, or for a non-finite payoff
    /// - `BudgetExceeded` when the budget runs out before the stream does
    pub fn price<I>(&self, terminals: I) -> SdeResult<PricingResult>
    where
        I: IntoIterator<Item = SdeResult<f64>>,
    {
        let timer = Timer::new();
        let terminals = terminals.into_iter();
        let requested = expected_len(&terminals);
        let guard = BudgetGuard::new(self.budget, self.steps_per_path, requested);

        let acc = self.accumulate(terminals, 0, &guard).map_err(|e| {
            warn!(error = %e, requested, "monte carlo pricing aborted");
            e
        })?;
        let result = PricingResult::from_accumulator(&acc, "monte-carlo", timer.elapsed())?;
        info!(
            price = result.price,
            std_error = result.std_error,
            paths = result.paths,
            elapsed_ms = timer.elapsed_ms(),
            "monte carlo pricing finished"
        );
        Ok(result)
    }

    /// Fold a stream into an accumulator under `guard`; `first_path` is the
    /// global index of the stream's first path, used in error context.
    pub(crate) fn accumulate<I>(
        &self,
        terminals: I,
        first_path: usize,
        guard: &BudgetGuard,
    ) -> SdeResult<PayoffAccumulator>
    where
        I: Iterator<Item = SdeResult<f64>>,
    {
        let requested = expected_len(&terminals);
        let mut terminals = terminals;
        let mut acc = PayoffAccumulator::new();

        while acc.count() < requested {
            guard.acquire()?;
            let s_t = match terminals.next() {
                Some(Ok(s_t)) => s_t,
                Some(Err(e)) => {
                    guard.cancel();
                    return Err(e);
                }
                None => break,
            };
            let payoff = self.evaluator.discounted(s_t);
            if !payoff.is_finite() {
                guard.cancel();
                return Err(SdeError::NumericalInstability {
                    path: Some(first_path + acc.count()),
                    step: None,
                    reason: format!("discounted payoff {} from terminal price {}", payoff, s_t),
                });
            }
            acc.push(payoff);
            guard.complete();
        }
        Ok(acc)
    }
}

fn expected_len<I: Iterator>(iter: &I) -> usize {
    let (lower, upper) = iter.size_hint();
    upper.unwrap_or(lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{JumpParameters, MarketParameters, OptionSpec, SimulationConfig};

    fn params(paths: usize) -> ParameterSet {
        ParameterSet::new(
            MarketParameters::new(100.0, 0.05, 0.0, 0.2).unwrap(),
            JumpParameters::none(),
            OptionSpec::call(100.0, 1.0).unwrap(),
            SimulationConfig::new(1, paths, 1.0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_accumulator_statistics() {
        let mut acc = PayoffAccumulator::new();
        for x in [1.0, 2.0, 3.0, 4.0] {
            acc.push(x);
        }
        assert_eq!(acc.count(), 4);
        assert!((acc.mean() - 2.5).abs() < 1e-15);
        assert!((acc.variance().unwrap() - 5.0 / 3.0).abs() < 1e-12);
        assert!((acc.std_error().unwrap() - (5.0 / 12.0_f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_accumulator_merge_matches_single_pass() {
        let xs = [0.0, 3.5, 1.25, 9.0, 0.0, 4.75];
        let mut whole = PayoffAccumulator::new();
        let mut left = PayoffAccumulator::new();
        let mut right = PayoffAccumulator::new();
        for (i, &x) in xs.iter().enumerate() {
            whole.push(x);
            if i < 2 { left.push(x) } else { right.push(x) }
        }
        let merged = left.merge(right);
        assert_eq!(merged.count(), whole.count());
        assert!((merged.mean() - whole.mean()).abs() < 1e-14);
        assert!((merged.variance().unwrap() - whole.variance().unwrap()).abs() < 1e-12);
        assert_eq!(right.merge(left).count(), 6);
    }

    #[test]
    fn test_near_constant_payoffs_keep_their_spread() {
        let (hi, lo) = (99.05 + 1e-6, 99.05 - 1e-6);
        let n = 1_000_000;
        let mut acc = PayoffAccumulator::new();
        for i in 0..n {
            acc.push(if i % 2 == 0 { hi } else { lo });
        }
        let half_gap = 0.5 * (hi - lo);
        let expected_var = half_gap * half_gap * n as f64 / (n - 1) as f64;
        let expected_se = (expected_var / n as f64).sqrt();

        let se = acc.std_error().unwrap();
        assert!(se > 0.0);
        assert!((se - expected_se).abs() < 1e-3 * expected_se, "{} vs {}", se, expected_se);
        assert!((acc.mean() - 99.05).abs() < 1e-9);
    }

    #[test]
    fn test_constant_payoffs_have_zero_std_error() {
        let mut left = PayoffAccumulator::new();
        let mut right = PayoffAccumulator::new();
        for _ in 0..1_000_000 {
            left.push(99.05);
            right.push(99.05);
        }
        assert_eq!(left.variance().unwrap(), 0.0);
        assert_eq!(left.std_error().unwrap(), 0.0);
        let merged = left.merge(right);
        assert_eq!(merged.count(), 2_000_000);
        assert_eq!(merged.std_error().unwrap(), 0.0);
        assert_eq!(merged.mean(), 99.05);
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let mut acc = PayoffAccumulator::new();
        for x in [2.0, 4.0, 9.0] {
            acc.push(x);
        }
        assert_eq!(acc.merge(PayoffAccumulator::new()), acc);
        assert_eq!(PayoffAccumulator::new().merge(acc), acc);
    }

    #[test]
    fn test_single_sample_has_zero_std_error() {
        let mut acc = PayoffAccumulator::new();
        acc.push(7.0);
        assert_eq!(acc.std_error().unwrap(), 0.0);
    }

    #[test]
    fn test_pricer_discounts_mean_payoff() {
        let pricer = MonteCarloPricer::new(&params(3));
        let terminals = vec![Ok(110.0), Ok(90.0), Ok(130.0)];
        let result = pricer.price(terminals).unwrap();
        let discount = (-0.05_f64).exp();
        assert_eq!(result.paths, 3);
        assert!((result.price - discount * 40.0 / 3.0).abs() < 1e-12);
        assert!(result.std_error > 0.0);
        assert_eq!(result.method, "monte-carlo");
    }

    #[test]
    fn test_pricer_aborts_on_failed_path() {
        let pricer = MonteCarloPricer::new(&params(3));
        let terminals = vec![
            Ok(110.0),
            Err(SdeError::instability(1, 0, "log-price became NaN")),
            Ok(130.0),
        ];
        let err = pricer.price(terminals).unwrap_err();
        assert!(err.is_numerical_instability());
    }

    #[test]
    fn test_pricer_rejects_non_finite_terminal() {
        let pricer = MonteCarloPricer::new(&params(2));
        let err = pricer.price(vec![Ok(100.0), Ok(f64::INFINITY)]).unwrap_err();
        match err {
            SdeError::NumericalInstability { path, .. } => assert_eq!(path, Some(1)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_path_budget_reports_partial_count() {
        let pricer = MonteCarloPricer::new(&params(10)).with_budget(Budget::unlimited().with_max_paths(4));
        let terminals: Vec<SdeResult<f64>> = (0..10).map(|i| Ok(95.0 + i as f64)).collect();
        match pricer.price(terminals).unwrap_err() {
            SdeError::BudgetExceeded {
                completed,
                requested,
                limit,
            } => {
                assert_eq!(completed, 4);
                assert_eq!(requested, 10);
                assert!(limit.contains("max_paths"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_budget_equal_to_request_is_not_exceeded() {
        let pricer = MonteCarloPricer::new(&params(5)).with_budget(
            Budget::unlimited().with_max_paths(5).with_max_steps(5),
        );
        let terminals: Vec<SdeResult<f64>> = (0..5).map(|_| Ok(105.0)).collect();
        assert_eq!(pricer.price(terminals).unwrap().paths, 5);
    }

    #[test]
    fn test_confidence_interval_and_display() {
        let result = PricingResult::analytic(10.0, "black-scholes", Duration::from_millis(1));
        assert_eq!(result.confidence_interval(3.0), (10.0, 10.0));
        assert!(result.to_string().starts_with("black-scholes: 10.000000"));
    }
}
