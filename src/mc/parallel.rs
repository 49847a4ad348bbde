// src/mc/parallel.rs
//! Sharded Monte Carlo pricing
//!
//! Paths are split into contiguous shards. Shard `i` simulates its own
//! global path range from an RNG seeded with `derive_seed(seed, i)` and
//! returns a `PayoffAccumulator`. Shards run on a dedicated rayon pool; their
//! accumulators are collected in shard order and merged sequentially, so a
//! seeded run gives the same bits for the same shard count no matter how
//! many threads execute it.
//!
//! Workers share one `BudgetGuard`: a budget hit or a failed path in any
//! shard cancels the rest at their next path boundary.

use crate::error::{SdeError, SdeResult};
use crate::math_utils::Timer;
use crate::mc::mc_engine::{BudgetGuard, MonteCarloPricer, PayoffAccumulator, PricingResult};
use crate::mc::paths::PathGenerator;
use crate::params::ParameterSet;
use crate::rng::RngFactory;
use rayon::prelude::*;
use std::ops::Range;
use tracing::{debug, info, warn};

/// Contiguous global path ranges for `n_chunks` shards, sizes differing by
/// at most one. Empty shards are dropped.
pub fn split_paths(n_paths: usize, n_chunks: usize) -> Vec<Range<usize>> {
    let chunks = n_chunks.max(1);
    let base = n_paths / chunks;
    let rem = n_paths % chunks;
    let mut start = 0;
    (0..chunks)
        .map(|i| if i < rem { base + 1 } else { base })
        .filter(|&n| n > 0)
        .map(|n| {
            let range = start..start + n;
            start += n;
            range
        })
        .collect()
}

/// Price `params` with `shards` independent streams on `threads` workers.
///
/// # Errors
///
/// - `InvalidConfiguration` if the worker pool cannot be built
/// - `NumericalInstability` from the first failing shard (in shard order)
/// - `BudgetExceeded` with the number of paths completed across all shards
pub fn price_sharded(
    params: &ParameterSet,
    shards: usize,
    threads: usize,
) -> SdeResult<PricingResult> {
    let timer = Timer::new();
    let config = params.config();
    let market = params.market();
    let jumps = params.jumps();

    let pricer = MonteCarloPricer::new(params);
    let factory = RngFactory::new(config.seed());
    let guard = BudgetGuard::new(config.budget(), config.steps(), config.paths());
    let ranges = split_paths(config.paths(), shards);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| SdeError::InvalidConfiguration {
            field: "threads".to_string(),
            reason: e.to_string(),
        })?;

    debug!(
        paths = config.paths(),
        shards = ranges.len(),
        threads,
        seed = ?config.seed(),
        "sharded pricing started"
    );

    let outcomes: Vec<SdeResult<PayoffAccumulator>> = pool.install(|| {
        ranges
            .par_iter()
            .enumerate()
            .map(|(shard, range)| {
                let rng = factory.create_shard_rng(shard as u64);
                let generator = PathGenerator::with_rng(
                    market,
                    jumps,
                    config.steps(),
                    range.clone(),
                    config.horizon(),
                    rng,
                )?;
                pricer.accumulate(generator, range.start, &guard)
            })
            .collect()
    });

    let mut total = PayoffAccumulator::new();
    let mut budget_hit = false;
    for outcome in outcomes {
        match outcome {
            Ok(acc) => total = total.merge(acc),
            Err(e) if e.is_budget_exceeded() => budget_hit = true,
            Err(e) => {
                warn!(error = %e, "sharded pricing aborted");
                return Err(e);
            }
        }
    }
    if budget_hit {
        let e = guard.exceeded();
        warn!(error = %e, "sharded pricing aborted");
        return Err(e);
    }

    let result = PricingResult::from_accumulator(&total, "monte-carlo-sharded", timer.elapsed())?;
    info!(
        price = result.price,
        std_error = result.std_error,
        paths = result.paths,
        elapsed_ms = timer.elapsed_ms(),
        "sharded pricing finished"
    );
    Ok(result)
}
